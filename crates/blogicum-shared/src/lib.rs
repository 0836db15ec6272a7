//! # Blogicum Shared
//!
//! Wire types of the Blogicum JSON API, shared by the server and its clients.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, ErrorResponse};
