//! # Blogicum Core
//!
//! The domain layer of the Blogicum blog.
//! This crate contains the visibility and authorization policy, pagination,
//! form validation and the `BlogService` that orchestrates them over ports.
//! It has zero infrastructure dependencies.

pub mod domain;
pub mod error;
pub mod forms;
pub mod pagination;
pub mod policy;
pub mod ports;
pub mod service;

pub use error::{DomainError, RepoError};
pub use pagination::{Page, Paginator, POSTS_PER_PAGE};
pub use service::{BlogService, CategoryPage, Mutation, PostDetail, ProfilePage, Repositories};
