//! In-memory store - used when no database is configured, and in tests.
//!
//! Data is lost on process restart. Foreign keys, unique columns and
//! cascades of the relational schema are mirrored by hand.

mod repository;
mod store;

use std::sync::Arc;

use blogicum_core::Repositories;

pub use repository::{
    InMemoryCategoryRepository, InMemoryCommentRepository, InMemoryLocationRepository,
    InMemoryPostRepository, InMemoryRepository, InMemoryUserRepository,
};
pub use store::InMemoryStore;

/// Every repository backed by the same store.
pub fn in_memory_repositories(store: Arc<InMemoryStore>) -> Repositories {
    Repositories {
        users: Arc::new(InMemoryUserRepository::new(store.clone())),
        posts: Arc::new(InMemoryPostRepository::new(store.clone())),
        categories: Arc::new(InMemoryCategoryRepository::new(store.clone())),
        locations: Arc::new(InMemoryLocationRepository::new(store.clone())),
        comments: Arc::new(InMemoryCommentRepository::new(store)),
    }
}

#[cfg(test)]
mod tests;
