use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use blogicum_core::domain::{Category, Comment, Location, Post, User};
use blogicum_core::error::RepoError;
use blogicum_core::policy;
use blogicum_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, LocationRepository, PostFilter,
    PostRepository, UserRepository,
};

use super::store::{InMemoryStore, Record, Tables};

/// Generic in-memory repository over one table of the store.
pub struct InMemoryRepository<T> {
    store: Arc<InMemoryStore>,
    _record: PhantomData<fn() -> T>,
}

impl<T> InMemoryRepository<T> {
    pub fn new(store: Arc<InMemoryStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }
}

pub type InMemoryUserRepository = InMemoryRepository<User>;
pub type InMemoryPostRepository = InMemoryRepository<Post>;
pub type InMemoryCategoryRepository = InMemoryRepository<Category>;
pub type InMemoryLocationRepository = InMemoryRepository<Location>;
pub type InMemoryCommentRepository = InMemoryRepository<Comment>;

#[async_trait]
impl<T: Record> BaseRepository<T, Uuid> for InMemoryRepository<T> {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, RepoError> {
        let tables = self.store.read().await;
        Ok(T::table(&tables).get(&id).cloned())
    }

    async fn save(&self, entity: T) -> Result<T, RepoError> {
        let mut tables = self.store.write().await;
        entity.check_constraints(&tables)?;
        entity.clone().insert_into(&mut tables);
        Ok(entity)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.store.write().await;
        if T::table_mut(&mut tables).remove(&id).is_none() {
            return Err(RepoError::NotFound);
        }
        tables.forget(id);
        T::on_delete(&mut tables, id);
        Ok(())
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.store.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

fn matches(post: &Post, filter: &PostFilter, tables: &Tables) -> bool {
    filter.author_id.is_none_or(|id| post.author_id == id)
        && filter
            .category_id
            .is_none_or(|id| post.category_id == Some(id))
        && filter.visible_at.is_none_or(|now| {
            let category = post.category_id.and_then(|id| tables.categories.get(&id));
            policy::is_publicly_visible(post, category, now)
        })
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let tables = self.store.read().await;
        let count = tables
            .posts
            .values()
            .filter(|p| matches(p, filter, &tables))
            .count();
        Ok(count as u64)
    }

    async fn list(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.store.read().await;
        let mut posts: Vec<&Post> = tables
            .posts
            .values()
            .filter(|p| matches(p, filter, &tables))
            .collect();

        posts.sort_by(|a, b| {
            b.pub_date
                .cmp(&a.pub_date)
                .then_with(|| tables.sequence_of(a.id).cmp(&tables.sequence_of(b.id)))
        });

        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.store.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn list_published(&self) -> Result<Vec<Category>, RepoError> {
        let tables = self.store.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.is_published)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }
}

#[async_trait]
impl LocationRepository for InMemoryLocationRepository {
    async fn list_all(&self) -> Result<Vec<Location>, RepoError> {
        let tables = self.store.read().await;
        let mut locations: Vec<Location> = tables.locations.values().cloned().collect();
        locations.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(locations)
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.store.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by_key(|c| (c.created_at, tables.sequence_of(c.id)));
        Ok(comments)
    }

    async fn count_by_posts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError> {
        let tables = self.store.read().await;
        let mut counts = HashMap::new();
        for comment in tables.comments.values() {
            if post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    async fn delete_by_post(&self, post_id: Uuid) -> Result<u64, RepoError> {
        let mut tables = self.store.write().await;
        Ok(tables.remove_comments(|c| c.post_id == post_id))
    }
}
