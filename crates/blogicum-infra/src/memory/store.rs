use std::collections::HashMap;

use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

use blogicum_core::domain::{Category, Comment, Location, Post, User};
use blogicum_core::error::RepoError;

/// Every table of the blog, plus the insertion sequence of each row.
#[derive(Default)]
pub struct Tables {
    pub users: HashMap<Uuid, User>,
    pub posts: HashMap<Uuid, Post>,
    pub categories: HashMap<Uuid, Category>,
    pub locations: HashMap<Uuid, Location>,
    pub comments: HashMap<Uuid, Comment>,
    sequence: HashMap<Uuid, u64>,
    next_sequence: u64,
}

impl Tables {
    /// Insertion rank of a row; earlier rows rank lower.
    pub fn sequence_of(&self, id: Uuid) -> u64 {
        self.sequence.get(&id).copied().unwrap_or(u64::MAX)
    }

    fn record_insert(&mut self, id: Uuid) {
        if !self.sequence.contains_key(&id) {
            self.sequence.insert(id, self.next_sequence);
            self.next_sequence += 1;
        }
    }

    /// Drop the insertion rank of a row that left its table.
    pub(super) fn forget(&mut self, id: Uuid) {
        self.sequence.remove(&id);
    }

    /// Remove every comment matching `pred`, returning how many went.
    pub(super) fn remove_comments(&mut self, pred: impl Fn(&Comment) -> bool) -> u64 {
        let doomed: Vec<Uuid> = self
            .comments
            .values()
            .filter(|c| pred(c))
            .map(|c| c.id)
            .collect();
        for id in &doomed {
            self.comments.remove(id);
            self.sequence.remove(id);
        }
        doomed.len() as u64
    }

    fn remove_post(&mut self, post_id: Uuid) {
        self.posts.remove(&post_id);
        self.forget(post_id);
        self.remove_comments(|c| c.post_id == post_id);
    }

    #[cfg(test)]
    pub(super) fn sequence_len(&self) -> usize {
        self.sequence.len()
    }
}

/// All blog tables behind one async RwLock.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) async fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().await
    }

    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().await
    }
}

/// A row type stored in [`Tables`].
pub trait Record: Clone + Send + Sync + 'static {
    fn id(&self) -> Uuid;

    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;

    /// Unique columns and foreign keys.
    fn check_constraints(&self, _tables: &Tables) -> Result<(), RepoError> {
        Ok(())
    }

    /// Cascades run after the row itself is gone.
    fn on_delete(_tables: &mut Tables, _id: Uuid) {}

    fn insert_into(self, tables: &mut Tables) {
        tables.record_insert(self.id());
        Self::table_mut(tables).insert(self.id(), self);
    }
}

fn missing(what: &str) -> RepoError {
    RepoError::Constraint(format!("Referenced {what} does not exist"))
}

impl Record for User {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.users
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.users
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), RepoError> {
        let others = tables.users.values().filter(|u| u.id != self.id);
        for other in others {
            if other.username == self.username || other.email == self.email {
                return Err(RepoError::Constraint("Entity already exists".to_string()));
            }
        }
        Ok(())
    }

    fn on_delete(tables: &mut Tables, id: Uuid) {
        let authored: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.remove_post(post_id);
        }
        tables.remove_comments(|c| c.author_id == id);
    }
}

impl Record for Post {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.posts
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.posts
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), RepoError> {
        if !tables.users.contains_key(&self.author_id) {
            return Err(missing("author"));
        }
        if self
            .category_id
            .is_some_and(|id| !tables.categories.contains_key(&id))
        {
            return Err(missing("category"));
        }
        if self
            .location_id
            .is_some_and(|id| !tables.locations.contains_key(&id))
        {
            return Err(missing("location"));
        }
        Ok(())
    }

    fn on_delete(tables: &mut Tables, id: Uuid) {
        tables.remove_post(id);
    }
}

impl Record for Category {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.categories
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.categories
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), RepoError> {
        let taken = tables
            .categories
            .values()
            .any(|c| c.id != self.id && c.slug == self.slug);
        if taken {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        Ok(())
    }

    fn on_delete(tables: &mut Tables, id: Uuid) {
        for post in tables.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
    }
}

impl Record for Location {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.locations
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.locations
    }

    fn on_delete(tables: &mut Tables, id: Uuid) {
        for post in tables.posts.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
    }
}

impl Record for Comment {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.comments
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.comments
    }

    fn check_constraints(&self, tables: &Tables) -> Result<(), RepoError> {
        if !tables.posts.contains_key(&self.post_id) {
            return Err(missing("post"));
        }
        if !tables.users.contains_key(&self.author_id) {
            return Err(missing("author"));
        }
        Ok(())
    }
}
