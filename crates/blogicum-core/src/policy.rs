//! Visibility and authorization rules for posts and comments.
//!
//! Hidden posts are reported as missing, never as forbidden, so the
//! existence of drafts and scheduled posts does not leak.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Category, Post};

/// Whether anyone may see `post` at instant `now`.
///
/// `category` is the post's category as loaded from the store. A post that
/// references a category which no longer exists is treated as uncategorized.
pub fn is_publicly_visible(post: &Post, category: Option<&Category>, now: DateTime<Utc>) -> bool {
    post.is_published && category.is_none_or(|c| c.is_published) && post.pub_date < now
}

/// Whether `viewer` may see `post`. Authors always see their own posts.
pub fn can_view(
    viewer: Option<Uuid>,
    post: &Post,
    category: Option<&Category>,
    now: DateTime<Utc>,
) -> bool {
    viewer.is_some_and(|id| post.is_authored_by(id)) || is_publicly_visible(post, category, now)
}

/// Whether `requester` may edit or delete a resource owned by `owner`.
pub fn can_mutate(requester: Uuid, owner: Uuid) -> bool {
    requester == owner
}
