//! Blog use cases - every operation takes the requester explicitly.
//!
//! Mutations by anyone but the owner do not fail: they come back as
//! [`Mutation::Denied`] carrying the post the caller should be sent to.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::domain::{AuthoredComment, Category, Comment, Location, Post, PostSummary, User};
use crate::error::DomainError;
use crate::forms::{
    CategoryForm, CommentForm, LocationForm, PostForm, ProfileForm, RegistrationForm,
    ValidationErrors,
};
use crate::pagination::{Page, Paginator};
use crate::policy;
use crate::ports::{
    CategoryRepository, Clock, CommentRepository, LocationRepository, PostFilter, PostRepository,
    UserRepository,
};

type Result<T> = std::result::Result<T, DomainError>;

/// Outcome of an edit or delete.
#[derive(Debug)]
pub enum Mutation<T> {
    Applied(T),
    /// The requester does not own the resource; nothing was changed.
    Denied { redirect_to: Uuid },
}

impl<T> Mutation<T> {
    pub fn is_denied(&self) -> bool {
        matches!(self, Mutation::Denied { .. })
    }
}

/// A single post with everything its page shows.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub category: Option<Category>,
    pub location: Option<Location>,
    pub comments: Vec<Comment>,
    /// Usernames of the post author and every commenter.
    pub usernames: HashMap<Uuid, String>,
}

#[derive(Debug, Clone)]
pub struct ProfilePage {
    pub user: User,
    pub posts: Page<PostSummary>,
}

#[derive(Debug, Clone)]
pub struct CategoryPage {
    pub category: Category,
    pub posts: Page<PostSummary>,
}

/// The set of stores the service works against.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub comments: Arc<dyn CommentRepository>,
}

pub struct BlogService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
    paginator: Paginator,
}

impl BlogService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self {
            repos,
            clock,
            paginator: Paginator::default(),
        }
    }

    pub fn users(&self) -> &Arc<dyn UserRepository> {
        &self.repos.users
    }

    // Listings

    /// Public feed of every visible post.
    pub async fn feed(&self, page: Option<&str>) -> Result<Page<PostSummary>> {
        self.listing(PostFilter::public(self.clock.now()), page).await
    }

    /// Posts of one author. The author sees drafts and scheduled posts too.
    pub async fn profile(
        &self,
        viewer: Option<Uuid>,
        username: &str,
        page: Option<&str>,
    ) -> Result<ProfilePage> {
        let user = self
            .repos
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("User", username))?;

        let filter = if viewer == Some(user.id) {
            PostFilter::default().by_author(user.id)
        } else {
            PostFilter::public(self.clock.now()).by_author(user.id)
        };
        let posts = self.listing(filter, page).await?;

        Ok(ProfilePage { user, posts })
    }

    /// Visible posts of a published category.
    pub async fn category_feed(&self, slug: &str, page: Option<&str>) -> Result<CategoryPage> {
        let category = self
            .repos
            .categories
            .find_by_slug(slug)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| DomainError::not_found("Category", slug))?;

        let filter = PostFilter::public(self.clock.now()).in_category(category.id);
        let posts = self.listing(filter, page).await?;

        Ok(CategoryPage { category, posts })
    }

    pub async fn categories(&self) -> Result<Vec<Category>> {
        Ok(self.repos.categories.list_published().await?)
    }

    pub async fn locations(&self) -> Result<Vec<Location>> {
        Ok(self.repos.locations.list_all().await?)
    }

    async fn listing(&self, filter: PostFilter, page: Option<&str>) -> Result<Page<PostSummary>> {
        let total = self.repos.posts.count(&filter).await?;
        let number = self.paginator.resolve(page, total);
        let posts = self
            .repos
            .posts
            .list(
                &filter,
                self.paginator.offset(number),
                self.paginator.per_page(),
            )
            .await?;

        let items = self.summarize(posts).await?;
        Ok(self.paginator.page(items, number, total))
    }

    async fn summarize(&self, posts: Vec<Post>) -> Result<Vec<PostSummary>> {
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let counts = self.repos.comments.count_by_posts(&ids).await?;
        let authors: Vec<Uuid> = posts.iter().map(|p| p.author_id).collect();
        let usernames = self.usernames(authors).await?;

        Ok(posts
            .into_iter()
            .map(|post| PostSummary {
                comment_count: counts.get(&post.id).copied().unwrap_or(0),
                author_username: usernames.get(&post.author_id).cloned().unwrap_or_default(),
                post,
            })
            .collect())
    }

    async fn usernames(&self, ids: Vec<Uuid>) -> Result<HashMap<Uuid, String>> {
        let mut names = HashMap::new();
        for id in ids {
            if names.contains_key(&id) {
                continue;
            }
            if let Some(user) = self.repos.users.find_by_id(id).await? {
                names.insert(id, user.username);
            }
        }
        Ok(names)
    }

    // Posts

    pub async fn create_post(&self, requester: Uuid, form: PostForm) -> Result<Post> {
        let mut errors = form.validate();
        self.check_references(&form, &mut errors).await?;
        errors.into_result()?;

        let pub_date = form.pub_date.unwrap_or_else(|| self.clock.now());
        let mut post = Post::new(requester, form.title, form.text, pub_date);
        post.image = form.image;
        post.is_published = form.is_published;
        post.category_id = form.category_id;
        post.location_id = form.location_id;

        let post = self.repos.posts.save(post).await?;
        tracing::info!(post_id = %post.id, author_id = %requester, "Post created");
        Ok(post)
    }

    pub async fn post_detail(&self, viewer: Option<Uuid>, post_id: Uuid) -> Result<PostDetail> {
        let (post, category) = self.visible_post(viewer, post_id).await?;

        let location = match post.location_id {
            Some(id) => self.repos.locations.find_by_id(id).await?,
            None => None,
        };
        let comments = self.repos.comments.find_by_post(post_id).await?;

        let mut people = vec![post.author_id];
        people.extend(comments.iter().map(|c| c.author_id));
        let usernames = self.usernames(people).await?;

        Ok(PostDetail {
            post,
            category,
            location,
            comments,
            usernames,
        })
    }

    pub async fn edit_post(
        &self,
        requester: Uuid,
        post_id: Uuid,
        form: PostForm,
    ) -> Result<Mutation<Post>> {
        let mut post = self.find_post(post_id).await?;
        if !policy::can_mutate(requester, post.author_id) {
            tracing::debug!(%post_id, %requester, "Edit denied to non-author");
            return Ok(Mutation::Denied {
                redirect_to: post_id,
            });
        }

        let mut errors = form.validate();
        self.check_references(&form, &mut errors).await?;
        errors.into_result()?;

        post.title = form.title;
        post.text = form.text;
        post.image = form.image;
        if let Some(pub_date) = form.pub_date {
            post.pub_date = pub_date;
        }
        post.is_published = form.is_published;
        post.category_id = form.category_id;
        post.location_id = form.location_id;
        post.updated_at = self.clock.now();

        let post = self.repos.posts.save(post).await?;
        Ok(Mutation::Applied(post))
    }

    /// Hard-delete a post together with its comments.
    ///
    /// The post goes first so a failed delete leaves its comments intact.
    /// Stores cascade the comments themselves; the sweep after it covers
    /// any left behind.
    pub async fn delete_post(&self, requester: Uuid, post_id: Uuid) -> Result<Mutation<()>> {
        let post = self.find_post(post_id).await?;
        if !policy::can_mutate(requester, post.author_id) {
            tracing::debug!(%post_id, %requester, "Delete denied to non-author");
            return Ok(Mutation::Denied {
                redirect_to: post_id,
            });
        }

        self.repos.posts.delete(post_id).await?;
        let orphans = self.repos.comments.delete_by_post(post_id).await?;
        tracing::info!(%post_id, orphans_swept = orphans, "Post deleted");

        Ok(Mutation::Applied(()))
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Post> {
        self.repos
            .posts
            .find_by_id(post_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", post_id))
    }

    /// The post and its category, or not-found when `viewer` may not see it.
    async fn visible_post(
        &self,
        viewer: Option<Uuid>,
        post_id: Uuid,
    ) -> Result<(Post, Option<Category>)> {
        let post = self.find_post(post_id).await?;
        let category = match post.category_id {
            Some(id) => self.repos.categories.find_by_id(id).await?,
            None => None,
        };

        if !policy::can_view(viewer, &post, category.as_ref(), self.clock.now()) {
            tracing::debug!(%post_id, "Hidden post requested by non-author");
            return Err(DomainError::not_found("Post", post_id));
        }
        Ok((post, category))
    }

    async fn check_references(&self, form: &PostForm, errors: &mut ValidationErrors) -> Result<()> {
        const INVALID_CHOICE: &str =
            "Select a valid choice. That choice is not one of the available choices.";

        if let Some(id) = form.category_id {
            if self.repos.categories.find_by_id(id).await?.is_none() {
                errors.add("category_id", INVALID_CHOICE);
            }
        }
        if let Some(id) = form.location_id {
            if self.repos.locations.find_by_id(id).await?.is_none() {
                errors.add("location_id", INVALID_CHOICE);
            }
        }
        Ok(())
    }

    // Comments

    /// Attach a new comment, or rewrite `comment_id` when given.
    pub async fn add_comment(
        &self,
        requester: Uuid,
        post_id: Uuid,
        comment_id: Option<Uuid>,
        form: CommentForm,
    ) -> Result<Mutation<AuthoredComment>> {
        if let Some(comment_id) = comment_id {
            return self.edit_comment(requester, post_id, comment_id, form).await;
        }

        let (post, _) = self.visible_post(Some(requester), post_id).await?;
        form.validate().into_result()?;

        let comment = Comment::new(post.id, requester, form.text);
        let comment = self.repos.comments.save(comment).await?;
        tracing::info!(%post_id, comment_id = %comment.id, "Comment added");

        Ok(Mutation::Applied(self.authored(comment).await?))
    }

    pub async fn edit_comment(
        &self,
        requester: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
        form: CommentForm,
    ) -> Result<Mutation<AuthoredComment>> {
        let mut comment = self.comment_on(requester, post_id, comment_id).await?;
        if !policy::can_mutate(requester, comment.author_id) {
            tracing::debug!(%comment_id, %requester, "Comment edit denied to non-author");
            return Ok(Mutation::Denied {
                redirect_to: post_id,
            });
        }

        form.validate().into_result()?;
        comment.text = form.text;

        let comment = self.repos.comments.save(comment).await?;
        Ok(Mutation::Applied(self.authored(comment).await?))
    }

    pub async fn delete_comment(
        &self,
        requester: Uuid,
        post_id: Uuid,
        comment_id: Uuid,
    ) -> Result<Mutation<()>> {
        let comment = self.comment_on(requester, post_id, comment_id).await?;
        if !policy::can_mutate(requester, comment.author_id) {
            tracing::debug!(%comment_id, %requester, "Comment delete denied to non-author");
            return Ok(Mutation::Denied {
                redirect_to: post_id,
            });
        }

        self.repos.comments.delete(comment_id).await?;
        tracing::info!(%post_id, %comment_id, "Comment deleted");
        Ok(Mutation::Applied(()))
    }

    async fn authored(&self, comment: Comment) -> Result<AuthoredComment> {
        let author = self
            .repos
            .users
            .find_by_id(comment.author_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", comment.author_id))?;
        Ok(AuthoredComment {
            comment,
            author_username: author.username,
        })
    }

    /// A comment that belongs to a post the requester can see.
    async fn comment_on(&self, requester: Uuid, post_id: Uuid, comment_id: Uuid) -> Result<Comment> {
        self.visible_post(Some(requester), post_id).await?;
        self.repos
            .comments
            .find_by_id(comment_id)
            .await?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| DomainError::not_found("Comment", comment_id))
    }

    // Users

    /// Create an account. `password_hash` must already be hashed.
    pub async fn register(&self, form: RegistrationForm, password_hash: String) -> Result<User> {
        form.validate().into_result()?;

        if self.repos.users.find_by_username(&form.username).await?.is_some() {
            return Err(DomainError::Duplicate(
                "A user with that username already exists".to_string(),
            ));
        }
        if self.repos.users.find_by_email(&form.email).await?.is_some() {
            return Err(DomainError::Duplicate("Email already registered".to_string()));
        }

        let user = User::new(form.username, form.email, password_hash);
        let user = self.repos.users.save(user).await?;
        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    pub async fn update_profile(&self, requester: Uuid, form: ProfileForm) -> Result<User> {
        let mut user = self
            .repos
            .users
            .find_by_id(requester)
            .await?
            .ok_or_else(|| DomainError::not_found("User", requester))?;

        let mut errors = form.validate();
        if errors.is_empty() {
            if let Some(other) = self.repos.users.find_by_username(&form.username).await? {
                if other.id != user.id {
                    errors.add("username", "A user with that username already exists.");
                }
            }
            if let Some(other) = self.repos.users.find_by_email(&form.email).await? {
                if other.id != user.id {
                    errors.add("email", "A user with that email already exists.");
                }
            }
        }
        errors.into_result()?;

        user.username = form.username;
        user.email = form.email;
        user.first_name = form.first_name;
        user.last_name = form.last_name;
        user.updated_at = self.clock.now();

        Ok(self.repos.users.save(user).await?)
    }

    // Catalogue management (staff only)

    async fn require_staff(&self, requester: Uuid) -> Result<User> {
        match self.repos.users.find_by_id(requester).await? {
            Some(user) if user.is_staff => Ok(user),
            _ => Err(DomainError::Unauthorized),
        }
    }

    pub async fn create_category(&self, requester: Uuid, form: CategoryForm) -> Result<Category> {
        self.require_staff(requester).await?;

        let mut errors = form.validate();
        if errors.is_empty() && self.repos.categories.find_by_slug(&form.slug).await?.is_some() {
            errors.add("slug", "Category with this slug already exists.");
        }
        errors.into_result()?;

        let mut category = Category::new(form.title, form.description, form.slug);
        category.is_published = form.is_published;
        Ok(self.repos.categories.save(category).await?)
    }

    pub async fn update_category(
        &self,
        requester: Uuid,
        slug: &str,
        form: CategoryForm,
    ) -> Result<Category> {
        self.require_staff(requester).await?;

        let mut category = self
            .repos
            .categories
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", slug))?;

        let mut errors = form.validate();
        if errors.is_empty()
            && form.slug != category.slug
            && self.repos.categories.find_by_slug(&form.slug).await?.is_some()
        {
            errors.add("slug", "Category with this slug already exists.");
        }
        errors.into_result()?;

        category.title = form.title;
        category.description = form.description;
        category.slug = form.slug;
        category.is_published = form.is_published;
        Ok(self.repos.categories.save(category).await?)
    }

    pub async fn create_location(&self, requester: Uuid, form: LocationForm) -> Result<Location> {
        self.require_staff(requester).await?;
        form.validate().into_result()?;

        Ok(self.repos.locations.save(Location::new(form.name)).await?)
    }
}
