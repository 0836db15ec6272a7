use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use blogicum_core::domain::{Category, Post, User};
use blogicum_core::forms::{
    CategoryForm, CommentForm, LocationForm, PostForm, ProfileForm, RegistrationForm,
};
use blogicum_core::ports::{
    BaseRepository, CommentRepository, FixedClock, PostFilter, PostRepository,
};
use blogicum_core::{BlogService, DomainError, Mutation, RepoError, Repositories};

use super::{InMemoryStore, in_memory_repositories};

struct Fixture {
    store: Arc<InMemoryStore>,
    repos: Repositories,
    service: BlogService,
    now: DateTime<Utc>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let repos = in_memory_repositories(store.clone());
        let now = Utc::now();
        let service = BlogService::new(repos.clone(), Arc::new(FixedClock(now)));
        Self {
            store,
            repos,
            service,
            now,
        }
    }

    async fn user(&self, username: &str) -> User {
        self.service
            .register(
                RegistrationForm {
                    username: username.to_string(),
                    email: format!("{username}@example.com"),
                    password: "password123".to_string(),
                },
                "$argon2id$stub".to_string(),
            )
            .await
            .unwrap()
    }

    async fn category(&self, slug: &str, published: bool) -> Category {
        let mut category = Category::new(slug.to_uppercase(), String::new(), slug.to_string());
        category.is_published = published;
        self.repos.categories.save(category).await.unwrap()
    }

    async fn post(&self, author: &User, hours_ago: i64) -> Post {
        self.post_with(author, hours_ago, |_| {}).await
    }

    async fn post_with(
        &self,
        author: &User,
        hours_ago: i64,
        tweak: impl FnOnce(&mut PostForm),
    ) -> Post {
        let mut form = PostForm {
            title: format!("Post from {hours_ago}h ago"),
            text: "Some text".to_string(),
            image: None,
            pub_date: Some(self.now - Duration::hours(hours_ago)),
            is_published: true,
            category_id: None,
            location_id: None,
        };
        tweak(&mut form);
        self.service.create_post(author.id, form).await.unwrap()
    }

    async fn comment(&self, author: &User, post: &Post, text: &str) -> Uuid {
        match self
            .service
            .add_comment(
                author.id,
                post.id,
                None,
                CommentForm {
                    text: text.to_string(),
                },
            )
            .await
            .unwrap()
        {
            Mutation::Applied(authored) => authored.comment.id,
            Mutation::Denied { .. } => panic!("creating a comment is never denied"),
        }
    }

    async fn feed_ids(&self) -> Vec<Uuid> {
        let page = self.service.feed(None).await.unwrap();
        page.items.iter().map(|s| s.post.id).collect()
    }
}

fn is_not_found<T: std::fmt::Debug>(result: Result<T, DomainError>) -> bool {
    matches!(result, Err(DomainError::NotFound { .. }))
}

#[tokio::test]
async fn unpublished_post_is_hidden_from_everyone_but_its_author() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let draft = fx.post_with(&author, 1, |f| f.is_published = false).await;

    assert!(is_not_found(fx.service.post_detail(None, draft.id).await));
    assert!(is_not_found(
        fx.service.post_detail(Some(reader.id), draft.id).await
    ));
    assert!(fx.service.post_detail(Some(author.id), draft.id).await.is_ok());
    assert!(fx.feed_ids().await.is_empty());
}

#[tokio::test]
async fn scheduled_post_is_previewed_only_by_author() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let scheduled = fx.post(&author, -48).await;

    assert!(is_not_found(
        fx.service.post_detail(Some(reader.id), scheduled.id).await
    ));
    let detail = fx
        .service
        .post_detail(Some(author.id), scheduled.id)
        .await
        .unwrap();
    assert_eq!(detail.post.id, scheduled.id);
    assert_eq!(detail.usernames[&author.id], "author");
    assert!(fx.feed_ids().await.is_empty());
}

#[tokio::test]
async fn post_published_exactly_now_is_not_yet_visible() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let post = fx.post(&author, 0).await;

    assert!(is_not_found(fx.service.post_detail(None, post.id).await));
}

#[tokio::test]
async fn unpublished_category_hides_its_posts_everywhere() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let hidden = fx.category("hidden", false).await;
    let open = fx.category("open", true).await;

    let hidden_post = fx
        .post_with(&author, 2, |f| f.category_id = Some(hidden.id))
        .await;
    let open_post = fx
        .post_with(&author, 1, |f| f.category_id = Some(open.id))
        .await;
    let uncategorized = fx.post(&author, 3).await;

    assert_eq!(fx.feed_ids().await, vec![open_post.id, uncategorized.id]);
    assert!(is_not_found(fx.service.category_feed("hidden", None).await));
    assert!(is_not_found(fx.service.post_detail(None, hidden_post.id).await));

    let open_feed = fx.service.category_feed("open", None).await.unwrap();
    assert_eq!(open_feed.category.id, open.id);
    let ids: Vec<Uuid> = open_feed.posts.items.iter().map(|s| s.post.id).collect();
    assert_eq!(ids, vec![open_post.id]);
}

#[tokio::test]
async fn category_feed_skips_drafts_of_published_category() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let travel = fx.category("travel", true).await;
    fx.post_with(&author, 1, |f| {
        f.category_id = Some(travel.id);
        f.is_published = false;
    })
    .await;

    let feed = fx.service.category_feed("travel", None).await.unwrap();
    assert_eq!(feed.posts.total, 0);
    assert_eq!(feed.posts.num_pages, 1);
}

#[tokio::test]
async fn pagination_serves_ten_posts_and_clamps_past_the_end() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let mut newest_first = Vec::new();
    for hours_ago in 1..=25 {
        newest_first.push(fx.post(&author, hours_ago).await.id);
    }

    let first = fx.service.feed(Some("1")).await.unwrap();
    let ids: Vec<Uuid> = first.items.iter().map(|s| s.post.id).collect();
    assert_eq!(ids, newest_first[..10]);
    assert!(first.has_next());
    assert!(!first.has_previous());
    assert_eq!(first.num_pages, 3);

    let third = fx.service.feed(Some("3")).await.unwrap();
    let ids: Vec<Uuid> = third.items.iter().map(|s| s.post.id).collect();
    assert_eq!(ids, newest_first[20..]);
    assert!(!third.has_next());

    let beyond = fx.service.feed(Some("4")).await.unwrap();
    assert_eq!(beyond.number, 3);
    let beyond_ids: Vec<Uuid> = beyond.items.iter().map(|s| s.post.id).collect();
    assert_eq!(beyond_ids, ids);

    let garbage = fx.service.feed(Some("last")).await.unwrap();
    assert_eq!(garbage.number, 1);
}

#[tokio::test]
async fn same_pub_date_keeps_insertion_order() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let first = fx.post(&author, 5).await;
    let second = fx.post(&author, 5).await;

    assert_eq!(fx.feed_ids().await, vec![first.id, second.id]);
}

#[tokio::test]
async fn feed_counts_comments() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, 1).await;
    fx.comment(&reader, &post, "First!").await;
    fx.comment(&author, &post, "Thanks").await;

    let page = fx.service.feed(None).await.unwrap();
    assert_eq!(page.items[0].comment_count, 2);
    assert_eq!(page.items[0].author_username, "author");
}

#[tokio::test]
async fn profile_shows_drafts_only_to_owner() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    fx.post(&author, 1).await;
    fx.post_with(&author, 2, |f| f.is_published = false).await;
    fx.post(&author, -5).await;

    let own = fx
        .service
        .profile(Some(author.id), "author", None)
        .await
        .unwrap();
    assert_eq!(own.posts.total, 3);

    let public = fx
        .service
        .profile(Some(reader.id), "author", None)
        .await
        .unwrap();
    assert_eq!(public.posts.total, 1);

    assert!(is_not_found(fx.service.profile(None, "nobody", None).await));
}

#[tokio::test]
async fn non_author_cannot_delete_comment() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let stranger = fx.user("stranger").await;
    let post = fx.post(&author, 1).await;
    let comment_id = fx.comment(&author, &post, "Mine").await;

    let outcome = fx
        .service
        .delete_comment(stranger.id, post.id, comment_id)
        .await
        .unwrap();

    assert!(matches!(outcome, Mutation::Denied { redirect_to } if redirect_to == post.id));
    assert!(fx.repos.comments.find_by_id(comment_id).await.unwrap().is_some());
}

#[tokio::test]
async fn author_deletes_own_comment() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let post = fx.post(&author, 1).await;
    let comment_id = fx.comment(&author, &post, "Oops").await;

    let outcome = fx
        .service
        .delete_comment(author.id, post.id, comment_id)
        .await
        .unwrap();

    assert!(matches!(outcome, Mutation::Applied(())));
    assert!(fx.repos.comments.find_by_post(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_post_removes_its_comments() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let post = fx.post(&author, 1).await;
    let other = fx.post(&author, 2).await;
    let doomed = fx.comment(&reader, &post, "Nice").await;
    let kept = fx.comment(&reader, &other, "Also nice").await;

    let outcome = fx.service.delete_post(author.id, post.id).await.unwrap();

    assert!(matches!(outcome, Mutation::Applied(())));
    assert!(fx.repos.posts.find_by_id(post.id).await.unwrap().is_none());
    assert!(fx.repos.comments.find_by_id(doomed).await.unwrap().is_none());
    assert!(fx.repos.comments.find_by_id(kept).await.unwrap().is_some());
}

#[tokio::test]
async fn non_author_cannot_edit_or_delete_post() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let stranger = fx.user("stranger").await;
    let post = fx.post(&author, 1).await;

    let form = PostForm {
        title: "Hijacked".to_string(),
        text: "Hijacked".to_string(),
        image: None,
        pub_date: None,
        is_published: true,
        category_id: None,
        location_id: None,
    };
    let edit = fx.service.edit_post(stranger.id, post.id, form).await.unwrap();
    assert!(edit.is_denied());

    let delete = fx.service.delete_post(stranger.id, post.id).await.unwrap();
    assert!(delete.is_denied());

    let stored = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.title, post.title);
}

#[tokio::test]
async fn author_edits_post_and_keeps_pub_date_when_omitted() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let post = fx.post(&author, 4).await;

    let form = PostForm {
        title: "Renamed".to_string(),
        text: "New text".to_string(),
        image: Some("posts/cover.jpg".to_string()),
        pub_date: None,
        is_published: true,
        category_id: None,
        location_id: None,
    };
    let Mutation::Applied(edited) = fx.service.edit_post(author.id, post.id, form).await.unwrap()
    else {
        panic!("author edit must apply");
    };

    assert_eq!(edited.title, "Renamed");
    assert_eq!(edited.image.as_deref(), Some("posts/cover.jpg"));
    assert_eq!(edited.pub_date, post.pub_date);
    assert_eq!(edited.updated_at, fx.now);
}

#[tokio::test]
async fn post_form_rejects_unknown_category() {
    let fx = Fixture::new();
    let author = fx.user("author").await;

    let form = PostForm {
        title: "Title".to_string(),
        text: "Text".to_string(),
        image: None,
        pub_date: None,
        is_published: true,
        category_id: Some(Uuid::new_v4()),
        location_id: None,
    };
    let result = fx.service.create_post(author.id, form).await;

    let Err(DomainError::Validation(errors)) = result else {
        panic!("expected validation failure");
    };
    assert!(errors.messages()[0].starts_with("category_id:"));
}

#[tokio::test]
async fn blank_comment_persists_nothing() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let post = fx.post(&author, 1).await;

    let result = fx
        .service
        .add_comment(
            author.id,
            post.id,
            None,
            CommentForm {
                text: "  \n ".to_string(),
            },
        )
        .await;

    assert!(matches!(result, Err(DomainError::Validation(_))));
    assert!(fx.repos.comments.find_by_post(post.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn add_comment_with_id_rewrites_only_own_comment() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let stranger = fx.user("stranger").await;
    let post = fx.post(&author, 1).await;
    let comment_id = fx.comment(&author, &post, "Draft").await;

    let form = |text: &str| CommentForm {
        text: text.to_string(),
    };

    let denied = fx
        .service
        .add_comment(stranger.id, post.id, Some(comment_id), form("Vandalism"))
        .await
        .unwrap();
    assert!(denied.is_denied());

    let applied = fx
        .service
        .add_comment(author.id, post.id, Some(comment_id), form("Final"))
        .await
        .unwrap();
    assert!(matches!(applied, Mutation::Applied(ref c) if c.comment.text == "Final"));

    let comments = fx.repos.comments.find_by_post(post.id).await.unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].text, "Final");
}

#[tokio::test]
async fn comment_must_belong_to_post_in_path() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let post = fx.post(&author, 1).await;
    let other = fx.post(&author, 2).await;
    let comment_id = fx.comment(&author, &post, "Here").await;

    let result = fx
        .service
        .edit_comment(
            author.id,
            other.id,
            comment_id,
            CommentForm {
                text: "Moved".to_string(),
            },
        )
        .await;

    assert!(is_not_found(result));
}

#[tokio::test]
async fn cannot_comment_on_hidden_post() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;
    let draft = fx.post_with(&author, 1, |f| f.is_published = false).await;

    let result = fx
        .service
        .add_comment(
            reader.id,
            draft.id,
            None,
            CommentForm {
                text: "Sneaky".to_string(),
            },
        )
        .await;

    assert!(is_not_found(result));
}

#[tokio::test]
async fn profile_update_rejects_taken_username() {
    let fx = Fixture::new();
    let alice = fx.user("alice").await;
    fx.user("bob").await;

    let result = fx
        .service
        .update_profile(
            alice.id,
            ProfileForm {
                username: "bob".to_string(),
                email: "alice@example.com".to_string(),
                first_name: "Alice".to_string(),
                last_name: String::new(),
            },
        )
        .await;
    assert!(matches!(result, Err(DomainError::Validation(_))));

    let updated = fx
        .service
        .update_profile(
            alice.id,
            ProfileForm {
                username: "alice".to_string(),
                email: "alice@example.com".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Liddell".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.last_name, "Liddell");
    assert_eq!(updated.updated_at, fx.now);
}

#[tokio::test]
async fn duplicate_registration_is_rejected() {
    let fx = Fixture::new();
    fx.user("alice").await;

    let result = fx
        .service
        .register(
            RegistrationForm {
                username: "alice".to_string(),
                email: "other@example.com".to_string(),
                password: "password123".to_string(),
            },
            "hash".to_string(),
        )
        .await;

    assert!(matches!(result, Err(DomainError::Duplicate(_))));
}

#[tokio::test]
async fn only_staff_manage_categories() {
    let fx = Fixture::new();
    let regular = fx.user("regular").await;
    let mut staff = fx.user("staff").await;
    staff.is_staff = true;
    let staff = fx.repos.users.save(staff).await.unwrap();

    let form = CategoryForm {
        title: "Travel".to_string(),
        description: "Trips".to_string(),
        slug: "travel".to_string(),
        is_published: true,
    };

    let denied = fx.service.create_category(regular.id, form.clone()).await;
    assert!(matches!(denied, Err(DomainError::Unauthorized)));

    let created = fx.service.create_category(staff.id, form.clone()).await.unwrap();
    assert_eq!(created.slug, "travel");

    let duplicate = fx.service.create_category(staff.id, form).await;
    assert!(matches!(duplicate, Err(DomainError::Validation(_))));

    let hidden = fx
        .service
        .update_category(
            staff.id,
            "travel",
            CategoryForm {
                title: "Travel".to_string(),
                description: "Trips".to_string(),
                slug: "travel".to_string(),
                is_published: false,
            },
        )
        .await
        .unwrap();
    assert!(!hidden.is_published);
    assert!(fx.service.categories().await.unwrap().is_empty());
}

#[tokio::test]
async fn staff_add_locations_listed_by_name() {
    let fx = Fixture::new();
    let regular = fx.user("regular").await;
    let mut staff = fx.user("staff").await;
    staff.is_staff = true;
    let staff = fx.repos.users.save(staff).await.unwrap();

    let form = |name: &str| LocationForm {
        name: name.to_string(),
    };

    let denied = fx.service.create_location(regular.id, form("Tbilisi")).await;
    assert!(matches!(denied, Err(DomainError::Unauthorized)));

    let blank = fx.service.create_location(staff.id, form(" ")).await;
    assert!(matches!(blank, Err(DomainError::Validation(_))));

    fx.service.create_location(staff.id, form("Tbilisi")).await.unwrap();
    fx.service.create_location(staff.id, form("Berlin")).await.unwrap();

    let names: Vec<String> = fx
        .service
        .locations()
        .await
        .unwrap()
        .into_iter()
        .map(|l| l.name)
        .collect();
    assert_eq!(names, ["Berlin", "Tbilisi"]);
}

#[tokio::test]
async fn store_enforces_unique_usernames() {
    let fx = Fixture::new();
    let alice = fx.user("alice").await;

    let clone = User::new(alice.username.clone(), "x@example.com".into(), "hash".into());
    let result = fx.repos.users.save(clone).await;

    assert!(matches!(result, Err(RepoError::Constraint(_))));
}

#[tokio::test]
async fn deleting_category_uncategorizes_posts() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let travel = fx.category("travel", true).await;
    let post = fx
        .post_with(&author, 1, |f| f.category_id = Some(travel.id))
        .await;

    fx.repos.categories.delete(travel.id).await.unwrap();

    let stored = fx.repos.posts.find_by_id(post.id).await.unwrap().unwrap();
    assert_eq!(stored.category_id, None);
    assert_eq!(fx.feed_ids().await, vec![post.id]);
}

#[tokio::test]
async fn deleted_rows_release_their_insertion_rank() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let reader = fx.user("reader").await;

    for _ in 0..10 {
        let post = fx.post(&author, 1).await;
        for _ in 0..3 {
            let id = fx.comment(&reader, &post, "Churn").await;
            fx.service
                .delete_comment(reader.id, post.id, id)
                .await
                .unwrap();
        }
        fx.comment(&reader, &post, "Stays until the post goes").await;
        fx.repos.comments.delete_by_post(post.id).await.unwrap();
        fx.comment(&author, &post, "Cascaded").await;
        fx.service.delete_post(author.id, post.id).await.unwrap();
    }
    assert_eq!(fx.store.read().await.sequence_len(), 2);

    let post = fx.post(&author, 1).await;
    fx.comment(&reader, &post, "Gone with the reader").await;
    fx.repos.users.delete(reader.id).await.unwrap();
    fx.repos.users.delete(author.id).await.unwrap();

    let tables = fx.store.read().await;
    assert!(tables.posts.is_empty() && tables.comments.is_empty());
    assert_eq!(tables.sequence_len(), 0);
}

/// Post store whose deletes always fail.
struct StuckPosts(Arc<dyn PostRepository>);

#[async_trait]
impl BaseRepository<Post, Uuid> for StuckPosts {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.0.find_by_id(id).await
    }

    async fn save(&self, entity: Post) -> Result<Post, RepoError> {
        self.0.save(entity).await
    }

    async fn delete(&self, _id: Uuid) -> Result<(), RepoError> {
        Err(RepoError::Connection("connection reset".to_string()))
    }
}

#[async_trait]
impl PostRepository for StuckPosts {
    async fn count(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        self.0.count(filter).await
    }

    async fn list(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        self.0.list(filter, offset, limit).await
    }
}

#[tokio::test]
async fn failed_post_delete_keeps_its_comments() {
    let fx = Fixture::new();
    let author = fx.user("author").await;
    let post = fx.post(&author, 1).await;
    let comment_id = fx.comment(&author, &post, "Still here").await;

    let mut repos = fx.repos.clone();
    repos.posts = Arc::new(StuckPosts(fx.repos.posts.clone()));
    let service = BlogService::new(repos, Arc::new(FixedClock(fx.now)));

    let result = service.delete_post(author.id, post.id).await;

    assert!(matches!(result, Err(DomainError::Repo(RepoError::Connection(_)))));
    assert!(fx.repos.posts.find_by_id(post.id).await.unwrap().is_some());
    assert!(fx.repos.comments.find_by_id(comment_id).await.unwrap().is_some());
}
