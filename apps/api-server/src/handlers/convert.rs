//! Mapping between domain values and wire DTOs.

use std::collections::HashMap;

use uuid::Uuid;

use blogicum_core::domain::{
    AuthoredComment, Category, Comment, Location, Post, PostSummary, User,
};
use blogicum_core::forms::{
    CategoryForm, CommentForm, LocationForm, PostForm, ProfileForm, RegistrationForm,
};
use blogicum_core::{Page, PostDetail};
use blogicum_shared::dto::{
    CategoryRequest, CategoryResponse, CommentRequest, CommentResponse, LocationRequest,
    LocationResponse, PageResponse, PostDetailResponse, PostRequest, PostResponse,
    PostSummaryResponse, RegisterUserRequest, UpdateProfileRequest, UserResponse,
};

// Requests

pub fn post_form(req: PostRequest) -> PostForm {
    PostForm {
        title: req.title,
        text: req.text,
        image: req.image,
        pub_date: req.pub_date,
        is_published: req.is_published,
        category_id: req.category_id,
        location_id: req.location_id,
    }
}

pub fn comment_form(req: CommentRequest) -> CommentForm {
    CommentForm { text: req.text }
}

pub fn profile_form(req: UpdateProfileRequest) -> ProfileForm {
    ProfileForm {
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
    }
}

pub fn registration_form(req: RegisterUserRequest) -> RegistrationForm {
    RegistrationForm {
        username: req.username,
        email: req.email,
        password: req.password,
    }
}

pub fn category_form(req: CategoryRequest) -> CategoryForm {
    CategoryForm {
        title: req.title,
        description: req.description,
        slug: req.slug,
        is_published: req.is_published,
    }
}

pub fn location_form(req: LocationRequest) -> LocationForm {
    LocationForm { name: req.name }
}

// Responses

pub fn user_response(user: &User) -> UserResponse {
    UserResponse {
        id: user.id,
        username: user.username.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        date_joined: user.created_at,
    }
}

pub fn post_response(post: Post) -> PostResponse {
    PostResponse {
        id: post.id,
        author_id: post.author_id,
        title: post.title,
        text: post.text,
        image: post.image,
        pub_date: post.pub_date,
        is_published: post.is_published,
        category_id: post.category_id,
        location_id: post.location_id,
        created_at: post.created_at,
    }
}

pub fn summary_response(summary: PostSummary) -> PostSummaryResponse {
    PostSummaryResponse {
        post: post_response(summary.post),
        author: summary.author_username,
        comment_count: summary.comment_count,
    }
}

pub fn page_response<T, U>(page: Page<T>, f: impl FnMut(T) -> U) -> PageResponse<U> {
    let has_next = page.has_next();
    let has_previous = page.has_previous();
    let page = page.map(f);

    PageResponse {
        items: page.items,
        page: page.number,
        num_pages: page.num_pages,
        total: page.total,
        has_next,
        has_previous,
    }
}

pub fn comment_response(comment: Comment, author: impl Into<String>) -> CommentResponse {
    CommentResponse {
        id: comment.id,
        post_id: comment.post_id,
        author: author.into(),
        text: comment.text,
        created_at: comment.created_at,
    }
}

pub fn authored_comment_response(authored: AuthoredComment) -> CommentResponse {
    comment_response(authored.comment, authored.author_username)
}

pub fn category_response(category: Category) -> CategoryResponse {
    CategoryResponse {
        id: category.id,
        title: category.title,
        description: category.description,
        slug: category.slug,
        is_published: category.is_published,
    }
}

pub fn location_response(location: Location) -> LocationResponse {
    LocationResponse {
        id: location.id,
        name: location.name,
    }
}

fn username_of(usernames: &HashMap<Uuid, String>, id: Uuid) -> String {
    usernames.get(&id).cloned().unwrap_or_default()
}

pub fn detail_response(detail: PostDetail) -> PostDetailResponse {
    let PostDetail {
        post,
        category,
        location,
        comments,
        usernames,
    } = detail;

    PostDetailResponse {
        author: username_of(&usernames, post.author_id),
        category: category.map(category_response),
        location: location.map(location_response),
        comments: comments
            .into_iter()
            .map(|c| {
                let author = username_of(&usernames, c.author_id);
                comment_response(c, author)
            })
            .collect(),
        post: post_response(post),
    }
}
