//! Post handlers: the public feed, detail pages and author-only mutations.

use actix_web::{HttpResponse, http::header, web};
use uuid::Uuid;

use blogicum_shared::ApiResponse;
use blogicum_shared::dto::{PageQuery, PostRequest};

use super::{convert, mutation_response, post_path};
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/posts?page=N
pub async fn feed(
    state: web::Data<AppState>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state.service.feed(query.page.as_deref()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(convert::page_response(
        page,
        convert::summary_response,
    ))))
}

/// POST /api/posts
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let form = convert::post_form(body.into_inner());
    let post = state.service.create_post(identity.user_id, form).await?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, post_path(post.id)))
        .json(ApiResponse::ok(convert::post_response(post))))
}

/// GET /api/posts/{post_id}
///
/// Drafts and scheduled posts are only shown to their author.
pub async fn post_detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let detail = state
        .service
        .post_detail(identity.user_id(), path.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(convert::detail_response(detail))))
}

/// PUT /api/posts/{post_id}
pub async fn edit_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let form = convert::post_form(body.into_inner());
    let outcome = state
        .service
        .edit_post(identity.user_id, path.into_inner(), form)
        .await?;

    Ok(mutation_response(outcome, |post| {
        HttpResponse::Ok().json(ApiResponse::ok(convert::post_response(post)))
    }))
}

/// DELETE /api/posts/{post_id}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let outcome = state
        .service
        .delete_post(identity.user_id, path.into_inner())
        .await?;

    Ok(mutation_response(outcome, |()| {
        HttpResponse::Ok().json(ApiResponse::ok_with_message((), "Post deleted"))
    }))
}
