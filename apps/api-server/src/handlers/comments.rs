//! Comment handlers. Every route is scoped by the post the comment belongs to.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use blogicum_shared::ApiResponse;
use blogicum_shared::dto::CommentRequest;

use super::{convert, mutation_response};
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/posts/{post_id}/comments
pub async fn add_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let form = convert::comment_form(body.into_inner());
    let outcome = state
        .service
        .add_comment(identity.user_id, path.into_inner(), None, form)
        .await?;

    Ok(mutation_response(outcome, |authored| {
        let body = convert::authored_comment_response(authored);
        HttpResponse::Created().json(ApiResponse::ok(body))
    }))
}

/// POST /api/posts/{post_id}/comments/{comment_id}
///
/// Form-style rewrite of an existing comment.
pub async fn rewrite_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let form = convert::comment_form(body.into_inner());
    let outcome = state
        .service
        .add_comment(identity.user_id, post_id, Some(comment_id), form)
        .await?;

    Ok(mutation_response(outcome, |authored| {
        let body = convert::authored_comment_response(authored);
        HttpResponse::Ok().json(ApiResponse::ok(body))
    }))
}

/// PUT /api/posts/{post_id}/comments/{comment_id}
pub async fn edit_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let form = convert::comment_form(body.into_inner());
    let outcome = state
        .service
        .edit_comment(identity.user_id, post_id, comment_id, form)
        .await?;

    Ok(mutation_response(outcome, |authored| {
        let body = convert::authored_comment_response(authored);
        HttpResponse::Ok().json(ApiResponse::ok(body))
    }))
}

/// DELETE /api/posts/{post_id}/comments/{comment_id}
pub async fn delete_comment(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let outcome = state
        .service
        .delete_comment(identity.user_id, post_id, comment_id)
        .await?;

    Ok(mutation_response(outcome, |()| {
        HttpResponse::Ok().json(ApiResponse::ok_with_message((), "Comment deleted"))
    }))
}
