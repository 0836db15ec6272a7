//! Profile handlers.

use actix_web::{HttpResponse, web};

use blogicum_shared::ApiResponse;
use blogicum_shared::dto::{PageQuery, ProfileResponse, UpdateProfileRequest};

use super::convert;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/profile/{username}?page=N
///
/// The owner sees every post they wrote; everyone else only the visible ones.
pub async fn profile(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = state
        .service
        .profile(identity.user_id(), &path, query.page.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(ProfileResponse {
        user: convert::user_response(&page.user),
        posts: convert::page_response(page.posts, convert::summary_response),
    })))
}

/// PUT /api/profile
pub async fn update_profile(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let form = convert::profile_form(body.into_inner());
    let user = state.service.update_profile(identity.user_id, form).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(convert::user_response(&user))))
}
