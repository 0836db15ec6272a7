//! Category and location handlers, including staff management.

use actix_web::{HttpResponse, web};

use blogicum_shared::ApiResponse;
use blogicum_shared::dto::{CategoryFeedResponse, CategoryRequest, LocationRequest, PageQuery};

use super::convert;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/category/{slug}?page=N
pub async fn category_feed(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let feed = state
        .service
        .category_feed(&path, query.page.as_deref())
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(CategoryFeedResponse {
        category: convert::category_response(feed.category),
        posts: convert::page_response(feed.posts, convert::summary_response),
    })))
}

/// GET /api/categories
pub async fn categories(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let categories: Vec<_> = state
        .service
        .categories()
        .await?
        .into_iter()
        .map(convert::category_response)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(categories)))
}

/// GET /api/locations
pub async fn locations(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let locations: Vec<_> = state
        .service
        .locations()
        .await?
        .into_iter()
        .map(convert::location_response)
        .collect();

    Ok(HttpResponse::Ok().json(ApiResponse::ok(locations)))
}

/// POST /api/admin/categories
pub async fn create_category(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CategoryRequest>,
) -> AppResult<HttpResponse> {
    let form = convert::category_form(body.into_inner());
    let category = state.service.create_category(identity.user_id, form).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(convert::category_response(category))))
}

/// PUT /api/admin/categories/{slug}
pub async fn update_category(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<CategoryRequest>,
) -> AppResult<HttpResponse> {
    let form = convert::category_form(body.into_inner());
    let category = state
        .service
        .update_category(identity.user_id, &path, form)
        .await?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(convert::category_response(category))))
}

/// POST /api/admin/locations
pub async fn create_location(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<LocationRequest>,
) -> AppResult<HttpResponse> {
    let form = convert::location_form(body.into_inner());
    let location = state.service.create_location(identity.user_id, form).await?;

    Ok(HttpResponse::Created().json(ApiResponse::ok(convert::location_response(location))))
}
