//! HTTP handlers and route configuration.

mod auth;
mod catalogue;
mod comments;
mod convert;
mod health;
mod posts;
mod profile;

#[cfg(test)]
mod tests;

use actix_web::{HttpResponse, error, http::header, web};
use uuid::Uuid;

use blogicum_core::Mutation;
use blogicum_shared::ErrorResponse;

/// Configure all application routes.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            // Public routes
            .route("/health", web::get().to(health::health_check))
            // Auth routes
            .service(
                web::scope("/auth")
                    .route("/register", web::post().to(auth::register))
                    .route("/login", web::post().to(auth::login))
                    .route("/me", web::get().to(auth::me)),
            )
            // Posts and their comments
            .service(
                web::scope("/posts")
                    .route("", web::get().to(posts::feed))
                    .route("", web::post().to(posts::create_post))
                    .route("/{post_id}", web::get().to(posts::post_detail))
                    .route("/{post_id}", web::put().to(posts::edit_post))
                    .route("/{post_id}", web::delete().to(posts::delete_post))
                    .route("/{post_id}/comments", web::post().to(comments::add_comment))
                    .route(
                        "/{post_id}/comments/{comment_id}",
                        web::post().to(comments::rewrite_comment),
                    )
                    .route(
                        "/{post_id}/comments/{comment_id}",
                        web::put().to(comments::edit_comment),
                    )
                    .route(
                        "/{post_id}/comments/{comment_id}",
                        web::delete().to(comments::delete_comment),
                    ),
            )
            // Profiles
            .route("/profile", web::put().to(profile::update_profile))
            .route("/profile/{username}", web::get().to(profile::profile))
            // Catalogue
            .route("/category/{slug}", web::get().to(catalogue::category_feed))
            .route("/categories", web::get().to(catalogue::categories))
            .route("/locations", web::get().to(catalogue::locations))
            .service(
                web::scope("/admin")
                    .route("/categories", web::post().to(catalogue::create_category))
                    .route(
                        "/categories/{slug}",
                        web::put().to(catalogue::update_category),
                    )
                    .route("/locations", web::post().to(catalogue::create_location)),
            ),
    );
}

/// Malformed JSON bodies become RFC 7807 400 responses.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let body = ErrorResponse::bad_request(err.to_string());
        error::InternalError::from_response(err, HttpResponse::BadRequest().json(body)).into()
    })
}

/// Path of a post's detail page.
pub fn post_path(post_id: Uuid) -> String {
    format!("/api/posts/{post_id}")
}

/// 303 See Other back to the post, sent when a non-author tries to mutate.
pub fn redirect_to_post(post_id: Uuid) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, post_path(post_id)))
        .finish()
}

/// Render an applied mutation with `on_applied`, or redirect when denied.
pub fn mutation_response<T>(
    outcome: Mutation<T>,
    on_applied: impl FnOnce(T) -> HttpResponse,
) -> HttpResponse {
    match outcome {
        Mutation::Applied(value) => on_applied(value),
        Mutation::Denied { redirect_to } => redirect_to_post(redirect_to),
    }
}
