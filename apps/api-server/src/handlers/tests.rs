use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use chrono::{Duration, Utc};
use serde_json::{Value, json};

use blogicum_core::ports::{PasswordService, SystemClock, TokenService};
use blogicum_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};

use super::{configure_routes, json_config};
use crate::state::AppState;

struct Context {
    state: AppState,
    tokens: Arc<dyn TokenService>,
    passwords: Arc<dyn PasswordService>,
}

impl Context {
    fn new() -> Self {
        Self {
            state: AppState::in_memory(Arc::new(SystemClock)),
            tokens: Arc::new(JwtTokenService::new(JwtConfig::default())),
            passwords: Arc::new(Argon2PasswordService::new()),
        }
    }
}

macro_rules! app {
    ($ctx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($ctx.state.clone()))
                .app_data(web::Data::new($ctx.tokens.clone()))
                .app_data(web::Data::new($ctx.passwords.clone()))
                .app_data(json_config())
                .configure(configure_routes),
        )
        .await
    };
}

fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {token}"))
}

/// Register `username` and return its access token.
macro_rules! register {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": $username,
                "email": format!("{}@example.com", $username),
                "password": "password123",
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&$app, req).await;
        body["data"]["access_token"]
            .as_str()
            .expect("registration returns a token")
            .to_string()
    }};
}

/// Create a post as `token` and return its id.
macro_rules! create_post {
    ($app:expr, $token:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&$token))
            .set_json($body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_str().expect("post id").to_string()
    }};
}

fn published(title: &str) -> Value {
    json!({
        "title": title,
        "text": "Some text",
        "pub_date": Utc::now() - Duration::hours(1),
    })
}

#[actix_web::test]
async fn test_health_reports_memory_storage() {
    let ctx = Context::new();
    let app = app!(ctx);

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[actix_web::test]
async fn test_register_login_and_me() {
    let ctx = Context::new();
    let app = app!(ctx);
    register!(app, "leo");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"username": "leo", "password": "password123"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let token = body["data"]["access_token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["token_type"], "Bearer");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["username"], "leo");
    assert_eq!(body["data"]["email"], "leo@example.com");
    assert_eq!(body["data"]["roles"], json!(["user"]));
}

#[actix_web::test]
async fn test_login_with_wrong_password_is_unauthorized() {
    let ctx = Context::new();
    let app = app!(ctx);
    register!(app, "leo");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"username": "leo", "password": "not-my-password"}))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_invalid_registration_lists_every_error() {
    let ctx = Context::new();
    let app = app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({"username": "bad name", "email": "nope", "password": "short"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"].as_array().unwrap().len(), 3);
}

#[actix_web::test]
async fn test_creating_post_requires_token() {
    let ctx = Context::new();
    let app = app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(published("Anonymous"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_draft_is_404_for_others_and_visible_to_author() {
    let ctx = Context::new();
    let app = app!(ctx);
    let author = register!(app, "author");
    let reader = register!(app, "reader");
    let post_id = create_post!(
        app,
        author,
        json!({"title": "Draft", "text": "WIP", "is_published": false})
    );
    let uri = format!("/api/posts/{post_id}");

    let anonymous = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(
        test::call_service(&app, anonymous).await.status(),
        StatusCode::NOT_FOUND
    );

    let other = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&reader))
        .to_request();
    assert_eq!(
        test::call_service(&app, other).await.status(),
        StatusCode::NOT_FOUND
    );

    let own = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, own).await;
    assert_eq!(body["data"]["title"], "Draft");
    assert_eq!(body["data"]["author"], "author");
}

#[actix_web::test]
async fn test_scheduled_post_stays_out_of_feed() {
    let ctx = Context::new();
    let app = app!(ctx);
    let author = register!(app, "author");
    create_post!(app, author, published("Visible"));
    create_post!(
        app,
        author,
        json!({"title": "Later", "text": "Soon", "pub_date": Utc::now() + Duration::days(2)})
    );

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["title"], "Visible");
}

#[actix_web::test]
async fn test_non_author_delete_redirects_and_keeps_post() {
    let ctx = Context::new();
    let app = app!(ctx);
    let author = register!(app, "author");
    let stranger = register!(app, "stranger");
    let post_id = create_post!(app, author, published("Mine"));

    let req = test::TestRequest::delete()
        .uri(&format!("/api/posts/{post_id}"))
        .insert_header(bearer(&stranger))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        format!("/api/posts/{post_id}").as_str()
    );

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}"))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[actix_web::test]
async fn test_comment_lifecycle() {
    let ctx = Context::new();
    let app = app!(ctx);
    let author = register!(app, "author");
    let reader = register!(app, "reader");
    let post_id = create_post!(app, author, published("Discuss"));
    let comments_uri = format!("/api/posts/{post_id}/comments");

    // Blank text is rejected and nothing is stored
    let req = test::TestRequest::post()
        .uri(&comments_uri)
        .insert_header(bearer(&reader))
        .set_json(json!({"text": "   "}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let req = test::TestRequest::post()
        .uri(&comments_uri)
        .insert_header(bearer(&reader))
        .set_json(json!({"text": "Great post"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["author"], "reader");
    let comment_uri = format!("{comments_uri}/{comment_id}");

    // The post author cannot remove someone else's comment
    let req = test::TestRequest::delete()
        .uri(&comment_uri)
        .insert_header(bearer(&author))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::SEE_OTHER
    );

    let req = test::TestRequest::put()
        .uri(&comment_uri)
        .insert_header(bearer(&reader))
        .set_json(json!({"text": "Great post, edited"}))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["text"], "Great post, edited");

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["items"][0]["comment_count"], 1);

    let req = test::TestRequest::delete()
        .uri(&comment_uri)
        .insert_header(bearer(&reader))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["comments"], json!([]));
}

#[actix_web::test]
async fn test_feed_page_parameter_is_forgiving() {
    let ctx = Context::new();
    let app = app!(ctx);
    let author = register!(app, "author");
    for i in 0..12 {
        create_post!(
            app,
            author,
            json!({
                "title": format!("Post {i}"),
                "text": "Body",
                "pub_date": Utc::now() - Duration::hours(i + 1),
            })
        );
    }

    let req = test::TestRequest::get()
        .uri("/api/posts?page=abc")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["page"], 1);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 10);
    assert_eq!(body["data"]["has_next"], true);

    let req = test::TestRequest::get()
        .uri("/api/posts?page=99")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["page"], 2);
    assert_eq!(body["data"]["num_pages"], 2);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["items"][1]["title"], "Post 11");
}

#[actix_web::test]
async fn test_profile_shows_drafts_to_owner_only() {
    let ctx = Context::new();
    let app = app!(ctx);
    let author = register!(app, "author");
    create_post!(app, author, published("Public"));
    create_post!(
        app,
        author,
        json!({"title": "Draft", "text": "WIP", "is_published": false})
    );

    let req = test::TestRequest::get()
        .uri("/api/profile/author")
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["posts"]["total"], 1);

    let req = test::TestRequest::get()
        .uri("/api/profile/author")
        .insert_header(bearer(&author))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["posts"]["total"], 2);
    assert_eq!(body["data"]["user"]["username"], "author");
}

#[actix_web::test]
async fn test_unknown_category_is_404() {
    let ctx = Context::new();
    let app = app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/category/nowhere")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_web::test]
async fn test_admin_routes_reject_regular_users() {
    let ctx = Context::new();
    let app = app!(ctx);
    let token = register!(app, "regular");

    let req = test::TestRequest::post()
        .uri("/api/admin/categories")
        .insert_header(bearer(&token))
        .set_json(json!({"title": "Travel", "slug": "travel"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get().uri("/api/categories").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"], json!([]));
}

#[actix_web::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = Context::new();
    let app = app!(ctx);
    let token = register!(app, "leo");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&token))
        .insert_header((header::CONTENT_TYPE, "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn test_renamed_user_appears_under_new_name() {
    let ctx = Context::new();
    let app = app!(ctx);
    let token = register!(app, "oldname");
    let post_id = create_post!(app, token, published("Rename me"));

    let req = test::TestRequest::put()
        .uri("/api/profile")
        .insert_header(bearer(&token))
        .set_json(json!({"username": "newname", "email": "new@example.com"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // The token still carries the old username
    let req = test::TestRequest::post()
        .uri(&format!("/api/posts/{post_id}/comments"))
        .insert_header(bearer(&token))
        .set_json(json!({"text": "After the rename"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["author"], "newname");

    let req = test::TestRequest::get()
        .uri(&format!("/api/posts/{post_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["comments"][0]["author"], "newname");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["username"], "newname");
    assert_eq!(body["data"]["email"], "new@example.com");
}
