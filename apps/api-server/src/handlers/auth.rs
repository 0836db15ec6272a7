//! Authentication handlers.

use actix_web::{HttpResponse, web};
use std::sync::Arc;

use blogicum_core::domain::User;
use blogicum_core::ports::{
    AuthError, BaseRepository, PasswordService, TokenService, UserRepository,
};
use blogicum_shared::ApiResponse;
use blogicum_shared::dto::{AuthResponse, CurrentUserResponse, LoginRequest, RegisterUserRequest};

use super::convert;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn issue_token(tokens: &dyn TokenService, user: &User) -> AppResult<AuthResponse> {
    let access_token = tokens.generate_token(user.id, &user.username, user.roles())?;

    Ok(AuthResponse {
        access_token,
        token_type: "Bearer".to_string(),
        expires_in: tokens.expiration_seconds().max(0) as u64,
    })
}

/// POST /api/auth/register
pub async fn register(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<RegisterUserRequest>,
) -> AppResult<HttpResponse> {
    let form = convert::registration_form(body.into_inner());

    // Reject bad input before paying for a hash
    let errors = form.validate();
    if !errors.is_empty() {
        return Err(AppError::Validation(errors.into_messages()));
    }

    let password_hash = password_service.hash(&form.password)?;
    let user = state.service.register(form, password_hash).await?;

    let auth = issue_token(token_service.get_ref().as_ref(), &user)?;
    Ok(HttpResponse::Created().json(ApiResponse::ok(auth)))
}

/// POST /api/auth/login
pub async fn login(
    state: web::Data<AppState>,
    token_service: web::Data<Arc<dyn TokenService>>,
    password_service: web::Data<Arc<dyn PasswordService>>,
    body: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let user = state
        .service
        .users()
        .find_by_username(&req.username)
        .await?
        .ok_or(AuthError::InvalidCredentials)?;

    if !password_service.verify(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(AuthError::InvalidCredentials.into());
    }

    let auth = issue_token(token_service.get_ref().as_ref(), &user)?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(auth)))
}

/// GET /api/auth/me
pub async fn me(state: web::Data<AppState>, identity: Identity) -> AppResult<HttpResponse> {
    let user = state
        .service
        .users()
        .find_by_id(identity.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::ok(CurrentUserResponse {
        user: convert::user_response(&user),
        roles: user.roles(),
        email: user.email,
    })))
}
