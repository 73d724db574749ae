//! Authentication API handlers
//!
//! Author: hephaex@gmail.com

use super::JsonBody;
use crate::auth::{Identity, LoginRequest, LoginResponse, MessageResponse};
use crate::error::AppError;
use crate::state::AppState;
use axum::{extract::State, Extension, Json};
use std::sync::Arc;

/// Authenticate user and return a token
///
/// Unknown username and wrong password produce the same 401 response.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing username or password", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    Ok(Json(state.auth.login(request).await?))
}

/// Logout
///
/// Tokens are stateless; the client discards its token. Always succeeds.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = MessageResponse),
    )
)]
pub async fn logout_handler(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    Json(state.auth.logout())
}

/// Identity carried by the caller's token
#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "Caller identity", body = Identity),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn me_handler(Extension(identity): Extension<Identity>) -> Json<Identity> {
    Json(identity)
}
