//! Authentication gate
//!
//! Extracts and verifies the bearer token from the Authorization header.
//! On success, the resolved [`Identity`] is added to request extensions.
//! The gate is stateless: no storage lookup happens here.

use super::identity::Identity;
use super::jwt::{verify_token, JwtError};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// Gate failures
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No token provided")]
    MissingToken,

    #[error("Invalid Authorization header format")]
    InvalidAuthHeader,

    #[error("Invalid or expired token")]
    InvalidToken(#[from] JwtError),

    /// An authorization gate ran without an identity attached
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    InsufficientPermissions {
        required: Vec<String>,
        current: Vec<String>,
    },

    #[error("Insufficient role")]
    InsufficientRole {
        required: Vec<String>,
        current: String,
    },
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::MissingToken
            | AuthError::InvalidAuthHeader
            | AuthError::InvalidToken(_)
            | AuthError::Unauthenticated => AppError::Unauthenticated(message),
            AuthError::InsufficientPermissions { required, current } => AppError::Forbidden {
                message,
                details: json!({ "required": required, "current": current }),
            },
            AuthError::InsufficientRole { required, current } => AppError::Forbidden {
                message,
                details: json!({ "required": required, "current": current }),
            },
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

/// Pull the token out of `Authorization: Bearer <token>`
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidAuthHeader),
    }
}

/// Authentication middleware that requires a valid token
///
/// # Usage
///
/// ```ignore
/// use axum::{Router, routing::get, middleware};
/// use erp_api::auth::authenticate;
///
/// let app = Router::new()
///     .route("/protected", get(protected_handler))
///     .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));
/// ```
///
/// In handlers, extract the caller:
///
/// ```ignore
/// async fn protected_handler(Extension(identity): Extension<Identity>) -> String {
///     format!("Hello, {}!", identity.username)
/// }
/// ```
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let identity = {
        let token = bearer_token(request.headers()).map_err(|e| {
            tracing::debug!(reason = %e, "request without usable bearer token");
            e
        })?;

        verify_token(&state.jwt, token).map_err(|e| {
            tracing::warn!(reason = %e, "token rejected");
            AuthError::InvalidToken(e)
        })?
    };

    tracing::trace!(user_id = %identity.id, role = %identity.role, "authenticated");
    request.extensions_mut().insert(identity);

    Ok(next.run(request).await)
}
