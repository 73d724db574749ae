//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod auth;
pub mod health;
pub mod roles;
pub mod users;

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// JSON body whose rejections use the API error shape.
///
/// Malformed or mistyped bodies become 400 validation errors instead of
/// axum's plain-text rejections.
pub struct JsonBody<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| AppError::validation(format!("Invalid JSON: {}", e.body_text())))?;

        Ok(JsonBody(value))
    }
}

/// Parse a path id; anything unparseable cannot name an existing record
pub(crate) fn parse_id(raw: &str, resource: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(resource.to_string()))
}

/// Fallback for unknown routes
pub async fn not_found() -> AppError {
    AppError::NotFound("Route".to_string())
}
