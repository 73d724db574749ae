//! Role administration handlers
//!
//! Author: hephaex@gmail.com

use super::{parse_id, JsonBody};
use crate::auth::MessageResponse;
use crate::error::AppError;
use crate::services::{CreateRoleRequest, UpdateRoleRequest};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use erp_core::Role;
use std::sync::Arc;

/// List roles
#[utoipa::path(
    get,
    path = "/api/roles",
    tag = "roles",
    responses(
        (status = 200, description = "All roles", body = Vec<Role>),
        (status = 403, description = "Missing roles:read", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_roles(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Role>>, AppError> {
    Ok(Json(state.role_admin.list().await?))
}

/// Permission catalog
///
/// Available to any authenticated caller.
#[utoipa::path(
    get,
    path = "/api/roles/permissions",
    tag = "roles",
    responses(
        (status = 200, description = "Every assignable permission", body = Vec<String>),
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_permissions(State(state): State<Arc<AppState>>) -> Json<Vec<&'static str>> {
    Json(state.role_admin.available_permissions().to_vec())
}

/// Get role by ID
#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = String, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role", body = Role),
        (status = 404, description = "Role not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Role>, AppError> {
    let id = parse_id(&id, "Role")?;
    Ok(Json(state.role_admin.get(id).await?))
}

/// Create role
#[utoipa::path(
    post,
    path = "/api/roles",
    tag = "roles",
    request_body = CreateRoleRequest,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Invalid name, duplicate name or invalid permissions", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_role(
    State(state): State<Arc<AppState>>,
    JsonBody(request): JsonBody<CreateRoleRequest>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let role = state.role_admin.create(request).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// Update role
#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = String, Path, description = "Role ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 400, description = "Admin role, protected rename or invalid permissions", body = crate::error::ApiError),
        (status = 404, description = "Role not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateRoleRequest>,
) -> Result<Json<Role>, AppError> {
    let id = parse_id(&id, "Role")?;
    Ok(Json(state.role_admin.update(id, request).await?))
}

/// Delete role
#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    tag = "roles",
    params(("id" = String, Path, description = "Role ID")),
    responses(
        (status = 200, description = "Role deleted", body = MessageResponse),
        (status = 400, description = "System role or role in use", body = crate::error::ApiError),
        (status = 404, description = "Role not found", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn delete_role(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id, "Role")?;
    state.role_admin.delete(id).await?;
    Ok(Json(MessageResponse::new("Role deleted successfully")))
}
