//! Role administration
//!
//! The `admin` role is immutable. `admin` and `user` cannot be deleted or
//! renamed, and a role held by any user cannot be renamed or deleted.
//! Changing a role's permissions does not touch users already holding it;
//! they pick the change up on their next role assignment.

use crate::error::AppError;
use erp_core::{
    validate_permissions, PermissionSet, Role, RoleName, RoleStore, UserStore, PERMISSION_CATALOG,
    ROLE_NAME_TAKEN,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const ADMIN_IMMUTABLE: &str = "Cannot modify admin role";
pub const SYSTEM_ROLE_DELETE: &str = "Cannot delete default system roles";
pub const SYSTEM_ROLE_RENAME: &str = "Cannot rename default system roles";
pub const ROLE_IN_USE_DELETE: &str = "Cannot delete a role that is assigned to users";
pub const ROLE_IN_USE_RENAME: &str = "Cannot rename a role that is assigned to users";

/// Create role request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct CreateRoleRequest {
    #[validate(length(min = 1, message = "Role name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(required(message = "Permissions must be an array"))]
    pub permissions: Option<Vec<String>>,
}

/// Partial role update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateRoleRequest {
    #[validate(length(min = 1, message = "Role name cannot be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub permissions: Option<Vec<String>>,
}

/// Role administration service
pub struct RoleService {
    roles: Arc<dyn RoleStore>,
    users: Arc<dyn UserStore>,
}

impl RoleService {
    pub fn new(roles: Arc<dyn RoleStore>, users: Arc<dyn UserStore>) -> Self {
        Self { roles, users }
    }

    pub async fn list(&self) -> Result<Vec<Role>, AppError> {
        Ok(self.roles.list().await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Role, AppError> {
        self.find(id).await
    }

    /// The static permission catalog
    pub fn available_permissions(&self) -> &'static [&'static str] {
        PERMISSION_CATALOG
    }

    pub async fn create(&self, request: CreateRoleRequest) -> Result<Role, AppError> {
        request.validate()?;

        let name = parse_role_name(&request.name)?;
        if self.roles.find_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict(ROLE_NAME_TAKEN.to_string()));
        }

        let permissions = check_permissions(&request.permissions.unwrap_or_default())?;
        let role = Role::new(name, request.description.unwrap_or_default(), permissions);
        self.roles.save(&role).await?;

        tracing::info!(role_id = %role.id, name = %role.name, "role created");
        Ok(role)
    }

    pub async fn update(&self, id: Uuid, request: UpdateRoleRequest) -> Result<Role, AppError> {
        request.validate()?;
        let mut role = self.find(id).await?;

        if role.is_admin() {
            tracing::warn!(role_id = %role.id, "refused to modify the admin role");
            return Err(AppError::Invariant(ADMIN_IMMUTABLE.to_string()));
        }

        if let Some(name) = request.name {
            let name = parse_role_name(&name)?;
            if name != role.name {
                if role.is_reserved() {
                    return Err(AppError::Invariant(SYSTEM_ROLE_RENAME.to_string()));
                }
                if self.holders(&role.name).await? > 0 {
                    return Err(AppError::Invariant(ROLE_IN_USE_RENAME.to_string()));
                }
                if self.roles.find_by_name(&name).await?.is_some() {
                    return Err(AppError::Conflict(ROLE_NAME_TAKEN.to_string()));
                }
                role.name = name;
            }
        }

        if let Some(permissions) = request.permissions {
            role.permissions = check_permissions(&permissions)?;
        }

        if let Some(description) = request.description {
            role.description = description;
        }

        role.touch();
        self.roles.save(&role).await?;

        tracing::info!(role_id = %role.id, name = %role.name, "role updated");
        Ok(role)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let role = self.find(id).await?;

        if role.is_reserved() {
            return Err(AppError::Invariant(SYSTEM_ROLE_DELETE.to_string()));
        }
        if self.holders(&role.name).await? > 0 {
            return Err(AppError::Invariant(ROLE_IN_USE_DELETE.to_string()));
        }

        if !self.roles.delete(id).await? {
            return Err(AppError::NotFound("Role".to_string()));
        }

        tracing::info!(role_id = %id, name = %role.name, "role deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Role, AppError> {
        self.roles
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Role".to_string()))
    }

    async fn holders(&self, name: &RoleName) -> Result<u64, AppError> {
        Ok(self.users.count_by_role(name).await?)
    }
}

fn parse_role_name(name: &str) -> Result<RoleName, AppError> {
    RoleName::parse(name).map_err(|e| AppError::validation(e.to_string()))
}

/// Every entry must be cataloged or the wildcard; all offenders are listed
fn check_permissions(permissions: &[String]) -> Result<PermissionSet, AppError> {
    validate_permissions(permissions).map_err(|invalid| AppError::Validation {
        message: "Invalid permissions".to_string(),
        details: Some(json!({ "invalid": invalid })),
    })
}
