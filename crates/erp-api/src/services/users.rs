//! User administration
//!
//! CRUD over stored credentials. A user's permission set is a snapshot of
//! its role's permissions, refreshed every time a role is assigned. The
//! service refuses any change that would leave no `admin`-role user.

use crate::auth::password::{hash_password_async, validate_password_strength, PasswordConfig};
use crate::error::AppError;
use erp_core::{
    Credential, Role, RoleName, RoleStore, UserPublic, UserStore, EMAIL_TAKEN, USERNAME_TAKEN,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

pub const LAST_ADMIN_DELETE: &str = "Cannot delete the last admin user";
pub const LAST_ADMIN_DEMOTE: &str = "Cannot change the role of the last admin user";
pub const INVALID_ROLE: &str = "Invalid role";

/// Create user request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct CreateUserRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(email(message = "Valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
    #[validate(length(min = 1, message = "Role is required"))]
    pub role: String,
}

/// Partial user update; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, message = "Username cannot be empty"))]
    pub username: Option<String>,
    #[validate(email(message = "Valid email is required"))]
    pub email: Option<String>,
    #[validate(length(min = 1, message = "Role cannot be empty"))]
    pub role: Option<String>,
    pub password: Option<String>,
}

/// User administration service
pub struct UserService {
    users: Arc<dyn UserStore>,
    roles: Arc<dyn RoleStore>,
    password: PasswordConfig,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        roles: Arc<dyn RoleStore>,
        password: PasswordConfig,
    ) -> Self {
        Self {
            users,
            roles,
            password,
        }
    }

    pub async fn list(&self) -> Result<Vec<UserPublic>, AppError> {
        let users = self.users.list().await?;
        Ok(users.iter().map(Credential::to_public).collect())
    }

    pub async fn get(&self, id: Uuid) -> Result<UserPublic, AppError> {
        Ok(self.find(id).await?.to_public())
    }

    /// Create a user holding an existing role
    ///
    /// Checks run in a fixed order and the first failure is reported:
    /// field validation, username taken, email taken, password strength,
    /// unknown role.
    pub async fn create(&self, request: CreateUserRequest) -> Result<UserPublic, AppError> {
        request.validate()?;

        self.ensure_username_free(&request.username).await?;
        self.ensure_email_free(&request.email).await?;
        validate_password_strength(&request.password)
            .map_err(|weak| AppError::validation(weak.to_string()))?;
        let role = self.resolve_role(&request.role).await?;

        let hash = hash_password_async(request.password, self.password.clone()).await?;
        let user = Credential::new(request.username, request.email, hash, &role);
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, role = %user.role, "user created");
        Ok(user.to_public())
    }

    pub async fn update(&self, id: Uuid, request: UpdateUserRequest) -> Result<UserPublic, AppError> {
        request.validate()?;
        let mut user = self.find(id).await?;

        if let Some(username) = request.username {
            if username != user.username {
                self.ensure_username_free(&username).await?;
                user.username = username;
            }
        }

        if let Some(email) = request.email {
            if email != user.email {
                self.ensure_email_free(&email).await?;
                user.email = email;
            }
        }

        if let Some(role) = request.role {
            let role = self.resolve_role(&role).await?;
            if user.is_admin() && !role.is_admin() && self.is_last_admin().await? {
                return Err(AppError::Invariant(LAST_ADMIN_DEMOTE.to_string()));
            }
            // Assigning a role, even the current one, refreshes the snapshot
            user.assign_role(&role);
        }

        // An empty password means "leave unchanged"
        if let Some(password) = request.password.filter(|p| !p.is_empty()) {
            validate_password_strength(&password)
                .map_err(|weak| AppError::validation(weak.to_string()))?;
            user.password_hash = hash_password_async(password, self.password.clone()).await?;
        }

        user.touch();
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, role = %user.role, "user updated");
        Ok(user.to_public())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let user = self.find(id).await?;

        if user.is_admin() && self.is_last_admin().await? {
            tracing::warn!(user_id = %user.id, "refused to delete the last admin user");
            return Err(AppError::Invariant(LAST_ADMIN_DELETE.to_string()));
        }

        // The count check and the delete are separate store calls
        if !self.users.delete(id).await? {
            return Err(AppError::NotFound("User".to_string()));
        }

        tracing::info!(user_id = %id, username = %user.username, "user deleted");
        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Credential, AppError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string()))
    }

    async fn is_last_admin(&self) -> Result<bool, AppError> {
        Ok(self.users.count_by_role(&RoleName::admin()).await? <= 1)
    }

    async fn ensure_username_free(&self, username: &str) -> Result<(), AppError> {
        match self.users.find_by_username(username).await? {
            Some(_) => Err(AppError::Conflict(USERNAME_TAKEN.to_string())),
            None => Ok(()),
        }
    }

    async fn ensure_email_free(&self, email: &str) -> Result<(), AppError> {
        match self.users.find_by_email(email).await? {
            Some(_) => Err(AppError::Conflict(EMAIL_TAKEN.to_string())),
            None => Ok(()),
        }
    }

    async fn resolve_role(&self, name: &str) -> Result<Role, AppError> {
        let Ok(name) = RoleName::parse(name) else {
            return Err(AppError::validation(INVALID_ROLE));
        };
        self.roles
            .find_by_name(&name)
            .await?
            .ok_or_else(|| AppError::validation(INVALID_ROLE))
    }
}
