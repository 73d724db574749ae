//! Stored user credentials
//!
//! A credential's `permissions` is a snapshot copied from its role when the
//! role is assigned. It is not a live reference: changing a role's
//! permissions does not touch users already holding it.

use crate::rbac::{PermissionSet, Role, RoleName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// User account as held by the user store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credential {
    pub id: Uuid,

    /// Unique login name
    pub username: String,

    /// Unique email address
    pub email: String,

    /// Argon2id PHC string. Never serialized.
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    pub role: RoleName,

    /// Snapshot of the role's permissions at assignment time
    pub permissions: PermissionSet,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Credential {
    /// Create a new credential holding `role`, snapshotting its permissions
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
        role: &Role,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            role: role.name.clone(),
            permissions: role.permissions.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Move this user to `role` and resnapshot its permissions
    pub fn assign_role(&mut self, role: &Role) {
        self.role = role.name.clone();
        self.permissions = role.permissions.clone();
        self.touch();
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Convert to the public representation (without the password hash)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
            permissions: self.permissions.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Public user representation (safe for API responses)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserPublic {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[schema(value_type = String, example = "user")]
    pub role: RoleName,
    #[schema(value_type = Vec<String>)]
    pub permissions: PermissionSet,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
