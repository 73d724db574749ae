//! Request-scoped caller identity
//!
//! Built from verified token claims and inserted into request extensions by
//! the authentication gate. It is never re-read from storage, so permissions
//! reflect the state at token issuance.

use super::jwt::{Claims, JwtError};
use erp_core::{Credential, PermissionSet, RoleName};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    #[schema(value_type = String, example = "user")]
    pub role: RoleName,
    #[schema(value_type = Vec<String>)]
    pub permissions: PermissionSet,
}

impl Identity {
    /// Admin bypass is decided by role, not by the permission set
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

impl From<&Credential> for Identity {
    fn from(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            username: credential.username.clone(),
            role: credential.role.clone(),
            permissions: credential.permissions.clone(),
        }
    }
}

impl TryFrom<Claims> for Identity {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        // A correctly signed token with a malformed payload is still rejected
        let id = Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidToken)?;
        let role = RoleName::parse(&claims.role).map_err(|_| JwtError::InvalidToken)?;
        let permissions =
            PermissionSet::parse(&claims.permissions).map_err(|_| JwtError::InvalidToken)?;

        Ok(Self {
            id,
            username: claims.username,
            role,
            permissions,
        })
    }
}
