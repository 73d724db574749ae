//! User and role storage contracts
//!
//! The RBAC layer only reads and writes through these traits. Two
//! implementations exist: [`MemoryStore`] for development and tests, and
//! [`PgStore`] for production.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::rbac::{Role, RoleName};
use crate::user::Credential;
use crate::Result;
use async_trait::async_trait;
use uuid::Uuid;

pub const USERNAME_TAKEN: &str = "Username already exists";
pub const EMAIL_TAKEN: &str = "Email already exists";
pub const ROLE_NAME_TAKEN: &str = "Role name already exists";

/// Trait for user credential storage
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by exact username
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>>;

    /// Find a user by exact email
    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>>;

    /// List all users, oldest first
    async fn list(&self) -> Result<Vec<Credential>>;

    /// Insert or update by id.
    ///
    /// Fails with [`crate::ErpError::Conflict`] if another user already holds
    /// the username or email.
    async fn save(&self, credential: &Credential) -> Result<()>;

    /// Delete by id, returning whether a user was removed
    async fn delete(&self, id: Uuid) -> Result<bool>;

    /// Number of users holding `role`
    async fn count_by_role(&self, role: &RoleName) -> Result<u64>;
}

/// Trait for role storage
#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn find_by_name(&self, name: &RoleName) -> Result<Option<Role>>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>>;

    /// List all roles, oldest first
    async fn list(&self) -> Result<Vec<Role>>;

    /// Insert or update by id; role names are unique
    async fn save(&self, role: &Role) -> Result<()>;

    async fn delete(&self, id: Uuid) -> Result<bool>;
}
