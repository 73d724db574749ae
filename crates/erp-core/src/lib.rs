//! ERP Core - Domain models, storage contracts, and shared types
//!
//! This crate defines the core abstractions used by the RBAC layer:
//! - Permission strings, the permission catalog, and role names
//! - Roles and stored user credentials
//! - Common error types
//! - User and role store traits (in-memory and PostgreSQL)
//! - Configuration management

pub mod config;
pub mod rbac;
pub mod store;
pub mod user;

pub use config::{
    parse_duration_secs, AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig,
    RateLimitConfig, RuntimeMode, ServerConfig, MAX_TOKEN_LIFETIME_SECS,
};
pub use rbac::{
    validate_permissions, ModelError, Permission, PermissionSet, Role, RoleName,
    PERMISSION_CATALOG, WILDCARD,
};
pub use store::{
    MemoryStore, PgStore, RoleStore, UserStore, EMAIL_TAKEN, ROLE_NAME_TAKEN, USERNAME_TAKEN,
};
pub use user::{Credential, UserPublic};

use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for ERP operations
#[derive(Error, Debug)]
pub enum ErpError {
    #[error("{0} not found")]
    NotFound(String),

    /// A uniqueness constraint was violated (username, email, role name)
    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// A business rule guard refused the operation
    #[error("{0}")]
    InvariantViolation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<ModelError> for ErpError {
    fn from(err: ModelError) -> Self {
        ErpError::ValidationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ErpError>;
