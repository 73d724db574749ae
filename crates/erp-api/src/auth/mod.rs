//! Authentication and authorization module
//!
//! This module provides token-based authentication with the following components:
//! - Token generation and verification
//! - Password hashing with Argon2 and strength rules
//! - The authentication gate (bearer token to [`Identity`])
//! - The authorization gate (permission and role checks)
//! - The login flow

pub mod identity;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod rbac;
pub mod service;

pub use identity::Identity;
pub use jwt::{decode_claims, generate_token, verify_token, Claims, JwtConfig, JwtError};
pub use middleware::{authenticate, bearer_token, AuthError};
pub use password::{
    hash_password, hash_password_with_config, validate_password_strength, verify_password,
    PasswordConfig, PasswordError, WeakPassword,
};
pub use rbac::{check_permissions, check_roles, require_permissions, require_roles};
pub use service::{AuthService, LoginRequest, LoginResponse, MessageResponse};
