//! Authentication service layer
//!
//! Login is the only path that mints a token. Logout is an acknowledgment:
//! tokens are self-contained, so there is no server-side session to revoke.

use super::identity::Identity;
use super::jwt::{generate_token, JwtConfig, JwtError};
use super::password::{
    hash_password_async, verify_password_async, PasswordConfig, PasswordError,
};
use crate::error::AppError;
use erp_core::{UserPublic, UserStore};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use validator::Validate;

/// Hashed once per service and verified against when the username is
/// unknown, so both login failures cost one Argon2 verification.
const TIMING_DECOY_PASSWORD: &str = "timing-decoy-password-0";

/// User login request
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(default)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
    pub user: UserPublic,
}

/// Plain acknowledgment body
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<JwtError> for AppError {
    fn from(err: JwtError) -> Self {
        AppError::Internal(err.to_string())
    }
}

/// Authentication service
pub struct AuthService {
    users: Arc<dyn UserStore>,
    jwt: JwtConfig,
    password: PasswordConfig,
    decoy_hash: OnceCell<String>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, jwt: JwtConfig, password: PasswordConfig) -> Self {
        Self {
            users,
            jwt,
            password,
            decoy_hash: OnceCell::new(),
        }
    }

    async fn decoy_hash(&self) -> Result<String, AppError> {
        if let Some(hash) = self.decoy_hash.get() {
            return Ok(hash.clone());
        }
        let hash =
            hash_password_async(TIMING_DECOY_PASSWORD.to_string(), self.password.clone()).await?;
        Ok(self.decoy_hash.get_or_init(|| hash).clone())
    }

    /// Authenticate by username and password
    ///
    /// # Returns
    ///
    /// * `Ok(LoginResponse)` - Token plus the password-free user
    /// * `Err(AppError::InvalidCredentials)` - Unknown user or wrong password,
    ///   indistinguishable to the caller
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        request.validate()?;

        let Some(user) = self.users.find_by_username(&request.username).await? else {
            // Burn the same verification cost as a real mismatch
            let decoy = self.decoy_hash().await?;
            let _ = verify_password_async(request.password, decoy).await;
            tracing::info!(username = %request.username, reason = "unknown user", "login failed");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password_async(request.password, user.password_hash.clone()).await? {
            tracing::info!(user_id = %user.id, reason = "wrong password", "login failed");
            return Err(AppError::InvalidCredentials);
        }

        let token = generate_token(&self.jwt, &Identity::from(&user))?;
        tracing::info!(user_id = %user.id, username = %user.username, role = %user.role, "login succeeded");

        Ok(LoginResponse {
            message: "Login successful".to_string(),
            token,
            user: user.to_public(),
        })
    }

    /// Stateless logout; the client discards its token
    pub fn logout(&self) -> MessageResponse {
        MessageResponse::new("Logout successful")
    }
}
