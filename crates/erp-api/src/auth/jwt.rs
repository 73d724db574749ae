//! JWT token generation and validation
//!
//! Implements stateless bearer tokens with HMAC-SHA256 signing. The token
//! carries the caller's id, username, role and permission snapshot; there is
//! no server-side session and no revocation list.

use super::identity::Identity;
use erp_core::AuthConfig;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// JWT Claims structure containing the caller identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - user ID
    pub sub: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: u64,
    /// Expiration timestamp (Unix epoch)
    pub exp: u64,
    pub username: String,
    pub role: String,
    /// Permission snapshot, frozen for the token's lifetime
    pub permissions: Vec<String>,
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Token lifetime of {0} seconds is out of range")]
    LifetimeOutOfRange(u64),

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// JWT Configuration
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token lifetime in seconds
    pub expiration_secs: u64,
    /// Token issuer identifier
    pub issuer: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self::from(&AuthConfig::default())
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(auth: &AuthConfig) -> Self {
        Self {
            secret: auth.jwt_secret.clone(),
            expiration_secs: auth.token_lifetime_secs,
            issuer: auth.issuer.clone(),
        }
    }
}

fn now_secs() -> Result<u64, JwtError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}

/// Sign a token for `identity`, expiring `expiration_secs` from now
///
/// # Example
///
/// ```no_run
/// use erp_api::auth::{generate_token, Identity, JwtConfig};
/// use erp_core::{PermissionSet, RoleName};
/// use uuid::Uuid;
///
/// let identity = Identity {
///     id: Uuid::new_v4(),
///     username: "jdoe".to_string(),
///     role: RoleName::user(),
///     permissions: PermissionSet::new(),
/// };
/// let token = generate_token(&JwtConfig::default(), &identity).expect("Failed to sign");
/// ```
pub fn generate_token(config: &JwtConfig, identity: &Identity) -> Result<String, JwtError> {
    let now = now_secs()?;
    let exp = now
        .checked_add(config.expiration_secs)
        .ok_or(JwtError::LifetimeOutOfRange(config.expiration_secs))?;

    let claims = Claims {
        iss: config.issuer.clone(),
        sub: identity.id.to_string(),
        iat: now,
        exp,
        username: identity.username.clone(),
        role: identity.role.to_string(),
        permissions: identity.permissions.to_strings(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Check signature, issuer and expiry, and extract the raw claims
pub fn decode_claims(config: &JwtConfig, token: &str) -> Result<Claims, JwtError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);
    // Expiry is exact; tokens are rejected the second they expire
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
        _ => JwtError::InvalidToken,
    })?;

    Ok(token_data.claims)
}

/// Verify a token and resolve the identity it carries.
///
/// Pure cryptographic and structural check; the user store is not consulted.
pub fn verify_token(config: &JwtConfig, token: &str) -> Result<Identity, JwtError> {
    Identity::try_from(decode_claims(config, token)?)
}
