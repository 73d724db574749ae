//! Test utilities shared by unit and integration tests
//!
//! Author: hephaex@gmail.com

use crate::auth::{generate_token, Identity};
use crate::create_router;
use crate::seed::seed_defaults;
use crate::state::AppState;
use axum::Router;
use erp_core::config::{AppConfig, RuntimeMode};
use std::sync::Arc;

/// Password of the seeded admin in test state
pub const TEST_ADMIN_PASSWORD: &str = "Admin123!";

/// Test-mode configuration with cheap hashing parameters
pub fn test_config() -> AppConfig {
    let mut config = AppConfig {
        mode: RuntimeMode::Test,
        ..Default::default()
    };
    config.auth.jwt_secret = "test-secret".to_string();
    config.auth.issuer = "erp-api-test".to_string();
    config.auth.hash_memory_kib = 256;
    config.auth.hash_iterations = 1;
    config.auth.hash_parallelism = 1;
    config.auth.admin_default_password = TEST_ADMIN_PASSWORD.to_string();
    // oneshot requests carry no peer address to key on
    config.rate_limit.enabled = false;
    config
}

/// In-memory state seeded with the default roles and admin user
///
/// # Panics
///
/// Panics if seeding fails; only used from tests.
pub async fn test_state() -> Arc<AppState> {
    test_state_with_config(test_config()).await
}

/// Seeded in-memory state over a caller-adjusted configuration
///
/// # Panics
///
/// Panics if seeding fails; only used from tests.
pub async fn test_state_with_config(config: AppConfig) -> Arc<AppState> {
    let state = AppState::in_memory(config);
    seed_defaults(
        state.users.as_ref(),
        state.roles.as_ref(),
        &state.config.auth,
        &state.password,
    )
    .await
    .expect("seeding test state");
    Arc::new(state)
}

/// Router over a freshly seeded in-memory state
pub async fn create_router_for_testing() -> Router {
    create_router(test_state().await)
}

/// Sign a token for an arbitrary identity with the state's settings
///
/// # Panics
///
/// Panics if signing fails; only used from tests.
pub fn token_for(state: &AppState, identity: &Identity) -> String {
    generate_token(&state.jwt, identity).expect("signing test token")
}
