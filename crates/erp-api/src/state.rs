//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::{AuthService, JwtConfig, PasswordConfig};
use crate::services::{RoleService, UserService};
use erp_core::config::AppConfig;
use erp_core::{MemoryStore, RoleStore, UserStore};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    pub users: Arc<dyn UserStore>,
    pub roles: Arc<dyn RoleStore>,
    /// Token settings used by the authentication gate
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub auth: AuthService,
    pub user_admin: UserService,
    pub role_admin: RoleService,
}

impl AppState {
    /// Create application state over the given stores
    pub fn new(config: AppConfig, users: Arc<dyn UserStore>, roles: Arc<dyn RoleStore>) -> Self {
        let jwt = JwtConfig::from(&config.auth);
        let password = PasswordConfig::from(&config.auth);

        Self {
            auth: AuthService::new(users.clone(), jwt.clone(), password.clone()),
            user_admin: UserService::new(users.clone(), roles.clone(), password.clone()),
            role_admin: RoleService::new(roles.clone(), users.clone()),
            config,
            start_time: Instant::now(),
            users,
            roles,
            jwt,
            password,
        }
    }

    /// State backed by a fresh in-memory store
    pub fn in_memory(config: AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(config, store.clone(), store)
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
