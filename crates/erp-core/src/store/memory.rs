//! In-memory store
//!
//! Used in development and test mode. State lives in the value, not in a
//! process-wide global, so every test gets its own isolated store.

use super::{RoleStore, UserStore, EMAIL_TAKEN, ROLE_NAME_TAKEN, USERNAME_TAKEN};
use crate::rbac::{Role, RoleName};
use crate::user::Credential;
use crate::{ErpError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory user and role store
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, Credential>>,
    roles: RwLock<HashMap<Uuid, Role>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Credential>> {
        let mut users: Vec<Credential> = self.users.read().await.values().cloned().collect();
        users.sort_by_key(|u| u.created_at);
        Ok(users)
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        let mut users = self.users.write().await;

        for other in users.values().filter(|u| u.id != credential.id) {
            if other.username == credential.username {
                return Err(ErpError::Conflict(USERNAME_TAKEN.to_string()));
            }
            if other.email == credential.email {
                return Err(ErpError::Conflict(EMAIL_TAKEN.to_string()));
            }
        }

        users.insert(credential.id, credential.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.users.write().await.remove(&id).is_some())
    }

    async fn count_by_role(&self, role: &RoleName) -> Result<u64> {
        let users = self.users.read().await;
        Ok(users.values().filter(|u| &u.role == role).count() as u64)
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn find_by_name(&self, name: &RoleName) -> Result<Option<Role>> {
        let roles = self.roles.read().await;
        Ok(roles.values().find(|r| &r.name == name).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>> {
        Ok(self.roles.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let mut roles: Vec<Role> = self.roles.read().await.values().cloned().collect();
        roles.sort_by_key(|r| r.created_at);
        Ok(roles)
    }

    async fn save(&self, role: &Role) -> Result<()> {
        let mut roles = self.roles.write().await;

        if roles
            .values()
            .any(|r| r.id != role.id && r.name == role.name)
        {
            return Err(ErpError::Conflict(ROLE_NAME_TAKEN.to_string()));
        }

        roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        Ok(self.roles.write().await.remove(&id).is_some())
    }
}
