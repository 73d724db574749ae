//! PostgreSQL store
//!
//! Provides persistent user and role storage using SQLx and PostgreSQL.

use super::{RoleStore, UserStore, EMAIL_TAKEN, ROLE_NAME_TAKEN, USERNAME_TAKEN};
use crate::rbac::{PermissionSet, Role, RoleName};
use crate::user::Credential;
use crate::{ErpError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS roles (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        permissions TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        CONSTRAINT roles_name_key UNIQUE (name)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL,
        email TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL,
        permissions TEXT[] NOT NULL DEFAULT '{}',
        created_at TIMESTAMPTZ NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL,
        CONSTRAINT users_username_key UNIQUE (username),
        CONSTRAINT users_email_key UNIQUE (email)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS users_role_idx ON users (role)",
];

/// PostgreSQL user and role store
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| ErpError::DatabaseError(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the `roles` and `users` tables if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| ErpError::DatabaseError(format!("Failed to create schema: {e}")))?;
        }
        tracing::debug!("database schema ensured");
        Ok(())
    }
}

/// Map a unique-constraint violation to a conflict, anything else to a database error
fn map_write_error(err: sqlx::Error, context: &str) -> ErpError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let message = match db.constraint() {
                Some("users_username_key") => USERNAME_TAKEN,
                Some("users_email_key") => EMAIL_TAKEN,
                Some("roles_name_key") => ROLE_NAME_TAKEN,
                _ => "Duplicate record",
            };
            return ErpError::Conflict(message.to_string());
        }
    }
    ErpError::DatabaseError(format!("{context}: {err}"))
}

fn parse_permissions(items: &[String]) -> Result<PermissionSet> {
    PermissionSet::parse(items)
        .map_err(|e| ErpError::DatabaseError(format!("Corrupt stored permission: {e}")))
}

fn parse_role_name(name: &str) -> Result<RoleName> {
    RoleName::parse(name)
        .map_err(|e| ErpError::DatabaseError(format!("Corrupt stored role name: {e}")))
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    permissions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for Credential {
    type Error = ErpError;

    fn try_from(row: UserRow) -> Result<Self> {
        Ok(Credential {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: parse_role_name(&row.role)?,
            permissions: parse_permissions(&row.permissions)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Role row from database
#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    description: String,
    permissions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<RoleRow> for Role {
    type Error = ErpError;

    fn try_from(row: RoleRow) -> Result<Self> {
        Ok(Role {
            id: row.id,
            name: parse_role_name(&row.name)?,
            description: row.description,
            permissions: parse_permissions(&row.permissions)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str =
    "id, username, email, password_hash, role, permissions, created_at, updated_at";
const ROLE_COLUMNS: &str = "id, name, description, permissions, created_at, updated_at";

impl PgStore {
    async fn fetch_user(&self, column: &str, value: &str) -> Result<Option<Credential>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ErpError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        row.map(Credential::try_from).transpose()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>> {
        self.fetch_user("username", username).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Credential>> {
        self.fetch_user("email", email).await
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Credential>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ErpError::DatabaseError(format!("Failed to fetch user: {e}")))?;

        row.map(Credential::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Credential>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ErpError::DatabaseError(format!("Failed to list users: {e}")))?;

        rows.into_iter().map(Credential::try_from).collect()
    }

    async fn save(&self, credential: &Credential) -> Result<()> {
        // Role and permission snapshot are written in the same statement
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, password_hash, role, permissions, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                role = EXCLUDED.role,
                permissions = EXCLUDED.permissions,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(credential.id)
        .bind(&credential.username)
        .bind(&credential.email)
        .bind(&credential.password_hash)
        .bind(credential.role.as_str())
        .bind(credential.permissions.to_strings())
        .bind(credential.created_at)
        .bind(credential.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to save user"))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ErpError::DatabaseError(format!("Failed to delete user: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn count_by_role(&self, role: &RoleName) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE role = $1")
            .bind(role.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ErpError::DatabaseError(format!("Failed to count users: {e}")))?;

        Ok(count.max(0) as u64)
    }
}

#[async_trait]
impl RoleStore for PgStore {
    async fn find_by_name(&self, name: &RoleName) -> Result<Option<Role>> {
        let row: Option<RoleRow> =
            sqlx::query_as(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE name = $1"))
                .bind(name.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ErpError::DatabaseError(format!("Failed to fetch role: {e}")))?;

        row.map(Role::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Role>> {
        let row: Option<RoleRow> =
            sqlx::query_as(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ErpError::DatabaseError(format!("Failed to fetch role: {e}")))?;

        row.map(Role::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Role>> {
        let rows: Vec<RoleRow> = sqlx::query_as(&format!(
            "SELECT {ROLE_COLUMNS} FROM roles ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ErpError::DatabaseError(format!("Failed to list roles: {e}")))?;

        rows.into_iter().map(Role::try_from).collect()
    }

    async fn save(&self, role: &Role) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO roles (id, name, description, permissions, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                description = EXCLUDED.description,
                permissions = EXCLUDED.permissions,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(role.id)
        .bind(role.name.as_str())
        .bind(&role.description)
        .bind(role.permissions.to_strings())
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, "Failed to save role"))?;

        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| ErpError::DatabaseError(format!("Failed to delete role: {e}")))?;

        Ok(result.rows_affected() > 0)
    }
}
