//! Default data seeding
//!
//! Ensures the two system roles and the initial `admin` user exist. Every
//! step checks before writing, so running it on each startup is safe.

use crate::auth::password::{hash_password_async, validate_password_strength, PasswordConfig};
use anyhow::{bail, Context};
use erp_core::config::DEFAULT_ADMIN_PASSWORD;
use erp_core::{AuthConfig, Credential, Role, RoleName, RoleStore, UserStore};

pub const ADMIN_USERNAME: &str = "admin";
pub const ADMIN_EMAIL: &str = "admin@erp.com";

/// What a seeding run created
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub created_roles: Vec<String>,
    pub created_admin: bool,
}

/// Create missing default roles and the default admin user
pub async fn seed_defaults(
    users: &dyn UserStore,
    roles: &dyn RoleStore,
    auth: &AuthConfig,
    password: &PasswordConfig,
) -> anyhow::Result<SeedReport> {
    let mut report = SeedReport::default();

    let admin_role = ensure_role(roles, Role::admin(), &mut report).await?;
    ensure_role(roles, Role::default_user(), &mut report).await?;

    if users
        .find_by_username(ADMIN_USERNAME)
        .await
        .context("looking up default admin user")?
        .is_none()
    {
        if let Err(weak) = validate_password_strength(&auth.admin_default_password) {
            bail!("ADMIN_DEFAULT_PASSWORD is too weak: {weak}");
        }
        if auth.admin_default_password == DEFAULT_ADMIN_PASSWORD {
            tracing::warn!(
                username = ADMIN_USERNAME,
                "seeding admin user with the built-in default password; set ADMIN_DEFAULT_PASSWORD"
            );
        }

        let hash = hash_password_async(auth.admin_default_password.clone(), password.clone())
            .await
            .context("hashing default admin password")?;
        let admin = Credential::new(ADMIN_USERNAME, ADMIN_EMAIL, hash, &admin_role);
        users.save(&admin).await.context("saving default admin user")?;

        tracing::info!(user_id = %admin.id, username = ADMIN_USERNAME, "default admin user created");
        report.created_admin = true;
    }

    Ok(report)
}

async fn ensure_role(
    roles: &dyn RoleStore,
    default: Role,
    report: &mut SeedReport,
) -> anyhow::Result<Role> {
    let name: RoleName = default.name.clone();
    if let Some(existing) = roles
        .find_by_name(&name)
        .await
        .with_context(|| format!("looking up role {name}"))?
    {
        return Ok(existing);
    }

    roles
        .save(&default)
        .await
        .with_context(|| format!("saving role {name}"))?;
    tracing::info!(role = %name, "default role created");
    report.created_roles.push(name.to_string());
    Ok(default)
}
