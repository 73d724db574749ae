//! Role and permission model
//!
//! Permissions are `"<resource>:<action>"` strings drawn from a fixed catalog.
//! The literal `"*"` is the wildcard granted to the `admin` role. It never
//! satisfies a permission requirement by set membership: the admin bypass in
//! the authorization gate is decided by role, not by the permission set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// Wildcard permission sentinel
pub const WILDCARD: &str = "*";

/// Name of the reserved superuser role
pub const ADMIN_ROLE: &str = "admin";

/// Name of the reserved default role
pub const USER_ROLE: &str = "user";

const MAX_ROLE_NAME_LEN: usize = 64;

/// Every permission the system knows about.
///
/// Process-wide static configuration; roles may only reference entries from
/// this list (or the wildcard).
pub const PERMISSION_CATALOG: &[&str] = &[
    "users:create",
    "users:read",
    "users:update",
    "users:delete",
    "roles:create",
    "roles:read",
    "roles:update",
    "roles:delete",
    "inventory:create",
    "inventory:read",
    "inventory:update",
    "inventory:delete",
    "crm:create",
    "crm:read",
    "crm:update",
    "crm:delete",
    "accounting:create",
    "accounting:read",
    "accounting:update",
    "accounting:delete",
];

/// Role and permission parsing errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid permission format: {0}")]
    InvalidPermission(String),

    #[error("Invalid role name: {0}")]
    InvalidRoleName(String),
}

fn is_name_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

// ============================================================================
// Permission
// ============================================================================

/// A single permission string, `"<resource>:<action>"` or the wildcard `"*"`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Permission(String);

impl Permission {
    /// Parse and validate a permission string
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        if s == WILDCARD {
            return Ok(Self(s.to_string()));
        }

        match s.split_once(':') {
            Some((resource, action)) if is_name_segment(resource) && is_name_segment(action) => {
                Ok(Self(s.to_string()))
            }
            _ => Err(ModelError::InvalidPermission(s.to_string())),
        }
    }

    pub fn wildcard() -> Self {
        Self(WILDCARD.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.0 == WILDCARD
    }

    /// Whether this permission appears in [`PERMISSION_CATALOG`]
    pub fn is_cataloged(&self) -> bool {
        PERMISSION_CATALOG.contains(&self.0.as_str())
    }

    /// Resource part (`users` in `users:read`); empty for the wildcard
    pub fn resource(&self) -> &str {
        self.0.split_once(':').map(|(r, _)| r).unwrap_or("")
    }

    /// Action part (`read` in `users:read`); empty for the wildcard
    pub fn action(&self) -> &str {
        self.0.split_once(':').map(|(_, a)| a).unwrap_or("")
    }
}

impl TryFrom<String> for Permission {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Permission> for String {
    fn from(p: Permission) -> Self {
        p.0
    }
}

impl FromStr for Permission {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// PermissionSet
// ============================================================================

/// Ordered set of permissions held by a role, a stored user, or an identity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<Permission>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The `["*"]` set carried by the admin role
    pub fn wildcard() -> Self {
        std::iter::once(Permission::wildcard()).collect()
    }

    /// Parse a list of strings, failing on the first malformed entry
    pub fn parse<S: AsRef<str>>(items: &[S]) -> Result<Self, ModelError> {
        items.iter().map(|s| Permission::parse(s.as_ref())).collect()
    }

    pub fn insert(&mut self, permission: Permission) -> bool {
        self.0.insert(permission)
    }

    /// Raw membership, including the wildcard entry
    pub fn contains(&self, permission: &Permission) -> bool {
        self.0.contains(permission)
    }

    /// Whether holding this set satisfies `permission`.
    ///
    /// A wildcard requirement is never granted by membership.
    pub fn grants(&self, permission: &Permission) -> bool {
        !permission.is_wildcard() && self.0.contains(permission)
    }

    /// AND semantics: every required permission must be granted
    pub fn contains_all(&self, required: &[Permission]) -> bool {
        required.iter().all(|p| self.grants(p))
    }

    /// Required permissions that this set does not grant, in input order
    pub fn missing(&self, required: &[Permission]) -> Vec<Permission> {
        required
            .iter()
            .filter(|p| !self.grants(p))
            .cloned()
            .collect()
    }

    pub fn has_wildcard(&self) -> bool {
        self.0.iter().any(Permission::is_wildcard)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.0.iter().map(|p| p.0.clone()).collect()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a PermissionSet {
    type Item = &'a Permission;
    type IntoIter = std::collections::btree_set::Iter<'a, Permission>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Validate role permissions against the catalog.
///
/// Every entry must be a cataloged permission or the wildcard. On failure the
/// error lists every invalid entry in input order.
pub fn validate_permissions<S: AsRef<str>>(items: &[S]) -> Result<PermissionSet, Vec<String>> {
    let invalid: Vec<String> = items
        .iter()
        .map(|s| s.as_ref())
        .filter(|s: &&str| *s != WILDCARD && !PERMISSION_CATALOG.contains(s))
        .map(str::to_string)
        .collect();

    if !invalid.is_empty() {
        return Err(invalid);
    }

    // Catalog entries and the wildcard always parse
    PermissionSet::parse(items).map_err(|e| vec![e.to_string()])
}

// ============================================================================
// RoleName
// ============================================================================

/// Validated reference to a role.
///
/// Lowercase ASCII letters, digits, `_` and `-`, at most 64 characters. Role
/// comparisons are exact, so a mistyped name cannot silently create an
/// ungoverned role.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoleName(String);

impl RoleName {
    pub fn parse(s: &str) -> Result<Self, ModelError> {
        if s.len() > MAX_ROLE_NAME_LEN || !is_name_segment(s) {
            return Err(ModelError::InvalidRoleName(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn admin() -> Self {
        Self(ADMIN_ROLE.to_string())
    }

    pub fn user() -> Self {
        Self(USER_ROLE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.0 == ADMIN_ROLE
    }

    /// `admin` and `user` are system roles and cannot be deleted
    pub fn is_reserved(&self) -> bool {
        self.0 == ADMIN_ROLE || self.0 == USER_ROLE
    }
}

impl TryFrom<String> for RoleName {
    type Error = ModelError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoleName> for String {
    fn from(name: RoleName) -> Self {
        name.0
    }
}

impl FromStr for RoleName {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for RoleName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

// ============================================================================
// Role
// ============================================================================

/// Role definition
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Uuid,

    #[schema(value_type = String, example = "user")]
    pub name: RoleName,

    pub description: String,

    #[schema(value_type = Vec<String>, example = json!(["users:read", "roles:read"]))]
    pub permissions: PermissionSet,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Role {
    pub fn new(name: RoleName, description: impl Into<String>, permissions: PermissionSet) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            description: description.into(),
            permissions,
            created_at: now,
            updated_at: now,
        }
    }

    /// Built-in superuser role with the wildcard permission
    pub fn admin() -> Self {
        Self::new(
            RoleName::admin(),
            "Administrator with full system access",
            PermissionSet::wildcard(),
        )
    }

    /// Built-in default role with read access to users and roles
    pub fn default_user() -> Self {
        let permissions = PermissionSet::parse(&["users:read", "roles:read"])
            .unwrap_or_default();
        Self::new(RoleName::user(), "Standard user with limited access", permissions)
    }

    pub fn is_admin(&self) -> bool {
        self.name.is_admin()
    }

    pub fn is_reserved(&self) -> bool {
        self.name.is_reserved()
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(items: &[&str]) -> Vec<Permission> {
        items.iter().map(|s| Permission::parse(s).unwrap()).collect()
    }

    #[test]
    fn test_permission_parse() {
        let p = Permission::parse("users:read").unwrap();
        assert_eq!(p.resource(), "users");
        assert_eq!(p.action(), "read");
        assert!(p.is_cataloged());

        assert!(Permission::parse("*").unwrap().is_wildcard());
        assert!(Permission::parse("custom_thing:do-it").is_ok());

        assert!(Permission::parse("users").is_err());
        assert!(Permission::parse("users:").is_err());
        assert!(Permission::parse(":read").is_err());
        assert!(Permission::parse("Users:Read").is_err());
        assert!(Permission::parse("users:read:extra").is_err());
        assert!(Permission::parse("").is_err());
    }

    #[test]
    fn test_catalog_shape() {
        assert_eq!(PERMISSION_CATALOG.len(), 20);
        for entry in PERMISSION_CATALOG {
            let p = Permission::parse(entry).unwrap();
            assert!(!p.is_wildcard());
        }
    }

    #[test]
    fn test_contains_all_is_and_semantics() {
        let held: PermissionSet = perms(&["users:read"]).into_iter().collect();

        assert!(held.contains_all(&perms(&["users:read"])));
        assert!(!held.contains_all(&perms(&["users:read", "users:update"])));
        assert_eq!(
            held.missing(&perms(&["users:read", "users:update"])),
            perms(&["users:update"])
        );
    }

    #[test]
    fn test_wildcard_never_granted_by_membership() {
        let held = PermissionSet::wildcard();
        assert!(held.has_wildcard());
        assert!(!held.contains_all(&perms(&["users:read"])));
        assert!(!held.grants(&Permission::wildcard()));
    }

    #[test]
    fn test_validate_permissions_lists_invalid_entries() {
        let ok = validate_permissions(&["users:read", "*"]).unwrap();
        assert_eq!(ok.len(), 2);

        let err = validate_permissions(&["users:read", "bogus:perm", "nonsense"]).unwrap_err();
        assert_eq!(err, vec!["bogus:perm".to_string(), "nonsense".to_string()]);
    }

    #[test]
    fn test_role_name_validation() {
        assert!(RoleName::parse("sales-manager").is_ok());
        assert!(RoleName::parse("ops_2").is_ok());
        assert!(RoleName::parse("").is_err());
        assert!(RoleName::parse("Admin").is_err());
        assert!(RoleName::parse("has space").is_err());
        assert!(RoleName::parse(&"a".repeat(65)).is_err());

        assert!(RoleName::admin().is_admin());
        assert!(RoleName::admin().is_reserved());
        assert!(RoleName::user().is_reserved());
        assert!(!RoleName::parse("editor").unwrap().is_reserved());
    }

    #[test]
    fn test_default_roles() {
        let admin = Role::admin();
        assert!(admin.is_admin());
        assert!(admin.permissions.has_wildcard());

        let user = Role::default_user();
        assert_eq!(user.permissions.to_strings(), vec!["roles:read", "users:read"]);
    }

    #[test]
    fn test_serde_rejects_malformed_values() {
        let ok: Result<RoleName, _> = serde_json::from_str("\"user\"");
        assert!(ok.is_ok());

        let bad: Result<RoleName, _> = serde_json::from_str("\"Not Valid\"");
        assert!(bad.is_err());

        let set: PermissionSet = serde_json::from_str(r#"["users:read","*"]"#).unwrap();
        assert!(set.has_wildcard());
        assert_eq!(serde_json::to_string(&set).unwrap(), r#"["*","users:read"]"#);
    }
}
