//! Authorization gate
//!
//! Two composable checks that run after [`super::authenticate`]:
//! - [`require_permissions`]: AND over every listed permission, with the
//!   `admin` role bypassing the check entirely.
//! - [`require_roles`]: the caller's role must be one of the listed roles.
//!
//! Both fail closed. A requirement string that is not a valid permission or
//! role name is never satisfied.

use super::identity::Identity;
use super::middleware::AuthError;
use axum::{extract::Request, middleware::Next, response::Response};
use erp_core::Permission;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Boxed future returned by the gate factories
pub type GateFuture = Pin<Box<dyn Future<Output = Result<Response, AuthError>> + Send>>;

/// Decide whether `identity` holds every permission in `required`
pub fn check_permissions<S: AsRef<str>>(
    identity: Option<&Identity>,
    required: &[S],
) -> Result<(), AuthError> {
    let identity = identity.ok_or(AuthError::Unauthenticated)?;

    // Role short-circuits permission enumeration, even for an empty set
    if identity.is_admin() {
        return Ok(());
    }

    let granted = required.iter().all(|p| {
        Permission::parse(p.as_ref())
            .map(|p| identity.permissions.grants(&p))
            .unwrap_or(false)
    });

    if granted {
        return Ok(());
    }

    let required: Vec<String> = required.iter().map(|p| p.as_ref().to_string()).collect();
    let current = identity.permissions.to_strings();
    tracing::warn!(
        user_id = %identity.id,
        username = %identity.username,
        ?required,
        ?current,
        "permission denied"
    );

    Err(AuthError::InsufficientPermissions { required, current })
}

/// Decide whether `identity`'s role is one of `required`
pub fn check_roles<S: AsRef<str>>(
    identity: Option<&Identity>,
    required: &[S],
) -> Result<(), AuthError> {
    let identity = identity.ok_or(AuthError::Unauthenticated)?;

    if required.iter().any(|r| identity.role == *r.as_ref()) {
        return Ok(());
    }

    let required: Vec<String> = required.iter().map(|r| r.as_ref().to_string()).collect();
    tracing::warn!(
        user_id = %identity.id,
        username = %identity.username,
        ?required,
        current = %identity.role,
        "role denied"
    );

    Err(AuthError::InsufficientRole {
        required,
        current: identity.role.to_string(),
    })
}

/// Middleware factory for permission-based access control
///
/// # Example
///
/// ```ignore
/// use axum::{Router, routing::delete, middleware};
/// use erp_api::auth::{authenticate, require_permissions};
///
/// let app = Router::new()
///     .route(
///         "/roles/:id",
///         delete(delete_role).route_layer(middleware::from_fn(require_permissions(&["roles:delete"]))),
///     )
///     .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));
/// ```
pub fn require_permissions(
    required: &[&str],
) -> impl Fn(Request, Next) -> GateFuture + Clone + Send + Sync + 'static {
    let required: Arc<[String]> = required.iter().map(|p| p.to_string()).collect();

    move |request: Request, next: Next| {
        let required = Arc::clone(&required);
        Box::pin(async move {
            check_permissions(request.extensions().get::<Identity>(), &required[..])?;
            Ok(next.run(request).await)
        })
    }
}

/// Middleware factory for role-based access control
///
/// Unlike [`require_permissions`] there is no admin bypass: `admin` passes
/// only when it is listed.
pub fn require_roles(
    required: &[&str],
) -> impl Fn(Request, Next) -> GateFuture + Clone + Send + Sync + 'static {
    let required: Arc<[String]> = required.iter().map(|r| r.to_string()).collect();

    move |request: Request, next: Next| {
        let required = Arc::clone(&required);
        Box::pin(async move {
            check_roles(request.extensions().get::<Identity>(), &required[..])?;
            Ok(next.run(request).await)
        })
    }
}
