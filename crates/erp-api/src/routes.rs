//! API route definitions
//!
//! Every route except login and logout passes through the authentication
//! gate, then its own authorization gate, then the handler. Login and the
//! protected routes are rate limited per client IP.
//!
//! Author: hephaex@gmail.com

use crate::auth::{authenticate, require_permissions};
use crate::handlers::{auth, roles, users};
use crate::middleware::rate_limit::{limit_api, limit_login};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{delete, get, post, put, MethodRouter},
    Router,
};
use std::sync::Arc;

/// Require every listed permission before `route` runs
fn gated(route: MethodRouter<Arc<AppState>>, permissions: &[&str]) -> MethodRouter<Arc<AppState>> {
    route.route_layer(middleware::from_fn(require_permissions(permissions)))
}

/// Create `/api` routes
pub fn api_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let limits = &state.config.rate_limit;

    // Public routes (no authentication required)
    let public_routes = Router::new()
        .route("/auth/login", limit_login(post(auth::login_handler), limits))
        .route("/auth/logout", post(auth::logout_handler));

    // Protected routes (authentication required)
    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me_handler))
        // Users
        .route("/users", gated(get(users::list_users), &["users:read"]))
        .route("/users", gated(post(users::create_user), &["users:create"]))
        .route("/users/:id", gated(get(users::get_user), &["users:read"]))
        .route("/users/:id", gated(put(users::update_user), &["users:update"]))
        .route("/users/:id", gated(delete(users::delete_user), &["users:delete"]))
        // Roles
        .route("/roles", gated(get(roles::list_roles), &["roles:read"]))
        .route("/roles", gated(post(roles::create_role), &["roles:create"]))
        .route("/roles/permissions", get(roles::list_permissions))
        .route("/roles/:id", gated(get(roles::get_role), &["roles:read"]))
        .route("/roles/:id", gated(put(roles::update_role), &["roles:update"]))
        .route("/roles/:id", gated(delete(roles::delete_role), &["roles:delete"]))
        .route_layer(middleware::from_fn_with_state(state.clone(), authenticate));

    // Limit before authenticating so floods of bad tokens are throttled too
    let protected_routes = limit_api(protected_routes, limits);

    Router::new().merge(public_routes).merge(protected_routes)
}
