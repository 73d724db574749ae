//! Rate limiting middleware for API endpoints
//!
//! Two per-IP token buckets:
//! - Login: small burst with slow refill, against password guessing
//! - API: large burst for normal administration traffic
//!
//! Clients are keyed by `X-Forwarded-For`, `X-Real-Ip` or `Forwarded`, falling
//! back to the peer address, so the server must be started with connect info.
//!
//! Author: hephaex@gmail.com

use axum::{routing::MethodRouter, Router};
use erp_core::RateLimitConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};

/// Apply the login limiter to a single route
pub fn limit_login<S>(route: MethodRouter<S>, config: &RateLimitConfig) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !config.enabled {
        return route;
    }

    let Some(governor) = GovernorConfigBuilder::default()
        .period(Duration::from_millis(config.login_replenish_ms))
        .burst_size(config.login_burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
    else {
        tracing::error!(?config, "invalid login rate limit; limiter disabled");
        return route;
    };

    route.layer(GovernorLayer {
        config: Arc::new(governor),
    })
}

/// Apply the API limiter to every route of `router`
pub fn limit_api<S>(router: Router<S>, config: &RateLimitConfig) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    if !config.enabled {
        return router;
    }

    let Some(governor) = GovernorConfigBuilder::default()
        .period(Duration::from_millis(config.api_replenish_ms))
        .burst_size(config.api_burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
    else {
        tracing::error!(?config, "invalid API rate limit; limiter disabled");
        return router;
    };

    router.route_layer(GovernorLayer {
        config: Arc::new(governor),
    })
}
