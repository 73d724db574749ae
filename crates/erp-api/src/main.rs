//! ERP API Server
//!
//! REST API server for RBAC user and role administration.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use erp_api::{create_router, seed::seed_defaults, state::AppState};
use erp_core::config::{AppConfig, LoggingConfig};
use erp_core::{MemoryStore, PgStore, RoleStore, UserStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn load_config() -> anyhow::Result<AppConfig> {
    let config = match std::env::var("ERP_CONFIG") {
        Ok(path) => AppConfig::from_file(&path)
            .with_context(|| format!("loading config file {path}"))?
            .with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "erp_api={level},erp_core={level},tower_http=info",
            level = logging.level
        ))
    });

    if logging.json_format {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_stores(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn UserStore>, Arc<dyn RoleStore>)> {
    if config.mode.uses_database() {
        let store = PgStore::new(&config.database.url, config.database.pool_size)
            .await
            .context("connecting to PostgreSQL")?;
        store
            .ensure_schema()
            .await
            .context("creating database schema")?;
        tracing::info!("using PostgreSQL store");
        let store = Arc::new(store);
        let users: Arc<dyn UserStore> = store.clone();
        let roles: Arc<dyn RoleStore> = store;
        Ok((users, roles))
    } else {
        tracing::info!(mode = %config.mode, "using in-memory store");
        let store = Arc::new(MemoryStore::new());
        let users: Arc<dyn UserStore> = store.clone();
        let roles: Arc<dyn RoleStore> = store;
        Ok((users, roles))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;
    init_tracing(&config.logging);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let (users, roles) = open_stores(&config).await?;

    // Create application state
    let state = Arc::new(AppState::new(config, users, roles));

    let report = seed_defaults(
        state.users.as_ref(),
        state.roles.as_ref(),
        &state.config.auth,
        &state.password,
    )
    .await?;
    tracing::info!(
        created_roles = ?report.created_roles,
        created_admin = report.created_admin,
        "default data ensured"
    );

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!("ERP API Server starting on http://{}", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    // Peer addresses key the rate limiter when no proxy header is present
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
