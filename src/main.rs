//! DOTTECH Invitation Service
//!
//! Serves department-personalized event invitations. Department records live
//! in a remote document store, mirrored into a SQLite local cache, and fall
//! back to built-in defaults when neither is available.

mod admin;
mod api;
mod auth;
mod config;
mod db;
mod errors;
mod models;
mod qr;
mod resolver;
mod state;
mod store;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use admin::AdminService;
use auth::AdminGate;
use config::Config;
use db::LocalCache;
use state::DepartmentState;
use store::{MemoryRecordStore, RecordStore, RestRecordStore};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub departments: DepartmentState,
    pub admin: AdminService,
    pub gate: AdminGate,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wire state, store, and cache together. Does not resolve anything yet.
    pub fn new(config: Config, store: Arc<dyn RecordStore>, cache: LocalCache) -> Self {
        let departments = DepartmentState::new();
        let admin = AdminService::new(store, cache, departments.clone());
        let gate = AdminGate::new(&config.admin_password, &config.super_admin_password);

        Self {
            departments,
            admin,
            gate,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting DOTTECH Invitation Service");
    tracing::info!("Cache path: {:?}", config.cache_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    if config.uses_placeholder_secrets() {
        tracing::warn!(
            "Admin secrets are compiled-in placeholders (DOTTECH_ADMIN_PASSWORD, \
             DOTTECH_SUPER_ADMIN_PASSWORD). Do not expose the admin API!"
        );
    }

    let store: Arc<dyn RecordStore> = match &config.store_url {
        Some(url) => Arc::new(RestRecordStore::new(
            url,
            config.store_auth.clone(),
            config.store_timeout,
        )?),
        None => {
            tracing::warn!("No remote store configured (DOTTECH_STORE_URL). Using in-memory store!");
            Arc::new(MemoryRecordStore::new())
        }
    };
    tracing::info!("Record store: {}", store.describe());

    // Initialize local cache
    let pool = db::init_database(&config.cache_path).await?;
    let cache = LocalCache::new(pool);

    let state = AppState::new(config.clone(), store, cache);

    // Initial resolution pass
    let resolution = state.admin.reload().await;
    tracing::info!(
        "Resolved {} departments from {:?}",
        resolution.mapping.len(),
        resolution.source
    );

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let gate = state.gate.clone();

    // Admin routes. The gate layer covers every route added before it, so
    // the login check itself stays reachable.
    let admin_routes = Router::new()
        .route("/departments", put(api::upsert_department))
        .route("/departments/{code}", delete(api::delete_department))
        .route("/departments/{code}/qr", get(api::department_qr))
        .route("/flush", post(api::flush_departments))
        .route("/reload", post(api::reload_departments))
        .route("/test-connection", post(api::test_connection))
        .layer(middleware::from_fn(move |req, next| {
            auth::admin_auth_layer(gate.clone(), req, next)
        }))
        .route("/login", post(api::login));

    let api_routes = Router::new()
        .route("/invitation", get(api::get_invitation))
        .route("/departments", get(api::list_departments))
        .route("/departments/{code}", get(api::get_department))
        .nest("/admin", admin_routes);

    Router::new()
        .route("/", get(api::invitation_page))
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
