//! Portfolio CMS - library for app logic and testing

pub mod auth;
pub mod config;
pub mod cookies;
pub mod db;
pub mod errors;
pub mod forms;
pub mod logging;
pub mod routes;
pub mod services;
pub mod uploads;
pub mod views;

#[cfg(test)]
pub(crate) mod test_utils;

use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer, limit::RequestBodyLimitLayer, services::ServeDir,
    trace::TraceLayer,
};

use crate::config::Config;
use crate::db::Store;
use crate::uploads::UploadStore;
use crate::views::Views;

/// Request bodies above this size are rejected before reaching a handler. Leaves room for
/// a 10MB CV and a 5MB image in one settings form.
const MAX_BODY_SIZE: usize = 16 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn Store>,
    pub views: Arc<Views>,
    pub uploads: UploadStore,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
    ) -> Result<Self, minijinja::Error> {
        let uploads = UploadStore::new(config.upload_dir.clone());
        Ok(Self {
            config: Arc::new(config),
            store,
            views: Arc::new(Views::new()?),
            uploads,
        })
    }
}

/// Create and configure the application router.
pub fn create_app(state: AppState) -> Router {
    let uploads = ServeDir::new(state.uploads.root().to_path_buf());

    routes::router()
        .nest_service("/uploads", uploads)
        .fallback(routes::not_found)
        .with_state(state)
        .layer(logging::middleware::propagate_request_id_layer())
        .layer(middleware::from_fn(logging::middleware::log_request))
        .layer(logging::middleware::request_id_layer())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
}

/// Errors that stop the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error("failed to open the database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("failed to load templates: {0}")]
    Templates(#[from] minijinja::Error),

    #[error("{context}: {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

/// Run the server (used by main).
pub async fn run() -> Result<(), StartupError> {
    dotenvy::dotenv().ok();

    // Guards must outlive the server or buffered log lines are lost.
    let _log_guards = logging::init();

    routes::health::init_start_time();

    let config = Config::from_env().inspect_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
    })?;
    let store = db::connect(&config.db).await.inspect_err(|e| {
        tracing::error!("Failed to open database: {}", e);
    })?;

    let state = AppState::new(config, store)?;
    auth::password::warm_up().await;
    state
        .uploads
        .ensure_dirs()
        .await
        .map_err(|source| StartupError::Io {
            context: format!(
                "failed to create upload directory {}",
                state.uploads.root().display()
            ),
            source,
        })?;

    let addr_str = format!("{}:{}", state.config.host, state.config.port);
    let addr: SocketAddr = addr_str.parse().map_err(|e| StartupError::Io {
        context: format!("invalid HOST/PORT {addr_str}"),
        source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })?;
    tracing::info!("Starting server on {}", addr);

    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Io {
            context: format!("failed to bind to {addr}"),
            source,
        })?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .map_err(|source| StartupError::Io {
        context: "server error".to_string(),
        source,
    })
}
