pub mod core;
pub mod models;
pub mod platform;

use axum::{
    http::{header::CONTENT_TYPE, Method},
    routing::{get, post},
    Router,
};
use crate::core::civic_api;
use crate::core::civic_store::CivicStore;
use crate::core::config::Config;
use crate::core::database::Database;
use crate::core::validation_socket::{frames_handler, ws_handler};
use crate::platform::pose::{BridgeFactory, DefaultMediaPipe, OracleFactory};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

// Application state
pub struct AppState {
    pub config: Arc<Config>,
    pub store: CivicStore,
    pub oracles: Arc<dyn OracleFactory>,
}

impl AppState {
    pub async fn new(config: Config) -> Result<Arc<Self>, Box<dyn std::error::Error>> {
        let database = Database::init(&config.database_url).await?;
        let oracles: Arc<dyn OracleFactory> =
            Arc::new(BridgeFactory::<DefaultMediaPipe>::new(config.oracle_config()));

        Ok(Arc::new(Self {
            config: Arc::new(config),
            store: CivicStore::new(database),
            oracles,
        }))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    let api = Router::new()
        .route(
            "/candidate/",
            get(civic_api::list_candidates).post(civic_api::create_candidate),
        )
        .route(
            "/candidate/:id/",
            get(civic_api::get_candidate).delete(civic_api::delete_candidate),
        )
        .route("/ward/:id/candidates/", get(civic_api::ward_candidates))
        .route("/provinces/", get(civic_api::list_provinces))
        .route("/provinces/:id/districts/", get(civic_api::list_districts))
        .route("/districts/:id/municipalities/", get(civic_api::list_municipalities))
        .route("/municipalities/:id/wards/", get(civic_api::list_wards))
        .route("/validation/frames", post(frames_handler));

    Router::new()
        .route("/ws/video", get(ws_handler))
        .route("/ws/video/", get(ws_handler))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    info!("Loading configuration...");
    let config = Config::load()?;

    info!("Initializing state...");
    let state = AppState::new(config).await?;

    let address = format!("0.0.0.0:{}", state.config.port);
    info!("Binding to {address}");

    let listener = TcpListener::bind(&address).await?;
    let app = build_router(state);
    info!("Server running on {address}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
