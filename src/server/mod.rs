//! Local service
//!
//! Hosts the prediction options resource (JSON file) and the price proxy
//! that the client's first price tier talks to. Only compiled when the
//! `server` feature is enabled.

mod options;
mod prices;

use anyhow::{Context, Result};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::config::AppConfig;
use crate::oracle::sources::CoinMarketCapClient;
use crate::persistence::PredictionOptionFile;

/// Shared handler state
pub struct ServerState {
    pub options_file: PredictionOptionFile,
    /// Serializes read-modify-write cycles on the options file
    pub write_lock: Mutex<()>,
    pub coinmarketcap: CoinMarketCapClient,
}

impl ServerState {
    pub fn new(options_file: PredictionOptionFile, coinmarketcap: CoinMarketCapClient) -> Self {
        Self {
            options_file,
            write_lock: Mutex::new(()),
            coinmarketcap,
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(
            PredictionOptionFile::new(&config.server.options_file),
            CoinMarketCapClient::new(&config.prices.coinmarketcap_url, config.request_timeout())?,
        ))
    }
}

/// Handler error rendered as `{"error": "..."}`
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

/// Create the router with all endpoints
pub fn create_router(state: Arc<ServerState>) -> Router {
    Router::new()
        .route(
            "/api/prediction-options",
            get(options::list_options).post(options::create_option),
        )
        .route(
            "/api/prediction-options/:id",
            get(options::get_option)
                .put(options::update_option)
                .patch(options::update_option)
                .delete(options::delete_option),
        )
        .route("/api/prices", get(prices::get_price))
        .route("/api/health", get(get_health))
        .with_state(state)
        // CORS for browser clients
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// GET /api/health
async fn get_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now().timestamp_millis(),
    }))
}

/// Bind and serve until the process exits
pub async fn serve(config: &AppConfig) -> Result<()> {
    let state = Arc::new(ServerState::from_config(config)?);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind))?;
    info!(
        bind = %config.server.bind,
        options_file = %config.server.options_file,
        "🌐 Local service listening"
    );

    axum::serve(listener, router)
        .await
        .context("Local service stopped")?;
    Ok(())
}
