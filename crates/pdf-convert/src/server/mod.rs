//! HTTP server for the conversion service

pub mod routes;
pub mod state;

use axum::{routing::get, Json, Router};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::ConverterConfig;
use crate::error::Result;
use state::AppState;

/// Conversion HTTP server
pub struct ConverterServer {
    config: ConverterConfig,
    state: AppState,
}

impl ConverterServer {
    /// Create a new server, opening the artifact store
    pub fn new(config: ConverterConfig) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .address()
            .parse()
            .map_err(|e| crate::error::Error::Config(format!("Invalid address: {}", e)))?;

        let router = build_router(self.state);

        tracing::info!("Starting conversion server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| crate::error::Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Build the router with all routes
pub fn build_router(state: AppState) -> Router {
    let enable_cors = state.config().server.enable_cors;
    let max_upload_size = state.config().server.max_upload_size;

    let router = Router::new()
        .route("/", get(info))
        .route("/health", get(health_check))
        .merge(routes::conversion_routes(max_upload_size))
        .with_state(state)
        // Middleware layers (order matters - applied bottom to top)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new());

    if enable_cors {
        router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
    } else {
        router
    }
}

/// Health check endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

/// Service info endpoint
async fn info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "pdf-convert",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Convert PDF files to editable documents, CSV and spreadsheets",
        "endpoints": {
            "POST /convert": "Upload a PDF (multipart: file, format=docx|csv|xlsx)",
            "GET /download/:name": "Download a converted file",
            "GET /preview_output/:name": "HTML preview of a converted file",
            "GET /health": "Liveness probe"
        }
    }))
}
