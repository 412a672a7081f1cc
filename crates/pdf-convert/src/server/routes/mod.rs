//! Conversion, download and preview routes

pub mod artifacts;
pub mod convert;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use crate::server::state::AppState;

/// Build the conversion routes
pub fn conversion_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Uploads get the configured body limit
        .route(
            "/convert",
            post(convert::convert_file).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/download/:name", get(artifacts::download))
        .route("/preview_output/:name", get(artifacts::preview))
}
