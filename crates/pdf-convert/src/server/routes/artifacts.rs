//! Download and preview of converted artifacts

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
};

use crate::error::{Error, Result};
use crate::preview::Preview;
use crate::server::state::AppState;

/// GET /download/:name - Serve a converted file as an attachment
pub async fn download(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response> {
    let data = state.store().read_output(&name).await?;
    let mime = mime_guess::from_path(&name).first_or_octet_stream();
    tracing::debug!("Serving {} ({} bytes, {})", name, data.len(), mime);

    Ok((
        [
            (header::CONTENT_TYPE, mime.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", name),
            ),
        ],
        data,
    )
        .into_response())
}

/// GET /preview_output/:name - HTML preview of a converted file
///
/// Failures are plain text, not JSON, since the body is shown in place of the preview.
pub async fn preview(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    match state.previews().render(&name).await {
        Ok(Preview::Html(html)) => Html(html).into_response(),
        Ok(Preview::Unavailable) => (
            StatusCode::BAD_REQUEST,
            "Preview not available for this file type",
        )
            .into_response(),
        Err(Error::ArtifactNotFound(_)) => {
            (StatusCode::NOT_FOUND, "File not found").into_response()
        }
        Err(e) => {
            tracing::error!("Preview of {} failed: {}", name, e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error generating preview: {}", e),
            )
                .into_response()
        }
    }
}
