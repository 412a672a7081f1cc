//! PDF upload and conversion endpoint

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::{header, HeaderMap, StatusCode},
    Json,
};
use bytes::Bytes;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{ConvertResponse, OutputFormat};

/// An uploaded file field
struct Upload {
    filename: String,
    data: Bytes,
}

/// POST /convert - Convert an uploaded PDF into the requested format
pub async fn convert_file(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<ConvertResponse>> {
    let start = Instant::now();
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Rejected non-multipart request: {}", e);
        Error::invalid_input("No file uploaded")
    })?;

    let mut upload = None;
    let mut format = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await.map_err(multipart_error)?;
                upload = Some(Upload { filename, data });
            }
            "format" => {
                format = Some(field.text().await.map_err(multipart_error)?);
            }
            _ => {
                tracing::debug!("Ignoring form field '{}'", name);
            }
        }
    }

    let upload = upload.ok_or_else(|| Error::invalid_input("No file uploaded"))?;
    if !is_pdf_name(&upload.filename) {
        return Err(Error::invalid_input("Invalid or missing file"));
    }
    let format: OutputFormat = format.as_deref().unwrap_or("").parse()?;

    let job = state.store().new_job(&upload.filename, format);
    tracing::info!(
        "Job {}: converting {} ({} bytes) to {}",
        job.token,
        job.original_filename,
        upload.data.len(),
        format
    );

    state
        .dispatcher()
        .run(state.store(), &job, upload.data)
        .await
        .inspect_err(|e| tracing::warn!("Job {} failed: {}", job.token, e))?;

    tracing::info!(
        "Job {} finished in {:.1}s",
        job.token,
        start.elapsed().as_secs_f64()
    );

    let base_url = base_url(&state, &headers);
    Ok(Json(ConvertResponse::for_job(&job, &base_url)))
}

fn multipart_error(e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(e.body_text())
    } else {
        Error::invalid_input(format!("Failed to read upload: {}", e.body_text()))
    }
}

/// Any name ending in `.pdf` is accepted, including a bare `.pdf`; sanitizing names
/// the stored file afterwards
fn is_pdf_name(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .is_some_and(|(_, ext)| ext.eq_ignore_ascii_case("pdf"))
}

/// Base for response links: the configured public URL, else the request's Host header
fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    let server = &state.config().server;
    if let Some(url) = server.public_url.as_deref().filter(|u| !u.is_empty()) {
        return url.trim_end_matches('/').to_string();
    }

    match headers.get(header::HOST).and_then(|h| h.to_str().ok()) {
        Some(host) if !host.is_empty() => format!("http://{}", host),
        _ => format!("http://{}:{}", server.host, server.port),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pdf_names() {
        assert!(is_pdf_name("report.pdf"));
        assert!(is_pdf_name("REPORT.PDF"));
        assert!(is_pdf_name("a.b.pdf"));
        assert!(is_pdf_name(".pdf"));
        assert!(!is_pdf_name(""));
        assert!(!is_pdf_name("pdf"));
        assert!(!is_pdf_name("report.docx"));
        assert!(!is_pdf_name("report"));
    }
}
