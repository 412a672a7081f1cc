//! Error types for the conversion service

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::extraction::FailureCategory;

/// Result type alias for conversion operations
pub type Result<T> = std::result::Result<T, Error>;

/// Conversion service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing file, wrong extension or unknown output format
    #[error("{0}")]
    InvalidInput(String),

    /// Every extraction step failed before producing a result
    #[error("{}", .0.user_message())]
    TableNotFound(FailureCategory),

    /// The document conversion strategy raised
    #[error("{0}")]
    ConversionFailed(String),

    /// The job exceeded its wall-clock budget
    #[error("Conversion timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Request body over the configured upload limit
    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    /// Stored artifact does not exist
    #[error("File not found: {0}")]
    ArtifactNotFound(String),

    /// A stored artifact could not be rendered
    #[error("{0}")]
    Preview(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Create a conversion failure
    pub fn conversion(message: impl Into<String>) -> Self {
        Self::ConversionFailed(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::InvalidInput(_) => (StatusCode::BAD_REQUEST, "invalid_input"),
            Error::TableNotFound(_) => (StatusCode::INTERNAL_SERVER_ERROR, "table_not_found"),
            Error::ConversionFailed(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "conversion_failed")
            }
            Error::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            Error::PayloadTooLarge(_) => (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large"),
            Error::ArtifactNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::Preview(_) => (StatusCode::INTERNAL_SERVER_ERROR, "preview_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = self.status_and_kind();

        let body = Json(json!({
            "error": self.to_string(),
            "type": error_type,
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::invalid_input("No file uploaded").status_and_kind().0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::TableNotFound(FailureCategory::Encrypted).status_and_kind().0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            Error::ArtifactNotFound("x.csv".into()).status_and_kind().0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Timeout { seconds: 5 }.status_and_kind().0,
            StatusCode::GATEWAY_TIMEOUT
        );
    }

    #[test]
    fn test_table_not_found_uses_category_message() {
        let err = Error::TableNotFound(FailureCategory::Corrupted);
        assert_eq!(err.to_string(), FailureCategory::Corrupted.user_message());
    }

    #[test]
    fn test_conversion_failed_keeps_raw_message() {
        let err = Error::conversion("Failed to load PDF: invalid xref");
        assert_eq!(err.to_string(), "Failed to load PDF: invalid xref");
    }
}
