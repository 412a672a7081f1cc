//! Table extraction with an ordered fallback chain
//!
//! Strategies are tried in order (grid, heuristic, or the reverse); when none produces a
//! table the chain falls back to per-page text, then to a fixed placeholder row.

mod cancel;
mod chain;
pub mod grid;
pub mod heuristic;
pub mod layout;
mod source;
mod text;

use serde::Serialize;
use thiserror::Error;

pub use cancel::CancelFlag;
pub use chain::{Capabilities, Extraction, ExtractionSource, FallbackChain, PLACEHOLDER_MESSAGE};
pub use grid::{GridDetector, GridStrategy, GridTable};
pub use heuristic::HeuristicStrategy;
pub use layout::PageLayout;
pub use source::PdfSource;
pub use text::{clean_text, PrimaryTextExtractor, SecondaryTextExtractor};

/// Rows of string cells
pub type Table = Vec<Vec<String>>;

/// Table extraction strategy kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Cells bounded by ruling lines
    Grid,
    /// Cells inferred from text alignment
    Heuristic,
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Grid => f.write_str("grid"),
            Self::Heuristic => f.write_str("heuristic"),
        }
    }
}

/// A table extraction strategy
pub trait TableStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Extract every table in the document; an empty list means no tables were found
    fn extract_tables(&self, source: &PdfSource) -> Result<Vec<Table>, ExtractionError>;
}

/// A whole-document text extractor used when no table strategy succeeds
pub trait TextExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Text of each page, in page order
    fn extract_pages(&self, source: &PdfSource) -> Result<Vec<String>, ExtractionError>;
}

/// Typed failure of an extraction step
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("PDF is encrypted")]
    Encrypted,

    #[error("PDF is corrupted: {0}")]
    Corrupted(String),

    #[error("Unsupported PDF: {0}")]
    Unsupported(String),

    #[error("no tables found")]
    NoTables,

    #[error("no text found")]
    NoText,

    #[error("extractor panicked: {0}")]
    Panicked(String),

    #[error("extractor timed out after {0}s")]
    TimedOut(u64),

    #[error("extraction cancelled")]
    Cancelled,

    #[error("{0}")]
    Failed(String),
}

impl ExtractionError {
    /// User-facing category of a terminal failure
    pub fn category(&self) -> FailureCategory {
        match self {
            Self::Encrypted => FailureCategory::Encrypted,
            Self::Corrupted(_) => FailureCategory::Corrupted,
            _ => FailureCategory::Unsupported,
        }
    }
}

/// Closed set of user-facing failure categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureCategory {
    Encrypted,
    Corrupted,
    Unsupported,
}

impl FailureCategory {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Encrypted => {
                "The PDF is encrypted or password-protected. Please remove the protection and try again."
            }
            Self::Corrupted => "The PDF file appears to be corrupted or invalid.",
            Self::Unsupported => {
                "PDF table extraction failed. The PDF may not contain extractable tables or may be in an unsupported format."
            }
        }
    }
}
