//! pdf-convert: PDF conversion service with table extraction and HTML previews
//!
//! Uploaded PDFs are converted to editable documents (.docx), CSV or single-sheet
//! workbooks (.xlsx). Tabular output goes through an ordered extraction fallback chain
//! (ruled-grid detection, column-alignment heuristics, page text, placeholder), so a
//! loadable PDF always yields a result. Converted artifacts are stored on disk and can be
//! downloaded or previewed as HTML.

pub mod config;
pub mod conversion;
pub mod error;
pub mod extraction;
pub mod preview;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
mod test_fixtures;

pub use config::ConverterConfig;
pub use conversion::{ConversionDispatcher, ConvertedArtifact};
pub use error::{Error, Result};
pub use extraction::{Extraction, ExtractionSource, FallbackChain};
pub use preview::{Preview, PreviewRenderer};
pub use server::{build_router, state::AppState, ConverterServer};
pub use storage::ArtifactStore;
pub use types::{ConversionJob, ConvertResponse, ExtractionResult, OutputFormat};
