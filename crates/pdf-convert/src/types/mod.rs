//! Core types for the conversion service

pub mod document;
pub mod job;
pub mod response;
pub mod table;

pub use document::{Block, DocumentModel, Paragraph, ParagraphStyle, Run, TableBlock};
pub use job::{secure_filename, ConversionJob, OutputFormat};
pub use response::ConvertResponse;
pub use table::ExtractionResult;
