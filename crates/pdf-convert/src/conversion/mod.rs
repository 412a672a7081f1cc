//! PDF conversion to documents, CSV and workbooks

pub mod document;
mod dispatcher;
pub mod tabular;

pub use dispatcher::{ConversionDispatcher, ConvertedArtifact};
pub use document::LayoutBlock;
