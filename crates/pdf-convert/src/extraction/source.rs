//! Loaded PDF shared by every extraction step

use lopdf::Document;
use std::sync::OnceLock;

use super::layout::{self, PageLayout};
use super::{CancelFlag, ExtractionError};

/// Original bytes plus the parsed document. Page layouts are interpreted on first use
/// and shared by the strategies that need them. The cancel flag travels with the source
/// so every step working on it can stop early.
pub struct PdfSource {
    data: Vec<u8>,
    document: Document,
    layouts: OnceLock<Vec<PageLayout>>,
    cancel: CancelFlag,
}

impl PdfSource {
    /// Parse and classify a PDF. This is the only step whose failure is terminal.
    pub fn load(data: &[u8]) -> Result<Self, ExtractionError> {
        Self::load_with_cancel(data, CancelFlag::default())
    }

    /// Parse and classify a PDF whose processing can be cancelled through `cancel`
    pub fn load_with_cancel(data: &[u8], cancel: CancelFlag) -> Result<Self, ExtractionError> {
        cancel.check()?;
        if !has_pdf_header(data) {
            return Err(ExtractionError::Corrupted("missing %PDF header".to_string()));
        }

        let document = match Document::load_mem(data) {
            Ok(doc) => doc,
            Err(e) if contains(data, b"/Encrypt") => {
                tracing::debug!("Encrypted PDF failed to load: {}", e);
                return Err(ExtractionError::Encrypted);
            }
            Err(e) => return Err(ExtractionError::Corrupted(e.to_string())),
        };

        // Documents with an empty user password are decrypted on load
        if document.is_encrypted() {
            return Err(ExtractionError::Encrypted);
        }

        let page_count = document.get_pages().len();
        if page_count == 0 {
            return Err(ExtractionError::Unsupported("document has no pages".to_string()));
        }
        tracing::debug!("Loaded PDF with {} pages ({} bytes)", page_count, data.len());

        Ok(Self {
            data: data.to_vec(),
            document,
            layouts: OnceLock::new(),
            cancel,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }

    /// `Err(Cancelled)` once the job owning this source has given up on it
    pub fn checkpoint(&self) -> Result<(), ExtractionError> {
        self.cancel.check()
    }

    /// Interpreted layouts in page order; pages whose content cannot be decoded are skipped.
    /// Interpretation stops at the first page boundary after cancellation, so callers
    /// should [`checkpoint`](Self::checkpoint) before trusting the result.
    pub fn layouts(&self) -> &[PageLayout] {
        self.layouts.get_or_init(|| {
            let mut layouts = Vec::new();
            for (number, page_id) in self.document.get_pages() {
                if self.cancel.is_cancelled() {
                    tracing::debug!("Layout interpretation cancelled at page {}", number);
                    break;
                }
                match layout::interpret_page(&self.document, number, page_id) {
                    Ok(layout) => layouts.push(layout),
                    Err(e) => tracing::warn!("Skipping page {}: {}", number, e),
                }
            }
            layouts
        })
    }
}

fn has_pdf_header(data: &[u8]) -> bool {
    contains(&data[..data.len().min(1024)], b"%PDF-")
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
