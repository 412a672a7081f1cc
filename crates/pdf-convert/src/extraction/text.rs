//! Whole-page text extractors for the fallback path

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use super::{ExtractionError, PdfSource, TextExtractor};

/// How often a waiting extractor looks at the source's cancel flag
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// pdf-extract, run on its own thread. The library can hang or panic on malformed
/// fonts, so the call is bounded by a timeout and unwinds are caught. The library call
/// itself cannot be interrupted; on timeout or cancellation the caller stops waiting and
/// the detached thread's result is dropped when it finishes.
#[derive(Debug, Clone)]
pub struct PrimaryTextExtractor {
    timeout: Duration,
}

impl PrimaryTextExtractor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl TextExtractor for PrimaryTextExtractor {
    fn name(&self) -> &'static str {
        "pdf-extract"
    }

    fn extract_pages(&self, source: &PdfSource) -> Result<Vec<String>, ExtractionError> {
        let data = source.bytes().to_vec();
        let (tx, rx) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("pdf-text".to_string())
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    pdf_extract::extract_text_from_mem_by_pages(&data)
                }));
                let _ = tx.send(result);
            })
            .map_err(|e| ExtractionError::Failed(format!("failed to spawn text thread: {}", e)))?;

        let deadline = Instant::now() + self.timeout;
        let received = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining.min(CANCEL_POLL_INTERVAL)) {
                Err(mpsc::RecvTimeoutError::Timeout) if !remaining.is_zero() => {
                    if source.cancel_flag().is_cancelled() {
                        tracing::debug!("pdf-extract abandoned after cancellation");
                        return Err(ExtractionError::Cancelled);
                    }
                }
                other => break other,
            }
        };

        match received {
            Ok(Ok(Ok(pages))) => {
                let _ = handle.join();
                Ok(pages)
            }
            Ok(Ok(Err(e))) => {
                let _ = handle.join();
                Err(ExtractionError::Failed(format!("pdf-extract: {}", e)))
            }
            Ok(Err(payload)) => {
                let _ = handle.join();
                Err(ExtractionError::Panicked(panic_message(payload.as_ref())))
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // The thread is left to finish on its own; its result is dropped
                tracing::warn!("pdf-extract timed out after {:?}", self.timeout);
                Err(ExtractionError::TimedOut(self.timeout.as_secs()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(ExtractionError::Panicked(
                "text extraction thread exited without a result".to_string(),
            )),
        }
    }
}

/// lopdf's built-in text extraction, page by page
#[derive(Debug, Clone, Default)]
pub struct SecondaryTextExtractor;

impl TextExtractor for SecondaryTextExtractor {
    fn name(&self) -> &'static str {
        "lopdf"
    }

    fn extract_pages(&self, source: &PdfSource) -> Result<Vec<String>, ExtractionError> {
        let doc = source.document();
        let mut pages = Vec::new();
        let mut failures = 0usize;

        for number in doc.get_pages().keys() {
            source.checkpoint()?;
            match doc.extract_text(&[*number]) {
                Ok(text) => pages.push(text),
                Err(e) => {
                    tracing::debug!("lopdf could not extract page {}: {}", number, e);
                    failures += 1;
                    pages.push(String::new());
                }
            }
        }

        if !pages.is_empty() && failures == pages.len() {
            return Err(ExtractionError::Failed(
                "lopdf could not extract any page".to_string(),
            ));
        }
        Ok(pages)
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Normalize extracted text: expand ligatures, drop invisible characters, trim each
/// line and remove blank lines
pub fn clean_text(text: &str) -> String {
    let normalized = text
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace('\u{00A0}', " ")
        .replace(['\u{00AD}', '\u{200B}', '\u{FEFF}', '\0'], "");

    normalized
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
