//! Routes a job to the document or tabular pipeline and enforces its time budget

use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;

use super::{document, tabular};
use crate::config::ConverterConfig;
use crate::error::{Error, Result};
use crate::extraction::{CancelFlag, ExtractionError, ExtractionSource, FallbackChain, PdfSource};
use crate::storage::ArtifactStore;
use crate::types::{ConversionJob, OutputFormat};

/// Encoded output and, for tabular formats, the step that produced its content
#[derive(Debug, Clone)]
pub struct ConvertedArtifact {
    pub bytes: Vec<u8>,
    pub source: Option<ExtractionSource>,
}

/// Format dispatcher shared by request handlers
#[derive(Clone)]
pub struct ConversionDispatcher {
    chain: Arc<FallbackChain>,
    timeout: Duration,
}

impl ConversionDispatcher {
    pub fn new(config: &ConverterConfig) -> Self {
        Self::with_chain(
            FallbackChain::from_config(&config.extraction),
            config.conversion.timeout(),
        )
    }

    pub fn with_chain(chain: FallbackChain, timeout: Duration) -> Self {
        Self {
            chain: Arc::new(chain),
            timeout,
        }
    }

    /// Convert PDF bytes synchronously
    pub fn convert_bytes(&self, data: &[u8], format: OutputFormat) -> Result<ConvertedArtifact> {
        self.convert_with_cancel(data, format, CancelFlag::default())
    }

    /// Convert PDF bytes synchronously, giving up with `Timeout` once `cancel` is set
    pub fn convert_with_cancel(
        &self,
        data: &[u8],
        format: OutputFormat,
        cancel: CancelFlag,
    ) -> Result<ConvertedArtifact> {
        match format {
            OutputFormat::Document => {
                let source = PdfSource::load_with_cancel(data, cancel).map_err(|e| match e {
                    ExtractionError::Cancelled => self.timeout_error(),
                    e => Error::conversion(format!("Failed to read PDF: {}", e)),
                })?;
                let blocks = document::reconstruct(&source).map_err(|_| self.timeout_error())?;
                Ok(ConvertedArtifact {
                    bytes: document::write_docx(&blocks)?,
                    source: None,
                })
            }
            OutputFormat::Csv | OutputFormat::Spreadsheet => {
                let extraction = self
                    .chain
                    .extract_with_cancel(data, cancel)
                    .map_err(|e| match e {
                        ExtractionError::Cancelled => self.timeout_error(),
                        e => {
                            tracing::error!("Table extraction failed: {}", e);
                            Error::TableNotFound(e.category())
                        }
                    })?;

                let bytes = if format == OutputFormat::Csv {
                    tabular::to_csv(&extraction.result)?
                } else {
                    tabular::to_xlsx(&extraction.result)?
                };
                Ok(ConvertedArtifact {
                    bytes,
                    source: Some(extraction.source),
                })
            }
        }
    }

    /// Store the upload, convert it off the async runtime within the time budget, and
    /// store the artifact. A conversion that finishes after the deadline is discarded.
    pub async fn run(
        &self,
        store: &ArtifactStore,
        job: &ConversionJob,
        data: Bytes,
    ) -> Result<ConvertedArtifact> {
        store.save_upload(job, &data).await?;

        let dispatcher = self.clone();
        let format = job.format;
        let cancel = CancelFlag::new();
        let worker_cancel = cancel.clone();
        let task = tokio::task::spawn_blocking(move || {
            dispatcher.convert_with_cancel(&data, format, worker_cancel)
        });

        let artifact = match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) if join_error.is_panic() => {
                return Err(Error::conversion("Conversion failed unexpectedly"));
            }
            Ok(Err(join_error)) => {
                return Err(Error::internal(format!("Conversion task failed: {}", join_error)));
            }
            Err(_) => {
                // The worker stops at its next checkpoint; whatever it returns is dropped
                cancel.cancel();
                tracing::error!(
                    "Job {} exceeded {}s; cancelling it and discarding its result",
                    job.token,
                    self.timeout.as_secs()
                );
                return Err(self.timeout_error());
            }
        };

        store.write_output(job, &artifact.bytes).await?;
        tracing::info!(
            "Job {} produced {} ({:?})",
            job.token,
            job.artifact_name(),
            artifact.source
        );
        Ok(artifact)
    }

    fn timeout_error(&self) -> Error {
        Error::Timeout {
            seconds: self.timeout.as_secs(),
        }
    }
}
