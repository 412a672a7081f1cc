//! Filesystem artifact store keyed by `{token}_{filename}`

use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::types::{ConversionJob, OutputFormat};

/// Two flat directories: uploaded originals and converted outputs
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    uploads_dir: PathBuf,
    converted_dir: PathBuf,
}

impl ArtifactStore {
    /// Open the store, creating both directories if needed
    pub fn open(config: &StorageConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.uploads_dir)?;
        std::fs::create_dir_all(&config.converted_dir)?;
        tracing::info!(
            "Artifact store ready (uploads: {}, converted: {})",
            config.uploads_dir.display(),
            config.converted_dir.display()
        );

        Ok(Self {
            uploads_dir: config.uploads_dir.clone(),
            converted_dir: config.converted_dir.clone(),
        })
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn converted_dir(&self) -> &Path {
        &self.converted_dir
    }

    /// Create a job whose paths live in this store
    pub fn new_job(&self, filename: &str, format: OutputFormat) -> ConversionJob {
        ConversionJob::new(filename, format, &self.uploads_dir, &self.converted_dir)
    }

    /// Persist the uploaded original
    pub async fn save_upload(&self, job: &ConversionJob, data: &[u8]) -> Result<()> {
        tokio::fs::write(&job.upload_path, data).await?;
        tracing::debug!(
            "Stored upload {} ({} bytes)",
            job.upload_path.display(),
            data.len()
        );
        Ok(())
    }

    /// Write the converted artifact. The bytes land in a hidden partial file first, so a
    /// failed write never leaves a file under the artifact name.
    pub async fn write_output(&self, job: &ConversionJob, data: &[u8]) -> Result<()> {
        let partial = self
            .converted_dir
            .join(format!(".{}.{}.partial", job.token, Uuid::new_v4().simple()));

        if let Err(e) = tokio::fs::write(&partial, data).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&partial, &job.output_path).await {
            let _ = tokio::fs::remove_file(&partial).await;
            return Err(e.into());
        }

        tracing::info!(
            "Stored artifact {} ({} bytes)",
            job.output_path.display(),
            data.len()
        );
        Ok(())
    }

    /// Resolve a converted artifact by its stored name
    pub async fn resolve_output(&self, name: &str) -> Result<PathBuf> {
        if !is_flat_name(name) {
            return Err(Error::ArtifactNotFound(name.to_string()));
        }

        let path = self.converted_dir.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(Error::ArtifactNotFound(name.to_string())),
        }
    }

    /// Read a converted artifact by its stored name
    pub async fn read_output(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.resolve_output(name).await?;
        Ok(tokio::fs::read(path).await?)
    }
}

/// Stored names are flat: no separators, no parent references, no hidden files
fn is_flat_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0'])
}
