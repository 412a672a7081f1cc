//! Read-only HTML previews of stored artifacts

mod docx;
pub mod html;
mod tables;

pub use docx::read_document;
pub use tables::{read_csv, read_xlsx};

use crate::error::{Error, Result};
use crate::storage::ArtifactStore;
use crate::types::OutputFormat;

/// Outcome of a preview request for an existing artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    Html(String),
    /// The artifact's extension has no renderer
    Unavailable,
}

/// Renders stored artifacts without modifying them
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    store: ArtifactStore,
}

impl PreviewRenderer {
    pub fn new(store: ArtifactStore) -> Self {
        Self { store }
    }

    /// Render a converted artifact by its stored name
    pub async fn render(&self, name: &str) -> Result<Preview> {
        let path = self.store.resolve_output(name).await?;
        let Some(format) = OutputFormat::from_filename(name) else {
            return Ok(Preview::Unavailable);
        };

        let data = tokio::fs::read(&path).await?;
        tokio::task::spawn_blocking(move || render_bytes(format, &data))
            .await
            .map_err(|e| Error::internal(format!("Preview task failed: {}", e)))?
    }
}

/// Render artifact bytes of a known format
pub fn render_bytes(format: OutputFormat, data: &[u8]) -> Result<Preview> {
    let html = match format {
        OutputFormat::Document => html::render_document(&read_document(data).map_err(Error::Preview)?),
        OutputFormat::Csv => html::render_table(&read_csv(data).map_err(Error::Preview)?),
        OutputFormat::Spreadsheet => html::render_table(&read_xlsx(data).map_err(Error::Preview)?),
    };
    Ok(Preview::Html(html))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;

    #[tokio::test]
    async fn test_render_stored_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::open(&StorageConfig {
            uploads_dir: dir.path().join("uploads"),
            converted_dir: dir.path().join("converted"),
        })
        .unwrap();
        std::fs::write(store.converted_dir().join("t_data.csv"), "a,b\n1,2\n").unwrap();
        std::fs::write(store.converted_dir().join("t_notes.txt"), "hello").unwrap();
        std::fs::write(store.converted_dir().join("t_broken.docx"), "not a zip").unwrap();
        let renderer = PreviewRenderer::new(store);

        let Preview::Html(html) = renderer.render("t_data.csv").await.unwrap() else {
            panic!("expected html");
        };
        assert!(html.contains("<th>a</th><th>b</th>"));
        assert!(html.contains("<td>1</td><td>2</td>"));

        assert_eq!(renderer.render("t_notes.txt").await.unwrap(), Preview::Unavailable);
        assert!(matches!(
            renderer.render("missing.csv").await,
            Err(Error::ArtifactNotFound(_))
        ));
        assert!(matches!(
            renderer.render("t_broken.docx").await,
            Err(Error::Preview(_))
        ));
    }
}
