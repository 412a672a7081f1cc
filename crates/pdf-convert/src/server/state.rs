//! Application state for the conversion server

use std::sync::Arc;

use crate::config::ConverterConfig;
use crate::conversion::ConversionDispatcher;
use crate::error::Result;
use crate::preview::PreviewRenderer;
use crate::storage::ArtifactStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: ConverterConfig,
    /// Uploads and converted artifacts
    store: ArtifactStore,
    /// Conversion entry point, owns the extraction chain
    dispatcher: ConversionDispatcher,
    /// HTML previews of stored artifacts
    previews: PreviewRenderer,
}

impl AppState {
    /// Create new application state
    pub fn new(config: ConverterConfig) -> Result<Self> {
        tracing::info!("Initializing conversion service state...");

        let store = ArtifactStore::open(&config.storage)?;
        let dispatcher = ConversionDispatcher::new(&config);
        Ok(Self::with_parts(config, store, dispatcher))
    }

    /// Assemble state from already-built components
    pub fn with_parts(
        config: ConverterConfig,
        store: ArtifactStore,
        dispatcher: ConversionDispatcher,
    ) -> Self {
        let previews = PreviewRenderer::new(store.clone());
        Self {
            inner: Arc::new(AppStateInner {
                config,
                store,
                dispatcher,
                previews,
            }),
        }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.inner.store
    }

    pub fn dispatcher(&self) -> &ConversionDispatcher {
        &self.inner.dispatcher
    }

    pub fn previews(&self) -> &PreviewRenderer {
        &self.inner.previews
    }
}
