//! Async facade over the blocking engine operations.
//!
//! Parsing, rasterizing and serializing are CPU-bound, so every operation
//! here runs on tokio's blocking pool and the caller's task only awaits the
//! result.

use std::sync::{Arc, Mutex};

use tokio::task;
use tracing::debug;

use crate::config::EngineConfig;
use crate::document::{self, LoadedDocument};
use crate::error::{PdfWorksError, Result};
use crate::export::{Exporter, Operation};
use crate::model::{PageModel, PageModelSnapshot};
use crate::thumbnail::{CancelToken, Progress, RenderSummary, ThumbnailCache, ThumbnailRun};

/// Single-document engine: load, preview and export.
#[derive(Clone)]
pub struct Engine {
    config: Arc<EngineConfig>,
    exporter: Exporter,
    cache: Arc<Mutex<ThumbnailCache>>,
}

impl Engine {
    /// Create an engine.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if `config` does not validate.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            exporter: Exporter::with_config(&config),
            cache: Arc::new(Mutex::new(ThumbnailCache::new(config.cache_capacity))),
            config: Arc::new(config),
        })
    }

    /// Configuration in force.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Load an upload and build a page model recording its page sizes.
    ///
    /// # Errors
    ///
    /// See [`document::load_with_config`].
    pub async fn open(&self, name: impl Into<String>, bytes: Vec<u8>) -> Result<(LoadedDocument, PageModel)> {
        let name = name.into();
        let config = Arc::clone(&self.config);
        blocking(move || {
            let loaded = document::load_with_config(&name, &bytes, &config)?;
            let model = PageModel::with_page_sizes(&loaded.page_sizes());
            Ok((loaded, model))
        })
        .await
    }

    /// Render thumbnails for the export order of `snapshot` at the
    /// configured scale.
    ///
    /// # Errors
    ///
    /// See [`ThumbnailRun::finish`].
    pub async fn thumbnails(
        &self,
        loaded: &LoadedDocument,
        snapshot: PageModelSnapshot,
        cancel: CancelToken,
        on_progress: impl FnMut(Progress) + Send + 'static,
    ) -> Result<RenderSummary> {
        let loaded = loaded.clone();
        let cache = Arc::clone(&self.cache);
        let scale = self.config.thumbnail_scale;
        blocking(move || {
            ThumbnailRun::new(&loaded, &snapshot, scale, cancel)
                .with_cache(cache)
                .with_progress(on_progress)
                .finish()
        })
        .await
    }

    /// Export the selected pages of `snapshot`, carrying out `operation`.
    ///
    /// # Errors
    ///
    /// See [`Exporter::execute_with`].
    pub async fn export(
        &self,
        loaded: &LoadedDocument,
        snapshot: PageModelSnapshot,
        operation: Operation,
    ) -> Result<Vec<u8>> {
        let structural = Arc::clone(&loaded.structural);
        let exporter = self.exporter.clone();
        blocking(move || exporter.execute_with(&structural, &snapshot, &operation)).await
    }

    /// Number of cached thumbnails.
    pub fn cached_thumbnails(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    task::spawn_blocking(work).await.map_err(|e| {
        debug!("blocking task failed: {}", e);
        PdfWorksError::other(format!("Worker task failed: {e}"))
    })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use lopdf::Document;

    #[tokio::test]
    async fn test_open_preview_export() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let (loaded, mut model) = engine.open("doc.pdf", testing::sample_pdf(3)).await.unwrap();
        assert_eq!(model.len(), 3);

        let summary = engine
            .thumbnails(&loaded, model.snapshot(), CancelToken::new(), |_| {})
            .await
            .unwrap();
        assert_eq!(summary.thumbnails.len(), 3);
        assert_eq!(engine.cached_thumbnails(), 3);

        let last = model.ids()[2];
        model.remove(last).unwrap();
        let bytes = engine
            .export(&loaded, model.snapshot(), Operation::RemovePages)
            .await
            .unwrap();
        assert_eq!(Document::load_mem(&bytes).unwrap().get_pages().len(), 2);
    }

    #[tokio::test]
    async fn test_rotation_does_not_invalidate_thumbnails() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let (loaded, mut model) = engine.open("doc.pdf", testing::sample_pdf(2)).await.unwrap();

        engine
            .thumbnails(&loaded, model.snapshot(), CancelToken::new(), |_| {})
            .await
            .unwrap();
        model.rotate_all(90).unwrap();
        let again = engine
            .thumbnails(&loaded, model.snapshot(), CancelToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(again.cache_hits, 2);
    }

    #[tokio::test]
    async fn test_reload_invalidates_thumbnails() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let bytes = testing::sample_pdf(2);
        let (first, model) = engine.open("doc.pdf", bytes.clone()).await.unwrap();
        engine
            .thumbnails(&first, model.snapshot(), CancelToken::new(), |_| {})
            .await
            .unwrap();

        let (second, model) = engine.open("doc.pdf", bytes).await.unwrap();
        let summary = engine
            .thumbnails(&second, model.snapshot(), CancelToken::new(), |_| {})
            .await
            .unwrap();

        assert_eq!(summary.cache_hits, 0);
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = EngineConfig {
            thumbnail_scale: 0.0,
            ..EngineConfig::default()
        };
        assert!(matches!(Engine::new(config), Err(PdfWorksError::InvalidConfig { .. })));
    }

    #[tokio::test]
    async fn test_export_empty_selection() {
        let engine = Engine::new(EngineConfig::default()).unwrap();
        let (loaded, mut model) = engine.open("doc.pdf", testing::sample_pdf(1)).await.unwrap();
        model.deselect(model.ids()[0]).unwrap();

        let err = engine
            .export(&loaded, model.snapshot(), Operation::Extract)
            .await
            .unwrap_err();
        assert!(matches!(err, PdfWorksError::EmptySelection));
    }
}
