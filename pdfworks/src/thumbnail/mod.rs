//! Cancellable thumbnail generation over a page model snapshot.
//!
//! A [`ThumbnailRun`] walks the export order of a [`PageModelSnapshot`] one
//! page at a time, rendering from the renderable half of a
//! [`LoadedDocument`]. It is a plain iterator: dropping it stops the work,
//! and a run cannot be restarted. Create a new run with a fresh
//! [`CancelToken`] instead.
//!
//! # Examples
//!
//! ```no_run
//! use pdfworks::document;
//! use pdfworks::model::PageModel;
//! use pdfworks::thumbnail::{CancelToken, ThumbnailRun};
//!
//! # fn example(bytes: &[u8]) -> pdfworks::Result<()> {
//! let loaded = document::load("input.pdf", bytes)?;
//! let model = PageModel::with_page_sizes(&loaded.page_sizes());
//!
//! let summary = ThumbnailRun::new(&loaded, &model.snapshot(), 0.4, CancelToken::new())
//!     .with_progress(|p| println!("{:.0}%", p.percent()))
//!     .finish()?;
//! println!("{} thumbnails", summary.thumbnails.len());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod progress;

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{ImageFormat, RgbaImage};
use tracing::{debug, warn};

use crate::document::{Generation, LoadedDocument};
use crate::error::{PdfWorksError, Result};
use crate::model::{PageDescriptor, PageId, PageModelSnapshot};
use crate::render::RenderableDocument;

pub use cache::{ThumbnailCache, ThumbnailKey};
pub use progress::{Progress, ProgressTracker};

/// Shared cancellation flag.
///
/// Clones observe the same flag. Once cancelled a token stays cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Rendered preview of one page.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    /// Load the page was rendered from.
    pub generation: Generation,
    /// Page in the model.
    pub page_id: PageId,
    /// 1-based page number in the source document.
    pub source_page: u32,
    /// Pixels per point.
    pub scale: f32,
    /// RGBA pixels.
    pub image: Arc<RgbaImage>,
}

impl Thumbnail {
    /// Cache key of this thumbnail.
    pub fn key(&self) -> ThumbnailKey {
        ThumbnailKey::new(self.generation, self.page_id, self.scale)
    }

    /// Bitmap width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Bitmap height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Encode as PNG.
    ///
    /// # Errors
    ///
    /// Returns `PageRender` if encoding fails.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(|e| PdfWorksError::page_render(self.source_page, format!("PNG encoding failed: {e}")))?;
        Ok(bytes)
    }
}

/// A page that could not be rendered.
#[derive(Debug)]
pub struct PageFailure {
    /// Page in the model.
    pub page_id: PageId,
    /// 1-based page number in the source document.
    pub source_page: u32,
    /// Why rendering failed.
    pub error: PdfWorksError,
}

/// Outcome of a run that rendered every page.
#[derive(Debug, Clone)]
pub struct RenderSummary {
    /// Thumbnails in export order.
    pub thumbnails: Vec<Thumbnail>,
    /// Thumbnails served from the cache.
    pub cache_hits: usize,
    /// Wall time of the run.
    pub elapsed: Duration,
}

type ProgressCallback<'a> = Box<dyn FnMut(Progress) + Send + 'a>;

/// Lazy iterator rendering the selected pages of a snapshot in order.
pub struct ThumbnailRun<'a> {
    renderable: Arc<RenderableDocument>,
    generation: Generation,
    pages: Vec<PageDescriptor>,
    next: usize,
    scale: f32,
    cancel: CancelToken,
    tracker: ProgressTracker,
    on_progress: Option<ProgressCallback<'a>>,
    cache: Option<Arc<Mutex<ThumbnailCache>>>,
    cache_hits: usize,
}

impl<'a> ThumbnailRun<'a> {
    /// Prepare a run over the export order of `snapshot`.
    ///
    /// Nothing is rendered until the run is iterated.
    pub fn new(loaded: &LoadedDocument, snapshot: &PageModelSnapshot, scale: f32, cancel: CancelToken) -> Self {
        let pages: Vec<PageDescriptor> = snapshot.export_order().cloned().collect();
        Self {
            renderable: Arc::clone(&loaded.renderable),
            generation: loaded.generation,
            tracker: ProgressTracker::new(pages.len()),
            pages,
            next: 0,
            scale,
            cancel,
            on_progress: None,
            cache: None,
            cache_hits: 0,
        }
    }

    /// Invoke `callback` after each page, failed pages included.
    pub fn with_progress(mut self, callback: impl FnMut(Progress) + Send + 'a) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }

    /// Serve and store thumbnails through `cache`.
    pub fn with_cache(mut self, cache: Arc<Mutex<ThumbnailCache>>) -> Self {
        if let Ok(mut guard) = cache.lock() {
            guard.switch_generation(self.generation);
        }
        self.cache = Some(cache);
        self
    }

    /// Number of pages this run covers.
    pub fn total(&self) -> usize {
        self.pages.len()
    }

    /// Drive the run to the end.
    ///
    /// # Errors
    ///
    /// Returns `PartialRenderFailure` listing every failed page, or
    /// `Cancelled` if the run was cancelled before covering all pages.
    pub fn finish(mut self) -> Result<RenderSummary> {
        let mut thumbnails = Vec::with_capacity(self.pages.len());
        let mut failed = Vec::new();

        for result in self.by_ref() {
            match result {
                Ok(thumbnail) => thumbnails.push(thumbnail),
                Err(failure) => failed.push(failure.page_id),
            }
        }

        if !failed.is_empty() {
            return Err(PdfWorksError::PartialRenderFailure { failed });
        }
        if self.next < self.pages.len() {
            return Err(PdfWorksError::Cancelled);
        }

        Ok(RenderSummary {
            thumbnails,
            cache_hits: self.cache_hits,
            elapsed: self.tracker.elapsed(),
        })
    }

    fn cached(&self, key: &ThumbnailKey) -> Option<Thumbnail> {
        let cache = self.cache.as_ref()?;
        cache.lock().ok()?.get(key)
    }

    fn store(&self, thumbnail: &Thumbnail) {
        if let Some(cache) = &self.cache {
            if let Ok(mut guard) = cache.lock() {
                guard.insert(thumbnail.clone());
            }
        }
    }

    fn render(&mut self, page: &PageDescriptor) -> std::result::Result<Thumbnail, PageFailure> {
        let key = ThumbnailKey::new(self.generation, page.id, self.scale);
        if let Some(hit) = self.cached(&key) {
            self.cache_hits += 1;
            return Ok(hit);
        }

        match self.renderable.render_page(page.source_page, self.scale) {
            Ok(image) => {
                let thumbnail = Thumbnail {
                    generation: self.generation,
                    page_id: page.id,
                    source_page: page.source_page,
                    scale: self.scale,
                    image: Arc::new(image),
                };
                self.store(&thumbnail);
                Ok(thumbnail)
            }
            Err(error) => {
                warn!(page = page.source_page, id = %page.id, "thumbnail failed: {}", error);
                Err(PageFailure {
                    page_id: page.id,
                    source_page: page.source_page,
                    error,
                })
            }
        }
    }
}

impl Iterator for ThumbnailRun<'_> {
    type Item = std::result::Result<Thumbnail, PageFailure>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.pages.len() {
            return None;
        }
        if self.cancel.is_cancelled() {
            debug!(completed = self.next, total = self.pages.len(), "thumbnail run cancelled");
            return None;
        }

        let page = self.pages[self.next].clone();
        self.next += 1;
        let result = self.render(&page);

        let progress = self.tracker.advance();
        if let Some(callback) = self.on_progress.as_mut() {
            callback(progress);
        }
        if progress.is_complete() {
            debug!(
                pages = progress.total,
                cache_hits = self.cache_hits,
                elapsed_ms = self.tracker.elapsed().as_millis() as u64,
                "thumbnail run complete"
            );
        }
        Some(result)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.pages.len() - self.next))
    }
}
