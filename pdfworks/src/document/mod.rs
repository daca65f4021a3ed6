//! Loading uploads into paired structural and renderable documents.

pub mod copier;
pub mod geometry;
pub mod structural;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tracing::info;

use crate::config::EngineConfig;
use crate::error::{PdfWorksError, Result};
use crate::render::RenderableDocument;

pub use geometry::{CropBox, PageSize, Rotation};
pub use structural::{DocumentId, PageHandle, StructuralDocument};

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

/// Monotonic load counter; thumbnails are keyed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Generation(u64);

impl Generation {
    fn next() -> Self {
        Self(NEXT_GENERATION.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw counter value.
    pub fn value(self) -> u64 {
        self.0
    }
}

/// One upload parsed twice: for editing and for rendering.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    /// Generation of this load.
    pub generation: Generation,
    /// Display name of the upload.
    pub name: String,
    /// Object graph used for copying pages.
    pub structural: Arc<StructuralDocument>,
    /// Independent parse used for thumbnails.
    pub renderable: Arc<RenderableDocument>,
    /// Size of the upload in bytes.
    pub byte_len: u64,
}

impl LoadedDocument {
    /// Number of pages.
    pub fn page_count(&self) -> usize {
        self.structural.page_count()
    }

    /// Media box sizes of all pages, in page order.
    pub fn page_sizes(&self) -> Vec<PageSize> {
        self.renderable.page_sizes()
    }
}

/// Load an upload with the default document size limit.
///
/// # Errors
///
/// See [`load_with_config`].
pub fn load(name: &str, bytes: &[u8]) -> Result<LoadedDocument> {
    load_with_config(name, bytes, &EngineConfig::default())
}

/// Load an upload into both representations.
///
/// Every call yields a fresh [`Generation`].
///
/// # Errors
///
/// Returns:
/// - `FileTooLarge` if the upload exceeds `config.max_document_size`
/// - `CorruptDocument` or `EncryptedDocument` if either parse fails
/// - `CorruptDocument` if the two parses disagree on the page count
pub fn load_with_config(name: &str, bytes: &[u8], config: &EngineConfig) -> Result<LoadedDocument> {
    let byte_len = bytes.len() as u64;
    if byte_len > config.max_document_size {
        return Err(PdfWorksError::FileTooLarge {
            name: name.to_string(),
            size: byte_len,
            max: config.max_document_size,
        });
    }

    let structural = StructuralDocument::load_named(name, bytes)?;
    let renderable = RenderableDocument::load_named(name, bytes)?;

    if structural.page_count() != renderable.page_count() {
        return Err(PdfWorksError::corrupt_document(
            name,
            format!(
                "page count mismatch: {} structural vs {} renderable",
                structural.page_count(),
                renderable.page_count()
            ),
        ));
    }

    let generation = Generation::next();
    info!(
        file = name,
        pages = structural.page_count(),
        bytes = byte_len,
        generation = generation.value(),
        "loaded document"
    );

    Ok(LoadedDocument {
        generation,
        name: name.to_string(),
        structural: Arc::new(structural),
        renderable: Arc::new(renderable),
        byte_len,
    })
}
