//! pdfworks - page-level PDF transformations and batch merging.
//!
//! The library loads a PDF twice, once as an editable object graph and once
//! for rasterization, and keeps the user's edits in a separate page model:
//!
//! - [`document`]: loading uploads into paired representations
//! - [`model`]: page order, rotation, crop and selection
//! - [`thumbnail`]: cancellable preview rendering with progress
//! - [`export`]: rebuilding a new PDF from the page model
//! - [`merge`]: admission-checked, failure-tolerant batch merging
//!
//! # Examples
//!
//! ## Rotate and reorder
//!
//! ```no_run
//! use pdfworks::document;
//! use pdfworks::export::{Exporter, Operation};
//! use pdfworks::model::PageModel;
//!
//! # fn example(bytes: &[u8]) -> pdfworks::Result<()> {
//! let loaded = document::load("input.pdf", bytes)?;
//! let mut model = PageModel::with_page_sizes(&loaded.page_sizes());
//!
//! let mut order = model.ids().to_vec();
//! order.reverse();
//! model.reorder(&order)?;
//! model.rotate(order[0], 90)?;
//!
//! let output = Exporter::new().execute_with(&loaded.structural, &model.snapshot(), &Operation::Organize)?;
//! # let _ = output;
//! # Ok(())
//! # }
//! ```
//!
//! ## Merge uploads
//!
//! ```no_run
//! use pdfworks::config::MergeLimits;
//! use pdfworks::merge::{MergeCoordinator, UploadBatch, UploadedFile};
//!
//! # async fn example(a: Vec<u8>, b: Vec<u8>) -> pdfworks::Result<()> {
//! let batch = UploadBatch::new(vec![UploadedFile::new("a.pdf", a), UploadedFile::new("b.pdf", b)]);
//! let outcome = MergeCoordinator::new(MergeLimits::default()).merge(batch).await?;
//! println!("{} pages from {} files", outcome.total_pages, outcome.files_processed);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod export;
pub mod io;
pub mod merge;
pub mod model;
pub mod render;
pub mod thumbnail;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export commonly used types
pub use config::{EngineConfig, MergeLimits};
pub use document::{LoadedDocument, StructuralDocument};
pub use engine::Engine;
pub use error::{PdfWorksError, Result};
pub use export::{Exporter, Operation};
pub use merge::{MergeCoordinator, UploadBatch, UploadedFile};
pub use model::{PageId, PageModel};
pub use render::RenderableDocument;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
