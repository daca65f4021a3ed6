//! Reassembling a new PDF from a page model.
//!
//! The [`Exporter`] never mutates its input. It creates an empty
//! [`StructuralDocument`], copies every selected page in model order, applies
//! the page's rotation delta and crop, stamps a watermark when asked to, and
//! serializes the result.
//!
//! # Examples
//!
//! ```no_run
//! use pdfworks::document;
//! use pdfworks::export::{Exporter, Operation};
//! use pdfworks::model::PageModel;
//!
//! # fn example(bytes: &[u8]) -> pdfworks::Result<()> {
//! let loaded = document::load("scan.pdf", bytes)?;
//! let mut model = PageModel::with_page_sizes(&loaded.page_sizes());
//! model.rotate_all(90)?;
//!
//! let output = Exporter::new().execute_with(&loaded.structural, &model.snapshot(), &Operation::Rotate)?;
//! std::fs::write(Operation::Rotate.output_filename("scan.pdf"), output)?;
//! # Ok(())
//! # }
//! ```

pub mod metadata;
pub mod watermark;

use std::fmt;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::{EngineConfig, Metadata};
use crate::document::StructuralDocument;
use crate::error::{PdfWorksError, Result};
use crate::io::{PdfWriter, WriteOptions};
use crate::model::{PageDescriptor, PageModelSnapshot};

pub use metadata::MetadataManager;
pub use watermark::WatermarkOptions;

/// Page-level operation an export carries out.
///
/// Structural operations (rotate, crop, organize, remove, extract) are fully
/// described by the page model; the descriptor only names the output. The
/// rest add work on top.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Reorder pages.
    Organize,
    /// Rotate pages.
    Rotate,
    /// Crop pages.
    Crop,
    /// Drop deselected pages.
    RemovePages,
    /// Keep a subset of pages.
    Extract,
    /// Rewrite the document through a fresh page tree.
    Repair,
    /// Combine documents.
    Merge,
    /// Stamp text over every exported page.
    Watermark(WatermarkOptions),
    /// Password-protect the output.
    ///
    /// Encryption is not performed: the password is validated and the
    /// document exported unencrypted.
    Protect {
        /// User password.
        password: String,
    },
}

impl Operation {
    /// Suffix appended to the input file stem.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Organize => "organized",
            Self::Rotate => "rotated",
            Self::Crop => "cropped",
            Self::RemovePages => "removed_pages",
            Self::Extract => "extracted",
            Self::Repair => "repaired",
            Self::Merge => "merged",
            Self::Watermark(_) => "watermarked",
            Self::Protect { .. } => "protected",
        }
    }

    /// Output file name for an input named `input`.
    ///
    /// Merges always produce `merged.pdf`; everything else is
    /// `{stem}_{suffix}.pdf`.
    pub fn output_filename(&self, input: &str) -> String {
        if matches!(self, Self::Merge) {
            return "merged.pdf".to_string();
        }
        let stem = input
            .strip_suffix(".pdf")
            .or_else(|| input.strip_suffix(".PDF"))
            .unwrap_or(input);
        let stem = if stem.is_empty() { "document" } else { stem };
        format!("{stem}_{}.pdf", self.suffix())
    }

    fn validate(&self) -> Result<()> {
        match self {
            Self::Watermark(options) => options.validate(),
            Self::Protect { password } if password.is_empty() => {
                Err(PdfWorksError::invalid_operation("Password must not be empty"))
            }
            _ => Ok(()),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.suffix())
    }
}

/// Builds output documents from a source document and a page model.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    writer: PdfWriter,
    metadata: Metadata,
}

impl Exporter {
    /// Exporter with default compression and no extra metadata.
    pub fn new() -> Self {
        Self::default()
    }

    /// Exporter honoring the compression and metadata settings of `config`.
    pub fn with_config(config: &EngineConfig) -> Self {
        Self {
            writer: PdfWriter::with_options(WriteOptions::from(config.compression)),
            metadata: config.metadata.clone(),
        }
    }

    /// Export the selected pages of `model` as they stand.
    ///
    /// # Errors
    ///
    /// See [`Exporter::execute_with`].
    pub fn execute(&self, source: &StructuralDocument, model: &PageModelSnapshot) -> Result<Vec<u8>> {
        self.execute_with(source, model, &Operation::Organize)
    }

    /// Export the selected pages of `model`, carrying out `operation`.
    ///
    /// The output has exactly one page per selected descriptor, in model
    /// order. Each page's rotation is its own rotation plus the descriptor's
    /// delta; crops are clamped to the copied page's media box.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `EmptySelection` if no page is selected
    /// - `InvalidOperation` for unusable watermark options or passwords
    /// - `ExportError` wrapping any copy, transform or serialization failure
    pub fn execute_with(
        &self,
        source: &StructuralDocument,
        model: &PageModelSnapshot,
        operation: &Operation,
    ) -> Result<Vec<u8>> {
        let start = Instant::now();
        operation.validate()?;

        let pages: Vec<&PageDescriptor> = model.export_order().collect();
        if pages.is_empty() {
            return Err(PdfWorksError::EmptySelection);
        }
        if matches!(operation, Operation::Protect { .. }) {
            warn!("password protection is not available; exporting unencrypted");
        }

        let bytes = self.assemble(source, &pages, operation).map_err(PdfWorksError::export)?;

        info!(
            operation = %operation,
            pages = pages.len(),
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "exported document"
        );
        Ok(bytes)
    }

    fn assemble(&self, source: &StructuralDocument, pages: &[&PageDescriptor], operation: &Operation) -> Result<Vec<u8>> {
        let mut output = StructuralDocument::new();
        let numbers: Vec<u32> = pages.iter().map(|p| p.source_page).collect();
        let handles = output.copy_pages(source, &numbers)?;

        for (page, handle) in pages.iter().zip(handles) {
            if page.rotation.degrees() != 0 {
                let rotation = output.rotation(handle)?.compose(page.rotation);
                output.set_rotation(handle, rotation)?;
            }
            if let Some(crop) = page.crop {
                output.set_crop_box(handle, crop)?;
            }
            if let Operation::Watermark(options) = operation {
                let media_box = output.media_box(handle)?;
                watermark::stamp(output.document_mut(), handle.object_id(), media_box, options)?;
            }
            output.add_page(handle)?;
        }

        MetadataManager::new().apply(output.document_mut(), &self.metadata)?;
        output.serialize_with(&self.writer)
    }
}
