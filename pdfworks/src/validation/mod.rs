//! Admission control for merge batches.
//!
//! Every check here looks only at file counts and sizes, so a batch is
//! accepted or rejected before a single byte is parsed. Checks run in a fixed
//! order and the first violation wins:
//!
//! 1. too few files
//! 2. too many files
//! 3. a single file above the per-file limit
//! 4. the batch above the total limit
//!
//! # Examples
//!
//! ```
//! use pdfworks::config::MergeLimits;
//! use pdfworks::validation::AdmissionControl;
//!
//! let admission = AdmissionControl::new(MergeLimits::default());
//! assert!(admission.check_sizes(&[("a.pdf", 10), ("b.pdf", 20)]).is_ok());
//! assert!(admission.check_sizes(&[("a.pdf", 10)]).is_err());
//! ```

use tracing::debug;

use crate::config::MergeLimits;
use crate::error::{PdfWorksError, Result};
use crate::merge::UploadBatch;

/// Magic bytes every PDF starts with.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// How far into an upload the header may appear.
const HEADER_WINDOW: usize = 1024;

/// Validates merge batches against [`MergeLimits`].
#[derive(Debug, Clone, Copy, Default)]
pub struct AdmissionControl {
    limits: MergeLimits,
}

impl AdmissionControl {
    /// Create admission control for `limits`.
    pub fn new(limits: MergeLimits) -> Self {
        Self { limits }
    }

    /// Limits in force.
    pub fn limits(&self) -> &MergeLimits {
        &self.limits
    }

    /// Check a batch of uploads.
    ///
    /// # Errors
    ///
    /// See [`AdmissionControl::check_sizes`].
    pub fn check(&self, batch: &UploadBatch) -> Result<()> {
        let manifest: Vec<(&str, u64)> = batch
            .files
            .iter()
            .map(|f| (f.name.as_str(), f.bytes.len() as u64))
            .collect();
        self.check_sizes(&manifest)
    }

    /// Check a manifest of `(name, size)` pairs.
    ///
    /// # Errors
    ///
    /// Returns, in this order of precedence, `TooFewFiles`, `TooManyFiles`,
    /// `FileTooLarge` or `BatchTooLarge`.
    pub fn check_sizes(&self, files: &[(&str, u64)]) -> Result<()> {
        let count = files.len();
        if count < self.limits.min_files {
            return Err(PdfWorksError::TooFewFiles {
                count,
                min: self.limits.min_files,
            });
        }
        if count > self.limits.max_files {
            return Err(PdfWorksError::TooManyFiles {
                count,
                max: self.limits.max_files,
            });
        }

        if let Some(&(name, size)) = files.iter().find(|(_, size)| *size > self.limits.max_file_size) {
            return Err(PdfWorksError::FileTooLarge {
                name: name.to_string(),
                size,
                max: self.limits.max_file_size,
            });
        }

        let total: u64 = files.iter().map(|(_, size)| size).sum();
        if total > self.limits.max_total_size {
            return Err(PdfWorksError::BatchTooLarge {
                total,
                max: self.limits.max_total_size,
            });
        }

        debug!(files = count, bytes = total, "batch admitted");
        Ok(())
    }
}

/// Whether `bytes` carry a PDF header near the start.
///
/// Cheap pre-check used to skip obvious non-PDF uploads without parsing.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(HEADER_WINDOW)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}
