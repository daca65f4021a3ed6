//! Error types for pdfworks.
//!
//! Every fallible operation in the crate returns [`PdfWorksError`]. Errors are
//! grouped by where they surface:
//!
//! # Error Categories
//!
//! - **Document errors**: unparsable, encrypted or internally inconsistent PDFs
//! - **Page model errors**: invalid permutations, rotations, crop boxes, ids
//! - **Render errors**: per-page rasterization failures and partial runs
//! - **Export errors**: empty selections and serialization failures
//! - **Admission errors**: upload batches that violate the merge limits

use std::io;

use crate::merge::FileFailure;
use crate::model::PageId;

/// Result type alias for pdfworks operations.
pub type Result<T> = std::result::Result<T, PdfWorksError>;

/// Main error type for pdfworks operations.
#[derive(Debug, thiserror::Error)]
pub enum PdfWorksError {
    /// The bytes could not be parsed as a PDF, or the two parses disagree.
    #[error("Corrupted or invalid PDF: {name}\n  Details: {details}")]
    CorruptDocument {
        /// Display name of the upload.
        name: String,
        /// Details about the corruption.
        details: String,
    },

    /// The PDF is encrypted and cannot be processed.
    #[error("PDF is encrypted and cannot be processed: {name}")]
    EncryptedDocument {
        /// Display name of the upload.
        name: String,
    },

    /// A reorder was requested with a list that is not a permutation of the model.
    #[error("Invalid page order: {reason}")]
    InvalidPermutation {
        /// Why the list was rejected.
        reason: String,
    },

    /// The page model has no page with this id.
    #[error("Unknown page: {id}")]
    UnknownPage {
        /// The id that was looked up.
        id: PageId,
    },

    /// A 1-based page number outside the document.
    #[error("Page {page} does not exist (document has {page_count} page(s))")]
    PageOutOfRange {
        /// Requested page number.
        page: u32,
        /// Pages in the document.
        page_count: usize,
    },

    /// A page handle from another document, or one already appended.
    #[error("Invalid page handle: {reason}")]
    InvalidPageHandle {
        /// Why the handle was rejected.
        reason: String,
    },

    /// Rotation that is not a multiple of 90 degrees.
    #[error("Invalid rotation: {degrees}. Must be a multiple of 90")]
    InvalidRotation {
        /// Requested degrees.
        degrees: i64,
    },

    /// Crop box that cannot be clamped into a usable rectangle.
    #[error("Invalid crop box: {reason}")]
    InvalidCropBox {
        /// Why the box was rejected.
        reason: String,
    },

    /// Render scale that is not finite, not positive, or produces an oversized bitmap.
    #[error("Invalid render scale: {scale}")]
    InvalidScale {
        /// Requested scale.
        scale: f32,
    },

    /// Export requested with no selected pages.
    #[error("No pages selected for export")]
    EmptySelection,

    /// A single page could not be rasterized.
    #[error("Failed to render page {page}: {reason}")]
    PageRender {
        /// 1-based page number in the source document.
        page: u32,
        /// Reason for the failure.
        reason: String,
    },

    /// A thumbnail run finished with some pages failing.
    #[error("{} page(s) failed to render", failed.len())]
    PartialRenderFailure {
        /// Ids of the pages that failed, in export order.
        failed: Vec<PageId>,
    },

    /// The document could not be written.
    #[error("Failed to serialize PDF: {reason}")]
    SerializationError {
        /// Reason for the failure.
        reason: String,
    },

    /// Export failed; wraps the underlying copy or serialization error.
    #[error("Export failed: {source}")]
    ExportError {
        /// Underlying failure.
        #[source]
        source: Box<PdfWorksError>,
    },

    /// Fewer files than the merge minimum.
    #[error("Please upload at least {min} PDF files")]
    TooFewFiles {
        /// Files received.
        count: usize,
        /// Configured minimum.
        min: usize,
    },

    /// More files than the merge maximum.
    #[error("Maximum {max} files allowed")]
    TooManyFiles {
        /// Files received.
        count: usize,
        /// Configured maximum.
        max: usize,
    },

    /// A single file above the per-file limit.
    #[error("File {name} exceeds the {} limit", format_megabytes(*max))]
    FileTooLarge {
        /// Display name of the upload.
        name: String,
        /// Size in bytes.
        size: u64,
        /// Limit in bytes.
        max: u64,
    },

    /// Total batch size above the limit.
    #[error("Total size exceeds {} limit", format_megabytes(*max))]
    BatchTooLarge {
        /// Total size in bytes.
        total: u64,
        /// Limit in bytes.
        max: u64,
    },

    /// Every file of a merge batch failed.
    #[error("No valid PDF files could be processed")]
    NoValidFiles {
        /// Per-file failures.
        failures: Vec<FileFailure>,
    },

    /// Operation parameters are unusable (empty watermark text, empty password...).
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Description of the problem.
        message: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what's wrong with the configuration.
        message: String,
    },

    /// The operation was cancelled through its token.
    #[error("Operation cancelled")]
    Cancelled,

    /// Generic I/O error.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },

    /// Generic error with a custom message.
    #[error("{message}")]
    Other {
        /// Error message.
        message: String,
    },
}

impl From<lopdf::Error> for PdfWorksError {
    fn from(err: lopdf::Error) -> Self {
        Self::other(err.to_string())
    }
}

impl From<anyhow::Error> for PdfWorksError {
    fn from(err: anyhow::Error) -> Self {
        Self::invalid_config(err.to_string())
    }
}

impl PdfWorksError {
    /// Create a CorruptDocument error.
    pub fn corrupt_document(name: impl Into<String>, details: impl Into<String>) -> Self {
        Self::CorruptDocument {
            name: name.into(),
            details: details.into(),
        }
    }

    /// Create an EncryptedDocument error.
    pub fn encrypted_document(name: impl Into<String>) -> Self {
        Self::EncryptedDocument { name: name.into() }
    }

    /// Create an InvalidPermutation error.
    pub fn invalid_permutation(reason: impl Into<String>) -> Self {
        Self::InvalidPermutation {
            reason: reason.into(),
        }
    }

    /// Create an InvalidPageHandle error.
    pub fn invalid_page_handle(reason: impl Into<String>) -> Self {
        Self::InvalidPageHandle {
            reason: reason.into(),
        }
    }

    /// Create an InvalidCropBox error.
    pub fn invalid_crop_box(reason: impl Into<String>) -> Self {
        Self::InvalidCropBox {
            reason: reason.into(),
        }
    }

    /// Create a PageRender error.
    pub fn page_render(page: u32, reason: impl Into<String>) -> Self {
        Self::PageRender {
            page,
            reason: reason.into(),
        }
    }

    /// Create a SerializationError.
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self::SerializationError {
            reason: reason.into(),
        }
    }

    /// Wrap an error raised while exporting.
    ///
    /// Errors that already describe the export outcome are passed through.
    pub fn export(source: PdfWorksError) -> Self {
        match source {
            Self::ExportError { .. } | Self::EmptySelection | Self::InvalidOperation { .. } => {
                source
            }
            other => Self::ExportError {
                source: Box::new(other),
            },
        }
    }

    /// Create an InvalidOperation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create an InvalidConfig error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an Other error with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// Check if this error was raised by merge admission control.
    pub fn is_admission_rejection(&self) -> bool {
        matches!(
            self,
            Self::TooFewFiles { .. }
                | Self::TooManyFiles { .. }
                | Self::FileTooLarge { .. }
                | Self::BatchTooLarge { .. }
        )
    }

    /// HTTP status code for this error when surfaced by a server.
    ///
    /// Client-caused failures map to 400; everything else is an internal error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::CorruptDocument { .. }
            | Self::EncryptedDocument { .. }
            | Self::InvalidPermutation { .. }
            | Self::UnknownPage { .. }
            | Self::PageOutOfRange { .. }
            | Self::InvalidRotation { .. }
            | Self::InvalidCropBox { .. }
            | Self::InvalidScale { .. }
            | Self::EmptySelection
            | Self::TooFewFiles { .. }
            | Self::TooManyFiles { .. }
            | Self::FileTooLarge { .. }
            | Self::BatchTooLarge { .. }
            | Self::NoValidFiles { .. }
            | Self::InvalidOperation { .. } => 400,
            _ => 500,
        }
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CorruptDocument { .. } => "CorruptDocument",
            Self::EncryptedDocument { .. } => "EncryptedDocument",
            Self::InvalidPermutation { .. } => "InvalidPermutation",
            Self::UnknownPage { .. } => "UnknownPage",
            Self::PageOutOfRange { .. } => "PageOutOfRange",
            Self::InvalidPageHandle { .. } => "InvalidPageHandle",
            Self::InvalidRotation { .. } => "InvalidRotation",
            Self::InvalidCropBox { .. } => "InvalidCropBox",
            Self::InvalidScale { .. } => "InvalidScale",
            Self::EmptySelection => "EmptySelection",
            Self::PageRender { .. } => "PageRender",
            Self::PartialRenderFailure { .. } => "PartialRenderFailure",
            Self::SerializationError { .. } => "SerializationError",
            Self::ExportError { .. } => "ExportError",
            Self::TooFewFiles { .. } => "TooFewFiles",
            Self::TooManyFiles { .. } => "TooManyFiles",
            Self::FileTooLarge { .. } => "FileTooLarge",
            Self::BatchTooLarge { .. } => "BatchTooLarge",
            Self::NoValidFiles { .. } => "NoValidFiles",
            Self::InvalidOperation { .. } => "InvalidOperation",
            Self::InvalidConfig { .. } => "InvalidConfig",
            Self::Cancelled => "Cancelled",
            Self::Io { .. } => "Io",
            Self::Other { .. } => "Other",
        }
    }
}

/// Format a byte count as whole or fractional megabytes (1 MB = 1024²).
pub fn format_megabytes(bytes: u64) -> String {
    const MB: f64 = 1024.0 * 1024.0;
    let mb = bytes as f64 / MB;
    if mb.fract() == 0.0 {
        format!("{mb:.0}MB")
    } else {
        format!("{mb:.2} MB")
    }
}
