//! Batch merging of uploaded PDFs.
//!
//! A merge moves through a small state machine:
//!
//! ```text
//! Received -> Validated -> Processing -> Completed
//!     |                        |
//!     +------> Rejected <------+
//! ```
//!
//! Admission happens between `Received` and `Validated` and never parses a
//! byte. Files that fail to parse are skipped and reported; the merge is only
//! rejected after processing when no page at all could be copied.

pub mod coordinator;

use std::fmt;

use serde::Serialize;

use crate::error::{PdfWorksError, Result};

pub use coordinator::{MergeCoordinator, MergeOutcome};

/// Message reported for every file that could not be merged.
pub const INVALID_FILE_MESSAGE: &str = "Invalid PDF file or corrupt content";

/// One uploaded file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Client-supplied file name.
    pub name: String,
    /// Raw bytes, never modified.
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    /// Create an upload.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Files submitted together for merging, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBatch {
    /// Uploaded files.
    pub files: Vec<UploadedFile>,
}

impl UploadBatch {
    /// Create a batch.
    pub fn new(files: Vec<UploadedFile>) -> Self {
        Self { files }
    }

    /// Add a file at the end.
    pub fn push(&mut self, file: UploadedFile) {
        self.files.push(file);
    }

    /// Sum of all file sizes in bytes.
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(UploadedFile::size).sum()
    }

    /// Number of files.
    pub fn file_count(&self) -> usize {
        self.files.len()
    }
}

impl FromIterator<UploadedFile> for UploadBatch {
    fn from_iter<I: IntoIterator<Item = UploadedFile>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// A file skipped during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    /// Client-supplied file name.
    pub file: String,
    /// Client-facing reason.
    pub error: String,
}

impl FileFailure {
    /// Failure for `file` with the standard message.
    pub fn invalid(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            error: INVALID_FILE_MESSAGE.to_string(),
        }
    }
}

/// Lifecycle of one merge request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeState {
    /// Batch accepted for inspection.
    Received,
    /// Admission limits satisfied.
    Validated,
    /// Files being parsed and appended.
    Processing,
    /// Output produced.
    Completed,
    /// Refused at admission, or nothing could be merged.
    Rejected,
}

impl MergeState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Rejected)
    }

    /// Move to `next`.
    ///
    /// # Errors
    ///
    /// Returns `Other` for transitions the lifecycle does not allow.
    pub fn transition(self, next: MergeState) -> Result<MergeState> {
        use MergeState::*;
        match (self, next) {
            (Received, Validated | Rejected) | (Validated, Processing) | (Processing, Completed | Rejected) => {
                Ok(next)
            }
            _ => Err(PdfWorksError::other(format!(
                "Illegal merge state transition: {self} -> {next}"
            ))),
        }
    }
}

impl fmt::Display for MergeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Rejected => "rejected",
        };
        f.write_str(name)
    }
}
