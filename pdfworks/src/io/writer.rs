//! PDF serialization to in-memory buffers.
//!
//! The writer never mutates the document it is given: it serializes a clone,
//! optionally compressed and pruned, and reports what it did.
//!
//! # Examples
//!
//! ```no_run
//! use pdfworks::io::writer::PdfWriter;
//! use lopdf::Document;
//!
//! # fn example(doc: &Document) -> Result<(), Box<dyn std::error::Error>> {
//! let (bytes, stats) = PdfWriter::new().to_bytes(doc)?;
//! println!("Wrote {} bytes in {:?}", bytes.len(), stats.write_time);
//! # Ok(())
//! # }
//! ```

use lopdf::Document;
use std::time::{Duration, Instant};

use crate::config::CompressionLevel;
use crate::error::{PdfWorksError, Result};

/// Options for serializing PDF documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Compress streams that have no filter yet.
    pub compress: bool,

    /// Drop unreferenced objects before writing.
    pub optimize: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::from(CompressionLevel::default())
    }
}

impl From<CompressionLevel> for WriteOptions {
    fn from(level: CompressionLevel) -> Self {
        match level {
            CompressionLevel::None => Self {
                compress: false,
                optimize: false,
            },
            CompressionLevel::Standard => Self {
                compress: true,
                optimize: false,
            },
            CompressionLevel::Maximum => Self {
                compress: true,
                optimize: true,
            },
        }
    }
}

/// Statistics about a write operation.
#[derive(Debug, Clone)]
pub struct WriteStatistics {
    /// Time taken to serialize.
    pub write_time: Duration,

    /// Size of the output in bytes.
    pub byte_len: u64,

    /// Whether compression was applied.
    pub compressed: bool,

    /// Whether unreferenced objects were pruned.
    pub optimized: bool,
}

/// PDF writer with configurable behavior.
#[derive(Debug, Clone, Default)]
pub struct PdfWriter {
    options: WriteOptions,
}

impl PdfWriter {
    /// Create a new PDF writer with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with custom options.
    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    /// Create a writer that keeps streams exactly as they are.
    pub fn without_compression() -> Self {
        Self::with_options(CompressionLevel::None.into())
    }

    /// Serialize a document to bytes.
    ///
    /// Output is deterministic for identical documents and options.
    ///
    /// # Errors
    ///
    /// Returns `SerializationError` if `lopdf` fails to write the document.
    pub fn to_bytes(&self, doc: &Document) -> Result<(Vec<u8>, WriteStatistics)> {
        let start = Instant::now();
        let mut output = doc.clone();

        if self.options.compress {
            output.compress();
        }
        if self.options.optimize {
            output.prune_objects();
        }
        output.renumber_objects();

        let mut buffer = Vec::new();
        output
            .save_to(&mut buffer)
            .map_err(|e| PdfWorksError::serialization(e.to_string()))?;

        let stats = WriteStatistics {
            write_time: start.elapsed(),
            byte_len: buffer.len() as u64,
            compressed: self.options.compress,
            optimized: self.options.optimize,
        };

        Ok((buffer, stats))
    }
}
