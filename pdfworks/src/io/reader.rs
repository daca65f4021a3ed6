//! PDF parsing from in-memory uploads.
//!
//! This module provides:
//! - Single-document parsing with encryption and empty-document checks
//! - Ordered, bounded-parallel loading of upload chunks
//! - Aggregate load statistics
//!
//! # Examples
//!
//! ```no_run
//! use pdfworks::io::reader::PdfReader;
//!
//! # async fn example(a: Vec<u8>, b: Vec<u8>) {
//! let reader = PdfReader::new();
//! let files = vec![("a.pdf".to_string(), a), ("b.pdf".to_string(), b)];
//! let (results, stats) = reader.load_all(files, 5).await;
//! println!("{} of {} parsed", stats.success_count, results.len());
//! # }
//! ```

use lopdf::Document;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::document::StructuralDocument;
use crate::error::{PdfWorksError, Result};

/// A parsed upload with load metadata.
#[derive(Debug)]
pub struct LoadedPdf {
    /// Display name of the upload.
    pub name: String,

    /// The parsed document.
    pub document: StructuralDocument,

    /// Number of pages in the document.
    pub page_count: usize,

    /// Time taken to parse the document.
    pub load_time: Duration,

    /// Upload size in bytes.
    pub byte_len: u64,
}

/// Result of a load operation (success or failure).
pub type LoadResult = Result<LoadedPdf>;

/// Statistics for a batch load operation.
#[derive(Debug, Clone, Default)]
pub struct LoadStatistics {
    /// Number of PDFs successfully loaded.
    pub success_count: usize,

    /// Number of PDFs that failed to load.
    pub failure_count: usize,

    /// Wall-clock time for the whole batch.
    pub total_time: Duration,

    /// Average parse time per successful load.
    pub average_time: Duration,

    /// Total bytes of successfully loaded uploads.
    pub total_size: u64,

    /// Total pages across successfully loaded uploads.
    pub total_pages: usize,
}

impl LoadStatistics {
    /// Create statistics from load results.
    pub fn from_results(results: &[LoadResult], total_time: Duration) -> Self {
        let loaded: Vec<&LoadedPdf> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
        let success_count = loaded.len();
        let parse_time: Duration = loaded.iter().map(|l| l.load_time).sum();

        Self {
            success_count,
            failure_count: results.len() - success_count,
            total_time,
            average_time: if success_count > 0 {
                parse_time / success_count as u32
            } else {
                Duration::ZERO
            },
            total_size: loaded.iter().map(|l| l.byte_len).sum(),
            total_pages: loaded.iter().map(|l| l.page_count).sum(),
        }
    }
}

/// PDF reader that rejects encrypted and page-less documents.
#[derive(Debug, Clone, Copy)]
pub struct PdfReader;

impl PdfReader {
    /// Create a new PDF reader.
    pub fn new() -> Self {
        Self
    }

    /// Parse raw bytes into a `lopdf` document. The bytes are not modified.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - `EncryptedDocument` for encrypted input
    /// - `CorruptDocument` for unparsable input or documents without pages
    pub fn parse(&self, name: &str, bytes: &[u8]) -> Result<Document> {
        let doc = Document::load_mem(bytes).map_err(|e| match e {
            lopdf::Error::Decryption(_) => PdfWorksError::encrypted_document(name),
            _ if declares_encryption(bytes) => PdfWorksError::encrypted_document(name),
            other => PdfWorksError::corrupt_document(name, other.to_string()),
        })?;

        if doc.is_encrypted() {
            return Err(PdfWorksError::encrypted_document(name));
        }

        if doc.get_pages().is_empty() {
            return Err(PdfWorksError::corrupt_document(name, "PDF has no pages"));
        }

        Ok(doc)
    }

    /// Parse one upload into a structural document.
    ///
    /// # Errors
    ///
    /// Same as [`PdfReader::parse`].
    pub fn load(&self, name: &str, bytes: &[u8]) -> LoadResult {
        let start = Instant::now();
        let document = StructuralDocument::from_document(self.parse(name, bytes)?);
        let load_time = start.elapsed();

        debug!(
            file = name,
            pages = document.page_count(),
            elapsed_ms = load_time.as_millis() as u64,
            "parsed upload"
        );

        Ok(LoadedPdf {
            name: name.to_string(),
            page_count: document.page_count(),
            document,
            load_time,
            byte_len: bytes.len() as u64,
        })
    }

    /// Parse uploads concurrently on blocking worker threads.
    ///
    /// At most `workers` parses run at once. Results are returned in input
    /// order regardless of completion order.
    pub async fn load_parallel(&self, files: Vec<(String, Vec<u8>)>, workers: usize) -> Vec<LoadResult> {
        use futures::stream::{self, StreamExt};

        let workers = workers.max(1);
        let reader = *self;

        let tasks = files.into_iter().map(move |(name, bytes)| async move {
            tokio::task::spawn_blocking(move || reader.load(&name, &bytes))
                .await
                .map_err(|e| PdfWorksError::other(format!("Parse task failed: {e}")))?
        });

        stream::iter(tasks).buffered(workers).collect::<Vec<_>>().await
    }

    /// Load a batch and report statistics alongside the results.
    pub async fn load_all(
        &self,
        files: Vec<(String, Vec<u8>)>,
        max_workers: usize,
    ) -> (Vec<LoadResult>, LoadStatistics) {
        let start = Instant::now();
        let results = self.load_parallel(files, max_workers).await;
        let stats = LoadStatistics::from_results(&results, start.elapsed());
        (results, stats)
    }
}

impl Default for PdfReader {
    fn default() -> Self {
        Self::new()
    }
}

/// True when the trailer names an `/Encrypt` dictionary.
fn declares_encryption(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn test_parse_valid_document() {
        let bytes = testing::sample_pdf(3);
        let doc = PdfReader::new().parse("three.pdf", &bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }

    #[test]
    fn test_parse_garbage_is_corrupt() {
        let err = PdfReader::new()
            .parse("junk.pdf", &testing::garbage_bytes())
            .unwrap_err();
        assert!(matches!(err, PdfWorksError::CorruptDocument { ref name, .. } if name == "junk.pdf"));
    }

    #[test]
    fn test_parse_encrypted_is_rejected() {
        let err = PdfReader::new()
            .parse("locked.pdf", &testing::encrypted_pdf())
            .unwrap_err();
        assert!(matches!(err, PdfWorksError::EncryptedDocument { .. }));
    }

    #[test]
    fn test_empty_document_is_rejected() {
        let err = PdfReader::new().parse("empty.pdf", &testing::sample_pdf(0)).unwrap_err();
        assert!(matches!(err, PdfWorksError::CorruptDocument { .. }));
    }

    #[tokio::test]
    async fn test_load_parallel_preserves_order() {
        let files = vec![
            ("a.pdf".to_string(), testing::sample_pdf(3)),
            ("b.pdf".to_string(), testing::garbage_bytes()),
            ("c.pdf".to_string(), testing::sample_pdf(2)),
        ];

        let (results, stats) = PdfReader::new().load_all(files, 2).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().name, "a.pdf");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().page_count, 2);

        assert_eq!(stats.success_count, 2);
        assert_eq!(stats.failure_count, 1);
        assert_eq!(stats.total_pages, 5);
    }
}
