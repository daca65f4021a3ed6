//! Chunked, failure-tolerant merging of an upload batch.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{MergeLimits, Metadata};
use crate::document::StructuralDocument;
use crate::error::{PdfWorksError, Result};
use crate::export::MetadataManager;
use crate::io::{LoadedPdf, PdfReader, PdfWriter};
use crate::merge::{FileFailure, MergeState, UploadBatch, UploadedFile};
use crate::validation::{AdmissionControl, looks_like_pdf};

/// Result of a completed merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Serialized merged document.
    pub bytes: Vec<u8>,
    /// Pages in the merged document.
    pub total_pages: usize,
    /// Files whose pages made it into the output.
    pub files_processed: usize,
    /// Wall time from receipt to serialized output.
    pub processing_time: Duration,
    /// Files that were skipped, in submission order.
    pub failures: Vec<FileFailure>,
    /// Final state; always `Completed`.
    pub state: MergeState,
}

impl MergeOutcome {
    /// Processing time as reported to clients, e.g. `"1.25s"`.
    pub fn processing_time_header(&self) -> String {
        format!("{:.2}s", self.processing_time.as_secs_f64())
    }
}

/// Validates and merges upload batches.
///
/// Files are parsed in chunks of `batch_size`: every file of a chunk is
/// parsed concurrently on the blocking pool, and the chunk is joined before
/// the next one starts. Pages are appended to the output on the calling task
/// only, in submission order.
#[derive(Debug, Clone)]
pub struct MergeCoordinator {
    admission: AdmissionControl,
    reader: PdfReader,
    writer: PdfWriter,
    metadata: Metadata,
}

impl MergeCoordinator {
    /// Create a coordinator enforcing `limits`.
    pub fn new(limits: MergeLimits) -> Self {
        Self {
            admission: AdmissionControl::new(limits),
            reader: PdfReader::new(),
            writer: PdfWriter::new(),
            metadata: Metadata::default(),
        }
    }

    /// Use `writer` for the merged output.
    pub fn with_writer(mut self, writer: PdfWriter) -> Self {
        self.writer = writer;
        self
    }

    /// Write `metadata` into the merged output.
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    /// Limits in force.
    pub fn limits(&self) -> &MergeLimits {
        self.admission.limits()
    }

    /// Merge `batch` into one document.
    ///
    /// # Errors
    ///
    /// Returns:
    /// - an admission error (`TooFewFiles`, `TooManyFiles`, `FileTooLarge`,
    ///   `BatchTooLarge`) before anything is parsed
    /// - `NoValidFiles` with every failure if no page could be copied
    /// - `SerializationError` if the merged document cannot be written
    pub async fn merge(&self, batch: UploadBatch) -> Result<MergeOutcome> {
        let start = Instant::now();
        let mut state = MergeState::Received;
        debug!(
            files = batch.file_count(),
            bytes = batch.total_size(),
            %state,
            "merge received"
        );

        if let Err(e) = self.admission.check(&batch) {
            state = state.transition(MergeState::Rejected)?;
            warn!(%state, "merge rejected: {}", e);
            return Err(e);
        }
        state = state.transition(MergeState::Validated)?;
        state = state.transition(MergeState::Processing)?;

        let mut target = StructuralDocument::new();
        let mut failures = Vec::new();
        let mut total_pages = 0;
        let mut files_processed = 0;

        let chunk_size = self.limits().batch_size.max(1);
        let mut files = batch.files.into_iter();
        loop {
            let chunk: Vec<UploadedFile> = files.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }

            for (name, parsed) in self.parse_chunk(chunk).await {
                let loaded = match parsed {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        warn!(file = %name, "skipping file: {}", e);
                        failures.push(FileFailure::invalid(name));
                        continue;
                    }
                };

                match append(&mut target, &loaded) {
                    Ok(pages) => {
                        total_pages += pages;
                        files_processed += 1;
                    }
                    Err(e) => {
                        warn!(file = %name, "skipping file: {}", e);
                        failures.push(FileFailure::invalid(name));
                    }
                }
            }
        }

        if total_pages == 0 {
            state = state.transition(MergeState::Rejected)?;
            warn!(%state, failed = failures.len(), "no valid files in batch");
            return Err(PdfWorksError::NoValidFiles { failures });
        }

        MetadataManager::new().apply(target.document_mut(), &self.metadata)?;
        let bytes = target.serialize_with(&self.writer)?;
        state = state.transition(MergeState::Completed)?;

        let outcome = MergeOutcome {
            bytes,
            total_pages,
            files_processed,
            processing_time: start.elapsed(),
            failures,
            state,
        };
        info!(
            pages = outcome.total_pages,
            files = outcome.files_processed,
            failed = outcome.failures.len(),
            bytes = outcome.bytes.len(),
            elapsed = %outcome.processing_time_header(),
            "merge completed"
        );
        Ok(outcome)
    }

    /// Parse one chunk concurrently; results come back in submission order.
    async fn parse_chunk(&self, chunk: Vec<UploadedFile>) -> Vec<(String, Result<LoadedPdf>)> {
        let names: Vec<String> = chunk.iter().map(|f| f.name.clone()).collect();
        let mut candidates = Vec::with_capacity(chunk.len());
        let mut headers = Vec::with_capacity(chunk.len());
        for file in chunk {
            let is_pdf = looks_like_pdf(&file.bytes);
            headers.push(is_pdf);
            if is_pdf {
                candidates.push((file.name, file.bytes));
            }
        }

        let (results, stats) = self.reader.load_all(candidates, headers.len()).await;
        debug!(
            loaded = stats.success_count,
            failed = stats.failure_count,
            pages = stats.total_pages,
            elapsed_ms = stats.total_time.as_millis() as u64,
            "chunk parsed"
        );

        let mut parsed = results.into_iter();
        names
            .into_iter()
            .zip(headers)
            .map(|(name, is_pdf)| {
                let result = if is_pdf {
                    parsed
                        .next()
                        .unwrap_or_else(|| Err(PdfWorksError::other("Parse result missing")))
                } else {
                    Err(PdfWorksError::corrupt_document(&name, "missing PDF header"))
                };
                (name, result)
            })
            .collect()
    }
}

impl Default for MergeCoordinator {
    fn default() -> Self {
        Self::new(MergeLimits::default())
    }
}

/// Append every page of `loaded` to `target`. Returns the number of pages.
fn append(target: &mut StructuralDocument, loaded: &LoadedPdf) -> Result<usize> {
    let handles = target.copy_pages(&loaded.document, &loaded.document.page_numbers())?;
    let count = handles.len();
    for handle in handles {
        target.add_page(handle)?;
    }
    debug!(file = %loaded.name, pages = count, "appended file");
    Ok(count)
}
