//! Configuration for the engine and the merge coordinator.
//!
//! Two validated structures drive the library:
//! - [`EngineConfig`] for single-document tools (load limits, thumbnails, output)
//! - [`MergeLimits`] for multi-file merge admission and chunking

use anyhow::{Context, Result, bail};

use crate::PdfWorksError;
use std::str::FromStr;

/// One megabyte as used by every size limit (1024²).
pub const MEGABYTE: u64 = 1024 * 1024;

/// Compression level for the output PDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    /// Streams are written as they were copied.
    None,
    /// Compress uncompressed streams.
    #[default]
    Standard,
    /// Compress, then prune unreferenced objects and renumber.
    Maximum,
}

impl FromStr for CompressionLevel {
    type Err = PdfWorksError;

    /// Parse compression level from string.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not "none", "standard" or "maximum".
    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "standard" => Ok(Self::Standard),
            "maximum" => Ok(Self::Maximum),
            _ => Err(PdfWorksError::invalid_config(format!(
                "Invalid compression level: {s}. Must be one of: none, standard, maximum"
            ))),
        }
    }
}

/// Page selection such as `"1-3,5"`.
///
/// Used by the extract tool to choose which pages stay selected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRange {
    spans: Vec<(u32, u32)>,
}

impl PageRange {
    /// Parse a page range string.
    ///
    /// # Errors
    ///
    /// Returns an error for empty input, zero page numbers, reversed spans or
    /// anything that is not a number.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdfworks::config::PageRange;
    ///
    /// let range = PageRange::parse("1-3,5").unwrap();
    /// assert!(range.contains(2));
    /// assert!(!range.contains(4));
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let mut spans = Vec::new();

        for part in s.split(',').map(str::trim) {
            if part.is_empty() {
                bail!("Page range cannot contain empty entries");
            }

            let (start, end) = match part.split_once('-') {
                Some((start, end)) => {
                    if end.contains('-') {
                        bail!("Invalid page range format: {part}. Expected format like '1-5'");
                    }
                    (parse_page_number(start)?, parse_page_number(end)?)
                }
                None => {
                    let page = parse_page_number(part)?;
                    (page, page)
                }
            };

            if start > end {
                bail!("Invalid range {start}-{end}: start page must not exceed end page");
            }
            spans.push((start, end));
        }

        Ok(Self { spans })
    }

    /// Check if a 1-based page number is included.
    pub fn contains(&self, page: u32) -> bool {
        self.spans
            .iter()
            .any(|&(start, end)| page >= start && page <= end)
    }
}

fn parse_page_number(raw: &str) -> Result<u32> {
    let raw = raw.trim();
    let page: u32 = raw
        .parse()
        .with_context(|| format!("Invalid page number: {raw}"))?;
    if page == 0 {
        bail!("Page numbers must be positive (1-indexed)");
    }
    Ok(page)
}

impl FromStr for PageRange {
    type Err = PdfWorksError;

    fn from_str(s: &str) -> crate::Result<Self> {
        Ok(Self::parse(s)?)
    }
}

/// Document information written to exported PDFs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata {
    /// Document title.
    pub title: Option<String>,
    /// Document author.
    pub author: Option<String>,
    /// Document subject.
    pub subject: Option<String>,
    /// Document keywords (comma-separated).
    pub keywords: Option<String>,
}

impl Metadata {
    /// Check if any metadata fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.subject.is_none()
            && self.keywords.is_none()
    }

    /// Create metadata from optional strings; blank values become `None`.
    pub fn new(
        title: Option<String>,
        author: Option<String>,
        subject: Option<String>,
        keywords: Option<String>,
    ) -> Self {
        let clean = |opt: Option<String>| {
            opt.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };

        Self {
            title: clean(title),
            author: clean(author),
            subject: clean(subject),
            keywords: clean(keywords),
        }
    }
}

/// Admission and chunking limits for merge batches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeLimits {
    /// Fewest files a merge accepts.
    pub min_files: usize,
    /// Most files a merge accepts.
    pub max_files: usize,
    /// Largest accepted single file, in bytes.
    pub max_file_size: u64,
    /// Largest accepted batch, in bytes.
    pub max_total_size: u64,
    /// Files parsed concurrently per chunk.
    pub batch_size: usize,
}

impl Default for MergeLimits {
    fn default() -> Self {
        Self {
            min_files: 2,
            max_files: 60,
            max_file_size: 100 * MEGABYTE,
            max_total_size: 500 * MEGABYTE,
            batch_size: 5,
        }
    }
}

impl MergeLimits {
    /// Validate the limits.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `min_files` is below 2 or above `max_files`
    /// - `batch_size` is zero
    /// - a size limit is zero, or the per-file limit exceeds the total limit
    pub fn validate(&self) -> Result<()> {
        if self.min_files < 2 {
            bail!("A merge needs at least 2 files, got min_files = {}", self.min_files);
        }
        if self.min_files > self.max_files {
            bail!(
                "min_files ({}) cannot exceed max_files ({})",
                self.min_files,
                self.max_files
            );
        }
        if self.batch_size == 0 {
            bail!("Batch size must be at least 1");
        }
        if self.max_file_size == 0 || self.max_total_size == 0 {
            bail!("Size limits must be positive");
        }
        if self.max_file_size > self.max_total_size {
            bail!("Per-file limit cannot exceed the total size limit");
        }
        Ok(())
    }
}

/// Settings for single-document engine operations.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Largest document accepted by [`crate::document::load`], in bytes.
    pub max_document_size: u64,
    /// Scale used for thumbnails when the caller does not choose one.
    pub thumbnail_scale: f32,
    /// Number of thumbnails kept in the cache.
    pub cache_capacity: usize,
    /// Compression applied on export.
    pub compression: CompressionLevel,
    /// Metadata written on export.
    pub metadata: Metadata,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_document_size: 50 * MEGABYTE,
            thumbnail_scale: 0.4,
            cache_capacity: 256,
            compression: CompressionLevel::Standard,
            metadata: Metadata::default(),
        }
    }
}

impl EngineConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the document limit or cache capacity is zero, or
    /// the thumbnail scale is not a positive finite number.
    pub fn validate(&self) -> Result<()> {
        if self.max_document_size == 0 {
            bail!("Maximum document size must be positive");
        }
        if !self.thumbnail_scale.is_finite() || self.thumbnail_scale <= 0.0 {
            bail!("Invalid thumbnail scale: {}", self.thumbnail_scale);
        }
        if self.cache_capacity == 0 {
            bail!("Thumbnail cache capacity must be at least 1");
        }
        Ok(())
    }
}
