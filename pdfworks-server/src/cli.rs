//! Command-line interface of the merge server.
//!
//! Every option can also be given through a `PDFWORKS_*` environment
//! variable. This file is shared with the build script, so it depends on
//! `clap` and `std` only.

use clap::Parser;
use std::net::SocketAddr;

/// HTTP server merging uploaded PDF files.
///
/// Accepts `multipart/form-data` uploads on `POST /api/pdf/merge` and
/// answers with a single merged PDF. Files that cannot be parsed are skipped
/// and reported in the response headers and logs.
#[derive(Parser, Debug, Clone)]
#[command(name = "pdfworks-server")]
#[command(version)]
#[command(about = "HTTP server merging uploaded PDF files", long_about = None)]
#[command(author)]
pub struct Cli {
    /// Address to listen on
    #[arg(short, long, value_name = "ADDR", env = "PDFWORKS_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Fewest files a merge accepts
    #[arg(long, value_name = "N", env = "PDFWORKS_MIN_FILES", default_value_t = 2)]
    pub min_files: usize,

    /// Most files a merge accepts
    #[arg(long, value_name = "N", env = "PDFWORKS_MAX_FILES", default_value_t = 60)]
    pub max_files: usize,

    /// Largest accepted single file, in megabytes
    #[arg(long, value_name = "MB", env = "PDFWORKS_MAX_FILE_SIZE_MB", default_value_t = 100)]
    pub max_file_size_mb: u64,

    /// Largest accepted request total, in megabytes
    #[arg(long, value_name = "MB", env = "PDFWORKS_MAX_TOTAL_SIZE_MB", default_value_t = 500)]
    pub max_total_size_mb: u64,

    /// Files parsed concurrently per chunk
    ///
    /// Chunks are processed one after another; all files of a chunk are
    /// parsed in parallel.
    #[arg(long, value_name = "N", env = "PDFWORKS_BATCH_SIZE", default_value_t = 5)]
    pub batch_size: usize,

    /// Compression level for merged output
    ///
    /// - none: streams are written as copied
    /// - standard: compress uncompressed streams (default)
    /// - maximum: compress and drop unreferenced objects
    #[arg(short, long, value_name = "LEVEL", env = "PDFWORKS_COMPRESSION", default_value = "standard")]
    #[arg(value_parser = ["none", "standard", "maximum"])]
    pub compression: String,

    /// Log filter, e.g. "info" or "pdfworks=debug"
    ///
    /// Overrides RUST_LOG. Defaults to "info" when neither is set.
    #[arg(long, value_name = "FILTER", env = "PDFWORKS_LOG")]
    pub log_filter: Option<String>,
}
