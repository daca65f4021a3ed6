//! Validated server configuration built from the command line.

use std::net::SocketAddr;
use std::str::FromStr;

use anyhow::{Context, Result};
use pdfworks::config::{CompressionLevel, MEGABYTE, MergeLimits};

use crate::cli::Cli;

/// Extra body bytes allowed on top of the upload limit for multipart framing.
pub const FRAMING_SLACK: u64 = MEGABYTE;

/// Everything the server needs to run.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: SocketAddr,
    /// Merge admission and chunking limits.
    pub limits: MergeLimits,
    /// Compression of merged output.
    pub compression: CompressionLevel,
}

impl ServerConfig {
    /// Build and validate a configuration from parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the compression level is unknown or the limits are
    /// inconsistent.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let limits = MergeLimits {
            min_files: cli.min_files,
            max_files: cli.max_files,
            max_file_size: cli
                .max_file_size_mb
                .checked_mul(MEGABYTE)
                .context("Per-file limit is too large")?,
            max_total_size: cli
                .max_total_size_mb
                .checked_mul(MEGABYTE)
                .context("Total size limit is too large")?,
            batch_size: cli.batch_size,
        };
        limits.validate().context("Invalid merge limits")?;

        let compression = CompressionLevel::from_str(&cli.compression)?;

        Ok(Self {
            bind: cli.bind,
            limits,
            compression,
        })
    }

    /// Largest request body the server reads; anything above is rejected
    /// as an oversized batch.
    pub fn body_limit(&self) -> u64 {
        self.limits.max_total_size.saturating_add(FRAMING_SLACK)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 5000)),
            limits: MergeLimits::default(),
            compression: CompressionLevel::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Result<ServerConfig> {
        let mut argv = vec!["pdfworks-server"];
        argv.extend_from_slice(args);
        ServerConfig::from_cli(&Cli::try_parse_from(argv).unwrap())
    }

    #[test]
    fn test_defaults_match_library_limits() {
        let config = parse(&[]).unwrap();
        assert_eq!(config.limits, MergeLimits::default());
        assert_eq!(config.compression, CompressionLevel::Standard);
        assert_eq!(config.body_limit(), 501 * MEGABYTE);
    }

    #[rstest]
    #[case(&["--min-files", "10", "--max-files", "5"])]
    #[case(&["--batch-size", "0"])]
    #[case(&["--max-file-size-mb", "600"])]
    fn test_inconsistent_settings_are_rejected(#[case] args: &[&str]) {
        assert!(parse(args).is_err());
    }

    #[test]
    fn test_compression_and_sizes() {
        let config = parse(&["--compression", "maximum", "--max-total-size-mb", "50", "--max-file-size-mb", "10"]).unwrap();
        assert_eq!(config.compression, CompressionLevel::Maximum);
        assert_eq!(config.limits.max_total_size, 50 * MEGABYTE);
        assert_eq!(config.limits.max_file_size, 10 * MEGABYTE);
    }
}
