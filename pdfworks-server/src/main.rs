//! pdfworks-server - merge uploaded PDF files over HTTP.
//!
//! Serves `POST /api/pdf/merge` and `GET /health` until interrupted.

mod cli;
mod config;
mod routes;
mod server;

use clap::Parser;
use std::process;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::ServerConfig;
use crate::server::Server;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.log_filter.as_deref());

    if let Err(err) = run(cli).await {
        error!("{:#}", err);
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn init_tracing(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ServerConfig::from_cli(&cli)?;
    let server = Server::bind(&config).await?;

    info!(
        "{} v{} on http://{}",
        env!("CARGO_PKG_NAME"),
        pdfworks::VERSION,
        server.local_addr()?
    );
    info!(
        min_files = config.limits.min_files,
        max_files = config.limits.max_files,
        max_file_size = %pdfworks::error::format_megabytes(config.limits.max_file_size),
        max_total_size = %pdfworks::error::format_megabytes(config.limits.max_total_size),
        batch_size = config.limits.batch_size,
        "upload limits"
    );

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for interrupt: {}", e);
            return;
        }
        info!("interrupt received, shutting down");
        shutdown.notify_one();
    });

    server.run().await
}
