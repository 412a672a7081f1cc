//! Conversion server binary
//!
//! Run with: cargo run -p pdf-convert --bin pdf-convert-server -- --port 5000

use clap::Parser;
use pdf_convert::{config::CONFIG_PATH_ENV, ConverterConfig, ConverterServer};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pdf-convert-server", version, about = "PDF to DOCX/CSV/XLSX conversion service")]
struct Args {
    /// TOML configuration file
    #[arg(long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,

    /// Bind address, overrides the configuration
    #[arg(long)]
    host: Option<String>,

    /// Port, overrides the configuration
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_convert=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let mut config = ConverterConfig::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Configuration loaded");
    tracing::info!("  - Deployment: {:?}", config.extraction.deployment);
    tracing::info!("  - Uploads: {}", config.storage.uploads_dir.display());
    tracing::info!("  - Converted: {}", config.storage.converted_dir.display());
    tracing::info!("  - Job timeout: {}s", config.conversion.timeout_secs);
    tracing::info!("  - Max upload: {} bytes", config.server.max_upload_size);

    let server = ConverterServer::new(config)?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("\nEndpoints:");
    println!("  POST /convert               - Convert a PDF (file, format=docx|csv|xlsx)");
    println!("  GET  /download/:name        - Download a converted file");
    println!("  GET  /preview_output/:name  - Preview a converted file");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
