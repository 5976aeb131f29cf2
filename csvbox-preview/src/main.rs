//! CSVBox importer preview server
//!
//! Serves a host page that embeds the importer exactly as configured, plus a
//! JSON description of the embed, so a license key and its options can be
//! tried without wiring up an application.
//!
//! Usage:
//!   csvbox-preview --config importer.toml --port 8080
//!   csvbox-preview --license-key abc123

use anyhow::{Context, Result, bail};
use clap::Parser;
use csvbox_embed::EmbedConfig;
use csvbox_preview::{EmbedDescriptor, build_router};
use std::{path::PathBuf, sync::Arc};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "csvbox-preview")]
#[command(about = "Local preview server for a CSVBox importer embed")]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// TOML file with an [importer] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// License key, when no config file is given
    #[arg(short, long)]
    license_key: Option<String>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<EmbedConfig> {
    match (&args.config, &args.license_key) {
        (Some(path), _) => EmbedConfig::load_from(path)
            .with_context(|| format!("failed to load importer config from {}", path.display())),
        (None, Some(key)) => Ok(EmbedConfig::new(key.clone())),
        (None, None) => bail!("either --config or --license-key is required"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let config = load_config(&args)?;
    let descriptor = EmbedDescriptor::from_config(config).context("importer config rejected")?;
    info!(url = %descriptor.url, token = %descriptor.token, "Importer embed prepared");

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    println!("\n========================================");
    println!("  CSVBox Importer Preview");
    println!("========================================");
    println!("  Page:     http://{addr}/");
    println!("  API:      http://{addr}/api/v1/embed");
    println!("  Importer: {}", descriptor.url);
    println!("========================================\n");

    let app = build_router(Arc::new(descriptor));
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
