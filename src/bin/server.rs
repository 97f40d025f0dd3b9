//! fileshare Server Binary
//!
//! Shares a directory over TCP until the process is stopped.

use clap::Parser;
use fileshare::{start_listening, Config, DEFAULT_PORT};
use tracing_subscriber::{fmt, EnvFilter};

/// fileshare Server
#[derive(Parser, Debug)]
#[command(name = "fileshare-server")]
#[command(about = "Share a directory for listing, upload and download over TCP")]
#[command(version)]
struct Args {
    /// Directory to share
    #[arg(short, long, default_value = ".")]
    dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value_t = format!("0.0.0.0:{}", DEFAULT_PORT))]
    listen: String,

    /// Per-connection read timeout in milliseconds (0 = none)
    #[arg(long, default_value = "30000")]
    read_timeout_ms: u64,

    /// Per-connection write timeout in milliseconds (0 = none)
    #[arg(long, default_value = "30000")]
    write_timeout_ms: u64,

    /// Largest accepted upload in MB
    #[arg(short = 'm', long, default_value = "1024")]
    max_upload_mb: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fileshare=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("fileshare server v{}", fileshare::VERSION);
    tracing::info!("Shared directory: {}", args.dir);
    tracing::info!("Listen address: {}", args.listen);

    if !std::path::Path::new(&args.dir).is_dir() {
        tracing::warn!("{} is not a directory; listings will be empty", args.dir);
    }

    // Build config from args
    let config = Config::builder()
        .shared_dir(&args.dir)
        .listen_addr(&args.listen)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .max_upload_size(upload_limit_bytes(args.max_upload_mb))
        .build();

    let handle = match start_listening(config) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = handle.join() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

/// Convert the MB limit to bytes, clamping instead of overflowing
fn upload_limit_bytes(mb: u64) -> u64 {
    mb.saturating_mul(1024 * 1024)
}
