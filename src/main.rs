//! HTTP traffic capture sink.
//!
//! Records every inbound request (any method, any path) for later inspection.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ http::server (axum router, request ID, limits)
//!                         │
//!                         ├─ /logs ───────▶ storage::LogRepository::list
//!                         ├─ /view ───────▶ viewer (Basic auth + table page)
//!                         ├─ /static, /uploads ──▶ files on disk
//!                         │
//!                         ▼ everything else
//!                     http::request (CapturedRequest: files, fields, raw body)
//!                         │
//!                         ▼
//!                     capture::pipeline
//!                         ├─ capture::store     (SHA-256 content-addressed files)
//!                         ├─ capture::classify  (text / image / binary)
//!                         └─ storage::LogRepository::append_all (SQLite)
//!                         │
//!     ◀───────────────────┘ {"message": "Captured"}
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use http_catcher::config::watcher::ConfigWatcher;
use http_catcher::config::{load_config, CatcherConfig};
use http_catcher::lifecycle::startup::fetch_static_assets;
use http_catcher::observability::{logging, metrics};
use http_catcher::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "http-catcher")]
#[command(about = "Capture and inspect arbitrary HTTP requests", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let file_config = match &args.config {
        Some(path) => load_config(path)?,
        None => CatcherConfig::default(),
    };
    let mut config = file_config.clone();
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("http-catcher v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        uploads_dir = %config.storage.uploads_dir,
        database = %config.storage.database_path,
        viewer_enabled = config.viewer.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Hot reload is only available when running from a file.
    let (_watcher, config_updates) = match &args.config {
        Some(path) => watch_config(path, file_config),
        None => (None, mpsc::unbounded_channel().1),
    };

    let server = HttpServer::new(config.clone())?;
    fetch_static_assets(&config).await;

    let shutdown = Shutdown::new();
    let addr: SocketAddr = config.listener.bind_address.parse()?;

    match &config.listener.tls {
        Some(tls) => {
            server
                .run_tls(
                    addr,
                    Path::new(&tls.cert_path),
                    Path::new(&tls.key_path),
                    config_updates,
                    shutdown.subscribe(),
                )
                .await?;
        }
        None => {
            let listener = TcpListener::bind(addr).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, config_updates, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

fn watch_config(
    path: &Path,
    current: CatcherConfig,
) -> (
    Option<notify::RecommendedWatcher>,
    mpsc::UnboundedReceiver<CatcherConfig>,
) {
    let (watcher, updates) = ConfigWatcher::new(path, current);
    match watcher.run() {
        Ok(handle) => (Some(handle), updates),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            (None, mpsc::unbounded_channel().1)
        }
    }
}
