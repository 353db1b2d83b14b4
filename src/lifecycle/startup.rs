//! Startup orchestration.
//!
//! # Responsibilities
//! - Create the uploads and static directories
//! - Open the content store and the log repository
//! - Download missing UI assets into the static directory
//!
//! # Design Decisions
//! - Storage errors are fatal: nothing could be captured
//! - Asset downloads are best-effort; the viewer degrades without them

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::capture::{Classifier, ContentStore, Ingestor, StoreError};
use crate::config::CatcherConfig;
use crate::storage::{LogRepository, RepositoryError};

/// Error type for startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create directory {path}: {source}")]
    Directory { path: PathBuf, source: io::Error },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to open log repository: {0}")]
    Repository(#[from] RepositoryError),
}

fn create_dir(path: &Path) -> Result<(), StartupError> {
    fs::create_dir_all(path).map_err(|source| StartupError::Directory {
        path: path.to_path_buf(),
        source,
    })
}

/// Create every directory the service writes to.
pub fn prepare_directories(config: &CatcherConfig) -> Result<(), StartupError> {
    create_dir(Path::new(&config.storage.uploads_dir))?;
    create_dir(Path::new(&config.storage.static_dir))?;
    if let Some(parent) = Path::new(&config.storage.database_path).parent() {
        if !parent.as_os_str().is_empty() {
            create_dir(parent)?;
        }
    }
    Ok(())
}

/// Open the store and repository and assemble the ingestion pipeline.
pub fn open_ingestor(config: &CatcherConfig) -> Result<Ingestor, StartupError> {
    prepare_directories(config)?;

    let store = ContentStore::open(&config.storage.uploads_dir)?;
    let repository = Arc::new(LogRepository::open(Path::new(&config.storage.database_path))?);
    let classifier = Classifier::new(config.capture.preview_bytes, config.capture.text_threshold);

    tracing::info!(
        uploads_dir = %config.storage.uploads_dir,
        database = %config.storage.database_path,
        "Storage ready"
    );
    Ok(Ingestor::new(store, classifier, repository))
}

/// Local file names and source URLs of the viewer's UI assets.
pub fn static_assets(config: &CatcherConfig) -> [(&'static str, &str); 3] {
    let assets = &config.static_assets;
    [
        ("jquery.min.js", assets.jquery_url.as_str()),
        ("datatables.min.js", assets.datatables_js_url.as_str()),
        ("datatables.min.css", assets.datatables_css_url.as_str()),
    ]
}

/// Download any UI asset missing from the static directory.
///
/// Failures are logged; the service keeps running without them.
pub async fn fetch_static_assets(config: &CatcherConfig) {
    if !config.static_assets.fetch_missing {
        return;
    }

    let static_dir = Path::new(&config.storage.static_dir);
    let missing: Vec<_> = static_assets(config)
        .into_iter()
        .filter(|(name, _)| !static_dir.join(name).exists())
        .collect();
    if missing.is_empty() {
        return;
    }

    let client = match reqwest::Client::builder()
        .timeout(Duration::from_secs(config.static_assets.timeout_secs))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Cannot build HTTP client for static assets");
            return;
        }
    };

    tracing::info!(count = missing.len(), "Downloading viewer assets");
    for (name, url) in missing {
        match download(&client, url, &static_dir.join(name)).await {
            Ok(bytes) => tracing::info!(file = name, bytes, "Static asset saved"),
            Err(e) => tracing::warn!(file = name, url = url, error = %e, "Static asset download failed"),
        }
    }
}

async fn download(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    let bytes = client.get(url).send().await?.error_for_status()?.bytes().await?;
    tokio::fs::write(dest, &bytes).await?;
    Ok(bytes.len())
}
