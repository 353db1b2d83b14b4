//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use http_catcher::{CatcherConfig, HttpServer, Shutdown};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

pub const VIEWER_USER: &str = "admin";
pub const VIEWER_PASSWORD: &str = "test-password";

/// A catcher running on a loopback port with its own data directory.
pub struct TestCatcher {
    pub base_url: String,
    pub dir: TempDir,
    shutdown: Shutdown,
}

impl TestCatcher {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn uploads_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("uploads")
    }

    /// Fetch `/logs` as JSON records.
    pub async fn logs(&self) -> Vec<serde_json::Value> {
        reqwest::get(self.url("/logs")).await.unwrap().json().await.unwrap()
    }
}

impl Drop for TestCatcher {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub fn test_config(dir: &Path) -> CatcherConfig {
    let mut config = CatcherConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.storage.database_path = dir.join("data.db").to_string_lossy().into_owned();
    config.storage.uploads_dir = dir.join("uploads").to_string_lossy().into_owned();
    config.storage.static_dir = dir.join("static").to_string_lossy().into_owned();
    config.viewer.username = VIEWER_USER.into();
    config.viewer.password = VIEWER_PASSWORD.into();
    config.static_assets.fetch_missing = false;
    config
}

/// Start a catcher on an ephemeral port.
pub async fn start_catcher() -> TestCatcher {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let server = HttpServer::new(config).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();
    let (_updates_tx, updates_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let _ = server.run(listener, updates_rx, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestCatcher {
        base_url: format!("http://{}", addr),
        dir,
        shutdown,
    }
}
