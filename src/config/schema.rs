//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the catcher.
//! All types derive Serde traits for deserialization from config files, and
//! every section has defaults so an empty file is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::capture::classify::{DEFAULT_PREVIEW_BYTES, DEFAULT_TEXT_THRESHOLD};

/// Root configuration for the capture service.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct CatcherConfig {
    /// Listener configuration (bind address, body limit, TLS).
    pub listener: ListenerConfig,

    /// Where records and uploaded payloads are kept.
    pub storage: StorageConfig,

    /// Payload classification settings.
    pub capture: CaptureConfig,

    /// Credential check for the `/view` page.
    pub viewer: ViewerConfig,

    /// Third-party UI assets fetched at startup.
    pub static_assets: StaticAssetsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Largest accepted request body in bytes.
    pub max_body_size: usize,

    /// Request timeout (whole request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            max_body_size: 64 * 1024 * 1024,
            request_timeout_secs: 60,
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Persistent state locations.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file holding the log table.
    pub database_path: String,

    /// Flat directory of content-addressed payloads.
    pub uploads_dir: String,

    /// Directory served under `/static`.
    pub static_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "data.db".to_string(),
            uploads_dir: "uploads".to_string(),
            static_dir: "static".to_string(),
        }
    }
}

/// Classification settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    /// Leading bytes sampled for text detection and kept as preview.
    pub preview_bytes: usize,

    /// Printable fraction a sample must exceed to count as text.
    pub text_threshold: f64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preview_bytes: DEFAULT_PREVIEW_BYTES,
            text_threshold: DEFAULT_TEXT_THRESHOLD,
        }
    }
}

/// Viewer page access.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ViewerConfig {
    /// Serve `/view` at all.
    pub enabled: bool,

    /// HTTP Basic username.
    pub username: String,

    /// HTTP Basic password.
    pub password: String,

    /// Realm announced in `WWW-Authenticate`.
    pub realm: String,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            username: "admin".to_string(),
            // WARNING: This is a placeholder! Change this in production.
            password: "CHANGE_ME".to_string(),
            realm: "http-catcher".to_string(),
        }
    }
}

/// UI assets downloaded into the static directory when missing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StaticAssetsConfig {
    /// Download missing assets at startup.
    pub fetch_missing: bool,

    pub jquery_url: String,
    pub datatables_js_url: String,
    pub datatables_css_url: String,

    /// Download timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StaticAssetsConfig {
    fn default() -> Self {
        Self {
            fetch_missing: true,
            jquery_url: "https://code.jquery.com/jquery-3.7.1.min.js".to_string(),
            datatables_js_url: "https://cdn.datatables.net/2.2.2/js/dataTables.min.js".to_string(),
            datatables_css_url: "https://cdn.datatables.net/2.2.2/css/dataTables.dataTables.min.css"
                .to_string(),
            timeout_secs: 15,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
