//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::CatcherConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<CatcherConfig, ConfigError> {
    let config: CatcherConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<CatcherConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        assert_eq!(parse_config("").unwrap(), CatcherConfig::default());
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = parse_config(
            r#"
            [storage]
            uploads_dir = "/var/lib/catcher/uploads"

            [viewer]
            username = "ops"
            password = "hunter2"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.uploads_dir, "/var/lib/catcher/uploads");
        assert_eq!(config.storage.database_path, "data.db");
        assert_eq!(config.viewer.username, "ops");
        assert_eq!(config.viewer.realm, "http-catcher");
        assert_eq!(config.capture.preview_bytes, 500);
    }

    #[test]
    fn syntax_and_semantic_errors_are_distinguished() {
        assert!(matches!(parse_config("[listener"), Err(ConfigError::Parse(_))));

        let err = parse_config("[capture]\ntext_threshold = 2.0\n").unwrap_err();
        match err {
            ConfigError::Validation(errors) => assert_eq!(errors[0].field, "capture.text_threshold"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catcher.toml");
        fs::write(&path, "[listener]\nbind_address = \"127.0.0.1:5050\"\n").unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:5050");

        assert!(matches!(
            load_config(&dir.path().join("missing.toml")),
            Err(ConfigError::Io(_))
        ));
    }
}
