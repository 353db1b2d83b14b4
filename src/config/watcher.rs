//! Config file hot reload.
//!
//! The parent directory is watched rather than the file itself: editors that
//! save by writing a new file and renaming it over the old one would otherwise
//! silently end the watch. A single save usually fires several events, so a
//! reload is only forwarded when the parsed config differs from the last one.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::CatcherConfig;

/// Forwards validated, changed configs read from one file.
pub struct ConfigWatcher {
    path: PathBuf,
    filter: ReloadFilter,
    update_tx: mpsc::UnboundedSender<CatcherConfig>,
}

impl ConfigWatcher {
    /// Watch `path`, treating `current` as the config already in effect.
    pub fn new(path: &Path, current: CatcherConfig) -> (Self, mpsc::UnboundedReceiver<CatcherConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            filter: ReloadFilter::new(current),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Start watching; dropping the returned handle stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self {
            path,
            mut filter,
            update_tx,
        } = self;

        let file_name = path.file_name().map(OsString::from).unwrap_or_default();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let reload_path = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, &file_name) => {
                    if let Some(config) = filter.apply(load_config(&reload_path)) {
                        tracing::info!(path = %reload_path.display(), "Config reloaded");
                        let _ = update_tx.send(config);
                    }
                }
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %path.display(), "Config watcher started");
        Ok(watcher)
    }
}

/// Whether a directory event concerns the watched file.
fn touches(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name().is_some_and(|name| name == file_name.as_os_str()))
}

/// Drops reloads that fail or change nothing.
struct ReloadFilter {
    last: CatcherConfig,
}

impl ReloadFilter {
    fn new(current: CatcherConfig) -> Self {
        Self { last: current }
    }

    fn apply(&mut self, loaded: Result<CatcherConfig, ConfigError>) -> Option<CatcherConfig> {
        match loaded {
            Ok(config) if config == self.last => None,
            Ok(config) => {
                self.last = config.clone();
                Some(config)
            }
            Err(e) => {
                tracing::error!(error = %e, "Config reload failed, keeping current configuration");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;
    use notify::event::{CreateKind, ModifyKind, RemoveKind};

    #[test]
    fn unchanged_or_invalid_reloads_are_dropped() {
        let mut filter = ReloadFilter::new(CatcherConfig::default());

        assert!(filter.apply(Ok(CatcherConfig::default())).is_none());
        assert!(filter.apply(parse_config("[capture]\npreview_bytes = 0\n")).is_none());

        let rotated = parse_config("[viewer]\npassword = \"rotated\"\n").unwrap();
        assert_eq!(filter.apply(Ok(rotated.clone())), Some(rotated.clone()));
        assert!(filter.apply(Ok(rotated)).is_none());
    }

    #[test]
    fn only_events_for_the_config_file_count() {
        let name = OsString::from("catcher.toml");
        let event = |kind, path: &str| Event::new(kind).add_path(PathBuf::from(path));

        assert!(touches(&event(EventKind::Modify(ModifyKind::Any), "/etc/catcher.toml"), &name));
        assert!(touches(&event(EventKind::Create(CreateKind::File), "./catcher.toml"), &name));
        assert!(!touches(&event(EventKind::Modify(ModifyKind::Any), "/etc/other.toml"), &name));
        assert!(!touches(&event(EventKind::Remove(RemoveKind::File), "/etc/catcher.toml"), &name));
    }
}
