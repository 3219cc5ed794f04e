//! Configuration for fishtank.
//!
//! Settings come from three layers, highest precedence first:
//! 1. CLI flags and their `FISHTANK_*` environment variables
//! 2. `config.kdl` (default `~/.config/fishtank/config.kdl`, or
//!    `--config` / `FISHTANK_CONFIG`)
//! 3. Built-in defaults
//!
//! See [`schema`] for the file format.

pub mod schema;

pub use schema::FishtankConfig;

use crate::{Error, Result};
use kdl::KdlDocument;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_STALE_AFTER_SECS: u64 = 30;
pub const DEFAULT_REMOVE_GRACE_POLLS: u32 = 0;
pub const DEFAULT_LOG_TAIL_LINES: u32 = 50;
pub const DEFAULT_DOCKER_BIN: &str = "docker";
pub const DEFAULT_TMUX_BIN: &str = "tmux";

/// Where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    /// CLI flag or its environment variable
    Cli,
    /// The config file
    File,
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::Cli => write!(f, "cli"),
            ValueSource::File => write!(f, "file"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub poll_interval_ms: u64,
    pub command_timeout_ms: u64,
    pub stale_after_secs: u64,
    pub remove_grace_polls: u32,
    pub log_tail_lines: u32,
    pub docker_bin: String,
    pub tmux_bin: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            command_timeout_ms: DEFAULT_COMMAND_TIMEOUT_MS,
            stale_after_secs: DEFAULT_STALE_AFTER_SECS,
            remove_grace_polls: DEFAULT_REMOVE_GRACE_POLLS,
            log_tail_lines: DEFAULT_LOG_TAIL_LINES,
            docker_bin: DEFAULT_DOCKER_BIN.to_string(),
            tmux_bin: DEFAULT_TMUX_BIN.to_string(),
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn stale_after(&self) -> Duration {
        Duration::from_secs(self.stale_after_secs)
    }

    /// Reconciler tuning derived from these settings.
    pub fn reconciler_options(&self) -> crate::reconcile::ReconcilerOptions {
        crate::reconcile::ReconcilerOptions {
            stale_after: self.stale_after(),
            remove_grace_polls: self.remove_grace_polls,
        }
    }

    /// Apply a layer on top of these settings.
    fn apply(&mut self, layer: &FishtankConfig) {
        if let Some(host) = &layer.host {
            self.host = host.clone();
        }
        if let Some(port) = layer.port {
            self.port = port;
        }
        if let Some(ms) = layer.poll_interval_ms {
            self.poll_interval_ms = ms;
        }
        if let Some(ms) = layer.command_timeout_ms {
            self.command_timeout_ms = ms;
        }
        if let Some(secs) = layer.stale_after_secs {
            self.stale_after_secs = secs;
        }
        if let Some(polls) = layer.remove_grace_polls {
            self.remove_grace_polls = polls;
        }
        if let Some(lines) = layer.log_tail_lines {
            self.log_tail_lines = lines;
        }
        if let Some(bin) = &layer.docker_bin {
            self.docker_bin = bin.clone();
        }
        if let Some(bin) = &layer.tmux_bin {
            self.tmux_bin = bin.clone();
        }
    }
}

/// Resolved settings plus where each value came from.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedConfig {
    pub settings: Settings,
    /// The config file that was consulted, if any
    pub path: Option<PathBuf>,
    /// Source of each key, by KDL key name
    pub sources: BTreeMap<String, ValueSource>,
}

/// Default location of config.kdl.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("fishtank").join("config.kdl"))
}

/// Read one config file.
pub fn load_file(path: &Path) -> Result<FishtankConfig> {
    let content = std::fs::read_to_string(path)?;
    let doc: KdlDocument = content
        .parse()
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    let config = FishtankConfig::from_kdl(&doc)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    config
        .validate()
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    Ok(config)
}

/// Resolve settings from an optional config file and CLI overrides.
///
/// An explicit `path` must exist. Without one the default location is used
/// when present and skipped otherwise.
pub fn resolve(path: Option<&Path>, overrides: &FishtankConfig) -> Result<ResolvedConfig> {
    overrides.validate().map_err(Error::Config)?;

    let (file, path) = match path {
        Some(path) => {
            if !path.exists() {
                return Err(Error::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            (load_file(path)?, Some(path.to_path_buf()))
        }
        None => match default_config_path() {
            Some(default) if default.exists() => (load_file(&default)?, Some(default)),
            _ => (FishtankConfig::default(), None),
        },
    };

    let mut layered = file.clone();
    layered.merge(overrides);
    let mut settings = Settings::default();
    settings.apply(&layered);

    let mut sources = BTreeMap::new();
    let file_keys = set_keys(&file);
    let cli_keys = set_keys(overrides);
    for key in schema::KEYS {
        let key = key.to_string();
        let source = if cli_keys.contains(&key) {
            ValueSource::Cli
        } else if file_keys.contains(&key) {
            ValueSource::File
        } else {
            ValueSource::Default
        };
        sources.insert(key, source);
    }

    tracing::debug!(?path, "resolved settings: {:?}", settings);

    Ok(ResolvedConfig {
        settings,
        path,
        sources,
    })
}

/// KDL key names set in a layer.
fn set_keys(layer: &FishtankConfig) -> Vec<String> {
    layer
        .to_kdl()
        .nodes()
        .iter()
        .map(|node| node.name().value().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.kdl");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.port, 3001);
        assert_eq!(settings.poll_interval(), Duration::from_millis(2000));
        assert_eq!(settings.command_timeout(), Duration::from_millis(5000));
        assert_eq!(settings.stale_after(), Duration::from_secs(30));
        assert_eq!(settings.log_tail_lines, 50);
        assert_eq!(settings.remove_grace_polls, 0);
    }

    #[test]
    fn test_precedence_cli_over_file_over_default() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "port 4000\npoll-interval-ms 1000\n");
        let overrides = FishtankConfig {
            port: Some(5000),
            ..FishtankConfig::default()
        };

        let resolved = resolve(Some(&path), &overrides).unwrap();

        assert_eq!(resolved.settings.port, 5000);
        assert_eq!(resolved.settings.poll_interval_ms, 1000);
        assert_eq!(resolved.settings.host, DEFAULT_HOST);
        assert_eq!(resolved.sources["port"], ValueSource::Cli);
        assert_eq!(resolved.sources["poll-interval-ms"], ValueSource::File);
        assert_eq!(resolved.sources["host"], ValueSource::Default);
        assert_eq!(resolved.sources.len(), 9);
        assert_eq!(resolved.path, Some(path));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.kdl");
        let err = resolve(Some(&path), &FishtankConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "poll-interval-ms 5\n");
        let err = resolve(Some(&path), &FishtankConfig::default()).unwrap_err();
        assert!(err.to_string().contains("poll-interval-ms"));
    }

    #[test]
    fn test_invalid_override_is_an_error() {
        let overrides = FishtankConfig {
            log_tail_lines: Some(0),
            ..FishtankConfig::default()
        };
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "");
        assert!(resolve(Some(&path), &overrides).is_err());
    }

    #[test]
    fn test_reconciler_options_follow_settings() {
        let settings = Settings {
            stale_after_secs: 5,
            remove_grace_polls: 2,
            ..Settings::default()
        };
        let options = settings.reconciler_options();
        assert_eq!(options.stale_after, Duration::from_secs(5));
        assert_eq!(options.remove_grace_polls, 2);
    }
}
