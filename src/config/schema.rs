//! KDL schema for config.kdl.
//!
//! ```kdl
//! host "127.0.0.1"
//! port 3001
//! poll-interval-ms 2000
//! command-timeout-ms 5000
//! stale-after-secs 30
//! remove-grace-polls 0
//! log-tail-lines 50
//! docker-bin "docker"
//! tmux-bin "tmux"
//! ```
//!
//! Every key is optional. Missing keys fall back to the next layer.

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

const STRING_KEYS: &[&str] = &["host", "docker-bin", "tmux-bin"];
const INTEGER_KEYS: &[&str] = &[
    "port",
    "poll-interval-ms",
    "command-timeout-ms",
    "stale-after-secs",
    "remove-grace-polls",
    "log-tail-lines",
];

/// Every recognized key, in file order.
pub const KEYS: &[&str] = &[
    "host",
    "port",
    "poll-interval-ms",
    "command-timeout-ms",
    "stale-after-secs",
    "remove-grace-polls",
    "log-tail-lines",
    "docker-bin",
    "tmux-bin",
];

/// Lowest accepted poll interval.
pub const MIN_POLL_INTERVAL_MS: u64 = 100;
/// Highest accepted log tail.
pub const MAX_LOG_TAIL_LINES: u32 = 10_000;

/// One layer of configuration. `None` means "not set here".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FishtankConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub poll_interval_ms: Option<u64>,
    pub command_timeout_ms: Option<u64>,
    pub stale_after_secs: Option<u64>,
    pub remove_grace_polls: Option<u32>,
    pub log_tail_lines: Option<u32>,
    pub docker_bin: Option<String>,
    pub tmux_bin: Option<String>,
}

impl FishtankConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), String> {
        if let Some(host) = &self.host {
            if host.trim().is_empty() {
                return Err("host must not be empty".to_string());
            }
        }
        if self.port == Some(0) {
            return Err("port must be 1-65535".to_string());
        }
        if let Some(ms) = self.poll_interval_ms {
            if ms < MIN_POLL_INTERVAL_MS {
                return Err(format!(
                    "poll-interval-ms must be at least {}, got {}",
                    MIN_POLL_INTERVAL_MS, ms
                ));
            }
        }
        if self.command_timeout_ms == Some(0) {
            return Err("command-timeout-ms must be greater than 0".to_string());
        }
        if self.stale_after_secs == Some(0) {
            return Err("stale-after-secs must be greater than 0".to_string());
        }
        if let Some(lines) = self.log_tail_lines {
            if lines == 0 || lines > MAX_LOG_TAIL_LINES {
                return Err(format!(
                    "log-tail-lines must be 1-{}, got {}",
                    MAX_LOG_TAIL_LINES, lines
                ));
            }
        }
        for (key, value) in [("docker-bin", &self.docker_bin), ("tmux-bin", &self.tmux_bin)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                return Err(format!("{} must not be empty", key));
            }
        }
        Ok(())
    }

    /// Parse a config document.
    ///
    /// Unknown keys and values of the wrong type are errors, so a typo in the
    /// file is reported instead of silently ignored.
    pub fn from_kdl(doc: &KdlDocument) -> Result<Self, String> {
        let mut config = Self::new();

        for node in doc.nodes() {
            let key = node.name().value();
            if !STRING_KEYS.contains(&key) && !INTEGER_KEYS.contains(&key) {
                return Err(format!("unknown key '{}'", key));
            }
            let Some(entry) = node.entries().first() else {
                return Err(format!("'{}' needs a value", key));
            };
            let value = entry.value();

            if STRING_KEYS.contains(&key) {
                let s = value
                    .as_string()
                    .ok_or_else(|| format!("'{}' must be a string", key))?
                    .to_string();
                match key {
                    "host" => config.host = Some(s),
                    "docker-bin" => config.docker_bin = Some(s),
                    _ => config.tmux_bin = Some(s),
                }
                continue;
            }

            let i = value
                .as_integer()
                .ok_or_else(|| format!("'{}' must be an integer", key))?;
            let out_of_range = || format!("'{}' is out of range: {}", key, i);
            match key {
                "port" => config.port = Some(u16::try_from(i).map_err(|_| out_of_range())?),
                "poll-interval-ms" => {
                    config.poll_interval_ms = Some(u64::try_from(i).map_err(|_| out_of_range())?)
                }
                "command-timeout-ms" => {
                    config.command_timeout_ms = Some(u64::try_from(i).map_err(|_| out_of_range())?)
                }
                "stale-after-secs" => {
                    config.stale_after_secs = Some(u64::try_from(i).map_err(|_| out_of_range())?)
                }
                "remove-grace-polls" => {
                    config.remove_grace_polls = Some(u32::try_from(i).map_err(|_| out_of_range())?)
                }
                _ => config.log_tail_lines = Some(u32::try_from(i).map_err(|_| out_of_range())?),
            }
        }

        Ok(config)
    }

    /// Convert to a KDL document. Unset keys are left out.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        let strings = [
            ("host", &self.host),
            ("docker-bin", &self.docker_bin),
            ("tmux-bin", &self.tmux_bin),
        ];
        let integers = [
            ("port", self.port.map(i128::from)),
            ("poll-interval-ms", self.poll_interval_ms.map(i128::from)),
            ("command-timeout-ms", self.command_timeout_ms.map(i128::from)),
            ("stale-after-secs", self.stale_after_secs.map(i128::from)),
            ("remove-grace-polls", self.remove_grace_polls.map(i128::from)),
            ("log-tail-lines", self.log_tail_lines.map(i128::from)),
        ];

        for (key, value) in strings {
            if let Some(value) = value {
                let mut node = KdlNode::new(key);
                node.push(KdlEntry::new(KdlValue::String(value.clone())));
                doc.nodes_mut().push(node);
            }
        }
        for (key, value) in integers {
            if let Some(value) = value {
                let mut node = KdlNode::new(key);
                node.push(KdlEntry::new(KdlValue::Integer(value)));
                doc.nodes_mut().push(node);
            }
        }

        doc
    }

    /// Overlay `other` on top of `self`; set values in `other` win.
    pub fn merge(&mut self, other: &FishtankConfig) {
        if other.host.is_some() {
            self.host = other.host.clone();
        }
        if other.port.is_some() {
            self.port = other.port;
        }
        if other.poll_interval_ms.is_some() {
            self.poll_interval_ms = other.poll_interval_ms;
        }
        if other.command_timeout_ms.is_some() {
            self.command_timeout_ms = other.command_timeout_ms;
        }
        if other.stale_after_secs.is_some() {
            self.stale_after_secs = other.stale_after_secs;
        }
        if other.remove_grace_polls.is_some() {
            self.remove_grace_polls = other.remove_grace_polls;
        }
        if other.log_tail_lines.is_some() {
            self.log_tail_lines = other.log_tail_lines;
        }
        if other.docker_bin.is_some() {
            self.docker_bin = other.docker_bin.clone();
        }
        if other.tmux_bin.is_some() {
            self.tmux_bin = other.tmux_bin.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<FishtankConfig, String> {
        let doc: KdlDocument = text.parse().map_err(|e| format!("{:?}", e))?;
        FishtankConfig::from_kdl(&doc)
    }

    #[test]
    fn test_parse_all_keys() {
        let config = parse(
            r#"
            host "0.0.0.0"
            port 8080
            poll-interval-ms 500
            command-timeout-ms 1000
            stale-after-secs 60
            remove-grace-polls 2
            log-tail-lines 100
            docker-bin "podman"
            tmux-bin "/usr/local/bin/tmux"
            "#,
        )
        .unwrap();

        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.port, Some(8080));
        assert_eq!(config.poll_interval_ms, Some(500));
        assert_eq!(config.command_timeout_ms, Some(1000));
        assert_eq!(config.stale_after_secs, Some(60));
        assert_eq!(config.remove_grace_polls, Some(2));
        assert_eq!(config.log_tail_lines, Some(100));
        assert_eq!(config.docker_bin.as_deref(), Some("podman"));
        assert_eq!(config.tmux_bin.as_deref(), Some("/usr/local/bin/tmux"));
    }

    #[test]
    fn test_empty_document_sets_nothing() {
        assert_eq!(parse("").unwrap(), FishtankConfig::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = parse("prot 3001").unwrap_err();
        assert!(err.contains("unknown key 'prot'"));
    }

    #[test]
    fn test_wrong_type_is_rejected() {
        assert!(parse(r#"port "3001""#).unwrap_err().contains("integer"));
        assert!(parse("host 1").unwrap_err().contains("string"));
    }

    #[test]
    fn test_out_of_range_port() {
        assert!(parse("port 70000").unwrap_err().contains("out of range"));
        assert!(parse("port -1").unwrap_err().contains("out of range"));
    }

    #[test]
    fn test_validate() {
        let mut config = FishtankConfig::new();
        assert!(config.validate().is_ok());

        config.poll_interval_ms = Some(10);
        assert!(config.validate().is_err());

        config.poll_interval_ms = Some(2000);
        config.log_tail_lines = Some(0);
        assert!(config.validate().is_err());

        config.log_tail_lines = Some(50);
        config.port = Some(0);
        assert!(config.validate().is_err());

        config.port = Some(3001);
        config.docker_bin = Some(" ".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_to_kdl_parses_back() {
        let config = FishtankConfig {
            port: Some(4000),
            tmux_bin: Some("tmux3".to_string()),
            ..FishtankConfig::default()
        };

        let text = config.to_kdl().to_string();
        assert!(text.contains("port 4000"));
        assert_eq!(parse(&text).unwrap(), config);
    }

    #[test]
    fn test_merge_prefers_set_values() {
        let mut base = FishtankConfig {
            port: Some(3001),
            host: Some("127.0.0.1".to_string()),
            ..FishtankConfig::default()
        };
        let overlay = FishtankConfig {
            port: Some(9000),
            ..FishtankConfig::default()
        };

        base.merge(&overlay);

        assert_eq!(base.port, Some(9000));
        assert_eq!(base.host.as_deref(), Some("127.0.0.1"));
    }
}
