//! Common test utilities for fishtank integration tests.
//!
//! Provides `TestEnv` for isolated runs that never read the user's
//! `~/.config/fishtank/config.kdl` and never touch the real docker or tmux.

#![allow(dead_code)]

use assert_cmd::Command;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// Binary names that cannot exist on any host.
pub const MISSING_DOCKER: &str = "fishtank-test-no-such-docker";
pub const MISSING_TMUX: &str = "fishtank-test-no-such-tmux";

/// A test environment with an isolated config directory.
///
/// `fishtank()` points `XDG_CONFIG_HOME` and `HOME` at a temp directory and
/// swaps docker and tmux for binaries that do not exist, so every command
/// sees an empty host unless a test says otherwise.
pub struct TestEnv {
    pub home_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            home_dir: TempDir::new().unwrap(),
        }
    }

    /// A Command for the fishtank binary with an isolated environment.
    pub fn fishtank(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_fishtank"));
        cmd.current_dir(self.home_dir.path());
        cmd.env("HOME", self.home_dir.path());
        cmd.env("XDG_CONFIG_HOME", self.config_home());
        cmd.env("FISHTANK_DOCKER_BIN", MISSING_DOCKER);
        cmd.env("FISHTANK_TMUX_BIN", MISSING_TMUX);
        for var in [
            "FISHTANK_CONFIG",
            "FISHTANK_HOST",
            "FISHTANK_PORT",
            "FISHTANK_POLL_INTERVAL_MS",
            "FISHTANK_COMMAND_TIMEOUT_MS",
            "FISHTANK_STALE_AFTER_SECS",
            "FISHTANK_REMOVE_GRACE_POLLS",
            "FISHTANK_LOG_TAIL_LINES",
            "RUST_LOG",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }

    pub fn config_home(&self) -> PathBuf {
        self.home_dir.path().join(".config")
    }

    /// Where fishtank looks for its config by default.
    pub fn default_config_path(&self) -> PathBuf {
        self.config_home().join("fishtank").join("config.kdl")
    }

    /// Write the default config file.
    pub fn write_config(&self, content: &str) -> PathBuf {
        let path = self.default_config_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a config file somewhere else.
    pub fn write_config_at(&self, name: &str, content: &str) -> PathBuf {
        let path = self.home_dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn path(&self) -> &Path {
        self.home_dir.path()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn parse_json(stdout: &[u8]) -> serde_json::Value {
    serde_json::from_slice(stdout).unwrap()
}

/// Install an executable shell script named `name` in the test home and
/// return its path. Used to stand in for docker and tmux.
#[cfg(unix)]
pub fn fake_tool(env: &TestEnv, name: &str, script: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = env.path().join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}", script)).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// A fake docker with one running, healthy container.
pub const FAKE_DOCKER: &str = r#"case "$1" in
  ps)
    echo '{"id":"abcdef123456","name":"api","status":"Up 5 minutes (healthy)","image":"api:dev","state":"running","ports":"0.0.0.0:8080->80/tcp, 443/tcp","created":"","size":"1kB"}'
    echo '{bad'
    ;;
  inspect) echo 'abcdef123456789|healthy|2' ;;
  stats) echo '{"id":"abcdef123456","cpu":"3.5%","mem":"1.25%","netio":"1kB / 2kB","blockio":""}' ;;
  logs) echo "log line for $4"; echo "warning on stderr" >&2 ;;
  stop) echo "$2" ;;
  *) echo "unknown command $1" >&2; exit 1 ;;
esac
"#;

/// A fake tmux with one session and one pane.
pub const FAKE_TMUX: &str = r#"case "$1" in
  list-sessions) echo 'work|1|1700000000|1700000000|2' ;;
  list-panes) echo 'work|%0|bash|1|42|/tmp|80|24|0|main' ;;
  capture-pane) echo "captured $4" ;;
  kill-pane) exit 0 ;;
  kill-session) echo "can't find session: $3" >&2; exit 1 ;;
  *) exit 1 ;;
esac
"#;
