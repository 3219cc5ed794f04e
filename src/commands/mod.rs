//! Command implementations for the fishtank CLI and HTTP API.
//!
//! The on-demand actions (`logs`, `kill`) live here so the server handlers
//! and the CLI share them. Each command result implements
//! [`CommandResult`] so the binary can print it as JSON or for humans.

use crate::config::{ResolvedConfig, Settings};
use crate::container;
use crate::models::{EntityKind, Snapshot};
use crate::server::protocol::{KillRequest, KillResponse, LogsResponse, ServerMessage};
use crate::snapshot::Collector;
use crate::tmux::command::TmuxCommand;
use crate::{Error, Result};
use serde::Serialize;
use std::path::PathBuf;

/// Error text for a kind the server does not know.
pub const UNKNOWN_TYPE: &str = "Unknown process type";

/// Command results that can be serialized to JSON or formatted for humans.
pub trait CommandResult {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn parse_kind(kind: &str) -> Result<EntityKind> {
    EntityKind::parse(kind).ok_or_else(|| Error::InvalidInput(UNKNOWN_TYPE.to_string()))
}

/// The raw identifier behind an entity id, safe to pass as a CLI argument.
fn raw_target(kind: EntityKind, id: &str) -> Result<String> {
    let raw = kind
        .raw_id(id)
        .ok_or_else(|| Error::InvalidInput(format!("'{}' is not a {} id", id, kind)))?;
    check_target(raw)
}

fn check_target(raw: &str) -> Result<String> {
    if raw.is_empty() || raw.starts_with('-') {
        return Err(Error::InvalidInput(format!("invalid target '{}'", raw)));
    }
    Ok(raw.to_string())
}

// === Logs ===

/// Fetch the last `tail` lines of output for an entity.
///
/// - container: `docker logs --tail N`, stdout and stderr together
/// - pane: `tmux capture-pane` of that pane
/// - session: `tmux capture-pane` of the session's active pane
pub async fn fetch_logs(
    collector: &Collector,
    kind: EntityKind,
    id: &str,
    tail: u32,
) -> Result<String> {
    let raw = raw_target(kind, id)?;
    let runner = collector.runner();

    match kind {
        EntityKind::DockerContainer => {
            let args = container::logs_args(&raw, tail);
            let output = runner.output(collector.docker_bin(), &args).await?;
            Ok(output.combined())
        }
        EntityKind::TmuxPane => {
            let args = TmuxCommand::capture_pane(&raw, tail).into_args();
            runner.run(collector.tmux_bin(), &args).await
        }
        EntityKind::TmuxSession => {
            let target = format!("={}:", raw);
            let args = TmuxCommand::capture_pane(&target, tail).into_args();
            runner.run(collector.tmux_bin(), &args).await
        }
    }
}

/// Answer a logs request. Failures become an error payload.
pub async fn logs(collector: &Collector, id: &str, kind: &str, tail: u32) -> LogsResponse {
    let result = match parse_kind(kind) {
        Ok(kind) => fetch_logs(collector, kind, id, tail).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(logs) => LogsResponse::ok(logs),
        Err(e) => {
            tracing::warn!(id, kind, "logs request failed: {}", e);
            LogsResponse::failed(action_error(&e))
        }
    }
}

impl CommandResult for LogsResponse {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        match &self.error {
            Some(error) => format!("Error: {}", error),
            None => self.logs.trim_end().to_string(),
        }
    }
}

// === Kill ===

/// Stop a container, kill a pane or kill a session. Returns the
/// confirmation message.
pub async fn kill_process(collector: &Collector, req: &KillRequest) -> Result<String> {
    let kind = parse_kind(&req.kind)?;
    let runner = collector.runner();

    match kind {
        EntityKind::DockerContainer => {
            let raw = raw_target(kind, &req.id)?;
            runner
                .run(collector.docker_bin(), &container::stop_args(&raw))
                .await?;
            let name = if req.name.is_empty() { &raw } else { &req.name };
            Ok(format!("Stopped container {}", name))
        }
        EntityKind::TmuxPane => {
            let pane_id = match req.pane_id.as_deref().filter(|p| !p.is_empty()) {
                Some(pane_id) => check_target(pane_id)?,
                None => raw_target(kind, &req.id)?,
            };
            let args = TmuxCommand::kill_pane(&pane_id).into_args();
            runner.run(collector.tmux_bin(), &args).await?;
            Ok(format!("Killed pane {}", pane_id))
        }
        EntityKind::TmuxSession => {
            let name = match kind.raw_id(&req.id) {
                Some(raw) => check_target(raw)?,
                None => check_target(&req.name)?,
            };
            let args = TmuxCommand::kill_session(&name).into_args();
            runner.run(collector.tmux_bin(), &args).await?;
            Ok(format!("Killed session {}", name))
        }
    }
}

/// Answer a kill request. Failures become an error payload.
pub async fn kill(collector: &Collector, req: &KillRequest) -> KillResponse {
    match kill_process(collector, req).await {
        Ok(message) => {
            tracing::info!(id = %req.id, "{}", message);
            KillResponse::done(message)
        }
        Err(e) => {
            tracing::warn!(id = %req.id, kind = %req.kind, "kill request failed: {}", e);
            KillResponse::failed(action_error(&e))
        }
    }
}

impl CommandResult for KillResponse {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        match self {
            KillResponse::Done { message, .. } => message.clone(),
            KillResponse::Failed { error } => format!("Error: {}", error),
        }
    }
}

/// Message for an action error payload. Invalid input reads without the
/// `Invalid input:` prefix.
fn action_error(err: &Error) -> String {
    match err {
        Error::InvalidInput(msg) => msg.clone(),
        other => other.to_string(),
    }
}

// === Snapshot ===

impl CommandResult for Snapshot {
    fn to_json(&self) -> String {
        ServerMessage::Processes(self.clone())
            .to_json()
            .unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("tmux sessions ({})", self.tmux.sessions.len()));
        for s in &self.tmux.sessions {
            lines.push(format!(
                "  {}  {}  {} window{}  up {}",
                s.name,
                if s.attached { "attached" } else { "detached" },
                s.window_count,
                if s.window_count == 1 { "" } else { "s" },
                s.uptime_text
            ));
        }

        lines.push(format!("tmux panes ({})", self.tmux.panes.len()));
        for p in &self.tmux.panes {
            lines.push(format!(
                "  {}  {}:{}  {}{}  {}  {}",
                p.pane_id,
                p.session_name,
                p.window_name,
                p.command,
                if p.is_active_pane { " (active)" } else { "" },
                p.dimensions(),
                p.working_directory
            ));
        }

        lines.push(format!("docker containers ({})", self.docker.containers.len()));
        for c in &self.docker.containers {
            let state = if c.running { "running" } else { "stopped" };
            lines.push(format!(
                "  {}  {}  {}  {}  cpu {:.1}%  mem {:.1}%  ports {}",
                c.name,
                c.container_id,
                state,
                c.health,
                c.cpu_percent,
                c.mem_percent,
                c.ports_text
            ));
        }

        lines.join("\n")
    }
}

// === Config ===

/// Output of `fishtank config show`.
#[derive(Debug, Serialize)]
pub struct ConfigShow {
    pub path: Option<PathBuf>,
    pub settings: Settings,
    pub sources: std::collections::BTreeMap<String, crate::config::ValueSource>,
}

impl From<ResolvedConfig> for ConfigShow {
    fn from(resolved: ResolvedConfig) -> Self {
        Self {
            path: resolved.path,
            settings: resolved.settings,
            sources: resolved.sources,
        }
    }
}

impl CommandResult for ConfigShow {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let s = &self.settings;
        let values = [
            ("host", s.host.clone()),
            ("port", s.port.to_string()),
            ("poll-interval-ms", s.poll_interval_ms.to_string()),
            ("command-timeout-ms", s.command_timeout_ms.to_string()),
            ("stale-after-secs", s.stale_after_secs.to_string()),
            ("remove-grace-polls", s.remove_grace_polls.to_string()),
            ("log-tail-lines", s.log_tail_lines.to_string()),
            ("docker-bin", s.docker_bin.clone()),
            ("tmux-bin", s.tmux_bin.clone()),
        ];

        let mut lines = vec![match &self.path {
            Some(path) => format!("Config file: {}", path.display()),
            None => "Config file: (none)".to_string(),
        }];
        for (key, value) in values {
            let source = self
                .sources
                .get(key)
                .map(|s| s.to_string())
                .unwrap_or_else(|| "default".to_string());
            lines.push(format!("  {} = {} ({})", key, value, source));
        }
        lines.join("\n")
    }
}

/// Output of `fishtank config path`.
#[derive(Debug, Serialize)]
pub struct ConfigPath {
    pub path: Option<PathBuf>,
    pub exists: bool,
}

impl ConfigPath {
    pub fn new(path: Option<PathBuf>) -> Self {
        let exists = path.as_ref().is_some_and(|p| p.exists());
        Self { path, exists }
    }
}

impl CommandResult for ConfigPath {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        match &self.path {
            Some(path) if self.exists => path.display().to_string(),
            Some(path) => format!("{} (not created)", path.display()),
            None => "No config directory on this platform".to_string(),
        }
    }
}
