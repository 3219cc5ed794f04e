//! Data models for Fishtank entities.
//!
//! This module defines the per-poll values produced by the parsers:
//! - `TmuxSession` - A tmux session with attachment and activity info
//! - `TmuxPane` - A single tmux pane with its running command
//! - `DockerContainer` - A container with ports, health and resource usage
//! - `ProcessEntity` - The sum of the three, used by the reconciler
//! - `Snapshot` - One poll cycle across both sources
//!
//! Every value here is rebuilt from scratch on each poll. Nothing in this
//! module remembers previous polls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity prefix for tmux session ids.
pub const TMUX_SESSION_PREFIX: &str = "tmux-session-";
/// Identity prefix for tmux pane ids.
pub const TMUX_PANE_PREFIX: &str = "tmux-pane-";
/// Identity prefix for docker container ids.
pub const DOCKER_PREFIX: &str = "docker-";

/// The three kinds of process the aquarium knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    TmuxSession,
    TmuxPane,
    DockerContainer,
}

impl EntityKind {
    /// Parse from the wire name (`tmux-session`, `tmux-pane`, `docker-container`).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "tmux-session" => Some(EntityKind::TmuxSession),
            "tmux-pane" => Some(EntityKind::TmuxPane),
            "docker-container" => Some(EntityKind::DockerContainer),
            _ => None,
        }
    }

    /// Wire name of this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::TmuxSession => "tmux-session",
            EntityKind::TmuxPane => "tmux-pane",
            EntityKind::DockerContainer => "docker-container",
        }
    }

    /// Prefix prepended to the raw identifier to build the entity id.
    pub fn id_prefix(&self) -> &'static str {
        match self {
            EntityKind::TmuxSession => TMUX_SESSION_PREFIX,
            EntityKind::TmuxPane => TMUX_PANE_PREFIX,
            EntityKind::DockerContainer => DOCKER_PREFIX,
        }
    }

    /// Strip this kind's prefix from an entity id, returning the raw identifier.
    pub fn raw_id<'a>(&self, id: &'a str) -> Option<&'a str> {
        id.strip_prefix(self.id_prefix()).filter(|raw| !raw.is_empty())
    }

    /// Infer the kind from an entity id's prefix.
    pub fn from_id(id: &str) -> Option<Self> {
        [
            EntityKind::TmuxSession,
            EntityKind::TmuxPane,
            EntityKind::DockerContainer,
        ]
        .into_iter()
        .find(|kind| kind.raw_id(id).is_some())
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Container health as reported by `docker inspect`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Unhealthy,
    /// No healthcheck configured.
    None,
    /// Not inspected yet, or a state we don't track (e.g. `starting`).
    #[default]
    Unknown,
}

impl Health {
    /// Parse the health column of the inspect batch. Empty means no healthcheck.
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "healthy" => Health::Healthy,
            "unhealthy" => Health::Unhealthy,
            "none" | "" => Health::None,
            _ => Health::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Health::Healthy => "healthy",
            Health::Unhealthy => "unhealthy",
            Health::None => "none",
            Health::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A tmux session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmuxSession {
    /// `"tmux-session-" + name`
    pub id: String,

    /// Entity type marker
    #[serde(rename = "type")]
    pub entity_type: EntityKind,

    /// Session name as shown by tmux
    pub name: String,

    /// Same as `attached`
    pub active: bool,

    /// Whether a client is attached
    pub attached: bool,

    /// `#{session_activity}`, seconds since the epoch
    pub last_activity_epoch: i64,

    /// `#{session_created}`, seconds since the epoch
    pub created_epoch: i64,

    pub window_count: u32,

    pub uptime_secs: i64,

    /// Human uptime (`42s`, `5m`, `3h`, `2d`)
    pub uptime_text: String,
}

impl TmuxSession {
    pub fn id_for(name: &str) -> String {
        format!("{}{}", TMUX_SESSION_PREFIX, name)
    }
}

/// A tmux pane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TmuxPane {
    /// `"tmux-pane-" + pane_id`
    pub id: String,

    #[serde(rename = "type")]
    pub entity_type: EntityKind,

    /// Display name: the pane's current command
    pub name: String,

    /// Same as `is_active_pane`
    pub active: bool,

    /// Raw tmux pane id, e.g. `%3`
    pub pane_id: String,

    /// Owning session, used for lookup only
    pub session_name: String,

    pub command: String,

    /// Whether this is the active pane of its window
    pub is_active_pane: bool,

    pub pid: u32,

    pub working_directory: String,

    pub width: u32,

    pub height: u32,

    pub is_dead: bool,

    pub window_name: String,
}

impl TmuxPane {
    pub fn id_for(pane_id: &str) -> String {
        format!("{}{}", TMUX_PANE_PREFIX, pane_id)
    }

    /// `WIDTHxHEIGHT`
    pub fn dimensions(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// One published or exposed container port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Port {
    /// Host side of a mapping; absent for exposed-only ports
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_port: Option<String>,

    pub container_port: String,

    pub protocol: String,

    /// `8080→80` for mappings, `443` for exposed ports
    pub display: String,
}

/// A docker container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DockerContainer {
    /// `"docker-" + container_id`
    pub id: String,

    #[serde(rename = "type")]
    pub entity_type: EntityKind,

    /// 12-character short id
    pub container_id: String,

    pub name: String,

    /// Always false; containers carry no activity flag
    pub active: bool,

    pub image: String,

    /// Raw `docker ps` status, e.g. `Up 3 hours (healthy)`
    pub status_text: String,

    pub running: bool,

    pub ports: Vec<Port>,

    /// Port displays joined with `, `, or `none`
    pub ports_text: String,

    pub uptime_text: String,

    pub size_text: String,

    pub cpu_percent: f64,

    pub mem_percent: f64,

    #[serde(rename = "netIO")]
    pub net_io: String,

    #[serde(rename = "blockIO")]
    pub block_io: String,

    pub health: Health,

    pub restart_count: u32,
}

impl DockerContainer {
    pub fn id_for(container_id: &str) -> String {
        format!("{}{}", DOCKER_PREFIX, container_id)
    }
}

/// Any observed process, discriminated by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcessEntity {
    TmuxSession(TmuxSession),
    TmuxPane(TmuxPane),
    DockerContainer(DockerContainer),
}

impl ProcessEntity {
    pub fn id(&self) -> &str {
        match self {
            ProcessEntity::TmuxSession(s) => &s.id,
            ProcessEntity::TmuxPane(p) => &p.id,
            ProcessEntity::DockerContainer(c) => &c.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ProcessEntity::TmuxSession(s) => &s.name,
            ProcessEntity::TmuxPane(p) => &p.name,
            ProcessEntity::DockerContainer(c) => &c.name,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            ProcessEntity::TmuxSession(_) => EntityKind::TmuxSession,
            ProcessEntity::TmuxPane(_) => EntityKind::TmuxPane,
            ProcessEntity::DockerContainer(_) => EntityKind::DockerContainer,
        }
    }

    /// Whether the entity counts as active.
    ///
    /// Sessions are active while attached, panes while they are the active
    /// pane of their window. Containers are never active here; the view
    /// derives container activity from cpu usage on its own.
    pub fn is_active(&self) -> bool {
        match self {
            ProcessEntity::TmuxSession(s) => s.active,
            ProcessEntity::TmuxPane(p) => p.active,
            ProcessEntity::DockerContainer(c) => c.active,
        }
    }

    /// Counter whose change between polls counts as activity.
    pub fn activity_marker(&self) -> Option<i64> {
        match self {
            ProcessEntity::TmuxSession(s) => Some(s.last_activity_epoch),
            ProcessEntity::TmuxPane(_) | ProcessEntity::DockerContainer(_) => None,
        }
    }

    /// A container that is not running. Always false for tmux entities.
    pub fn is_stopped_container(&self) -> bool {
        matches!(self, ProcessEntity::DockerContainer(c) if !c.running)
    }
}

impl From<TmuxSession> for ProcessEntity {
    fn from(session: TmuxSession) -> Self {
        ProcessEntity::TmuxSession(session)
    }
}

impl From<TmuxPane> for ProcessEntity {
    fn from(pane: TmuxPane) -> Self {
        ProcessEntity::TmuxPane(pane)
    }
}

impl From<DockerContainer> for ProcessEntity {
    fn from(container: DockerContainer) -> Self {
        ProcessEntity::DockerContainer(container)
    }
}

/// Everything tmux reported in one poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TmuxSnapshot {
    pub sessions: Vec<TmuxSession>,
    pub panes: Vec<TmuxPane>,
}

/// Everything docker reported in one poll.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerSnapshot {
    pub containers: Vec<DockerContainer>,
}

/// One poll cycle across both sources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Milliseconds since the epoch when the poll finished
    pub timestamp: i64,
    pub tmux: TmuxSnapshot,
    pub docker: DockerSnapshot,
}

impl Snapshot {
    /// All entities in snapshot order: sessions, panes, then containers.
    pub fn entities(&self) -> Vec<ProcessEntity> {
        let mut entities = Vec::with_capacity(self.len());
        entities.extend(self.tmux.sessions.iter().cloned().map(ProcessEntity::from));
        entities.extend(self.tmux.panes.iter().cloned().map(ProcessEntity::from));
        entities.extend(self.docker.containers.iter().cloned().map(ProcessEntity::from));
        entities
    }

    pub fn len(&self) -> usize {
        self.tmux.sessions.len() + self.tmux.panes.len() + self.docker.containers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_id() {
        assert_eq!(EntityKind::from_id("tmux-session-work"), Some(EntityKind::TmuxSession));
        assert_eq!(EntityKind::from_id("tmux-pane-%3"), Some(EntityKind::TmuxPane));
        assert_eq!(EntityKind::from_id("docker-abc"), Some(EntityKind::DockerContainer));
        assert_eq!(EntityKind::from_id("docker-"), None);
        assert_eq!(EntityKind::from_id("nginx"), None);
    }

    fn container(running: bool) -> DockerContainer {
        DockerContainer {
            id: DockerContainer::id_for("abcdef123456"),
            entity_type: EntityKind::DockerContainer,
            container_id: "abcdef123456".to_string(),
            name: "api".to_string(),
            active: false,
            image: "nginx:latest".to_string(),
            status_text: "Up 3 hours".to_string(),
            running,
            ports: vec![],
            ports_text: "none".to_string(),
            uptime_text: "3 hours".to_string(),
            size_text: "N/A".to_string(),
            cpu_percent: 0.0,
            mem_percent: 0.0,
            net_io: "0B / 0B".to_string(),
            block_io: "0B / 0B".to_string(),
            health: Health::Unknown,
            restart_count: 0,
        }
    }

    #[test]
    fn test_entity_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&EntityKind::DockerContainer).unwrap(),
            r#""docker-container""#
        );
        assert_eq!(EntityKind::parse("tmux-pane"), Some(EntityKind::TmuxPane));
        assert_eq!(EntityKind::parse("tmux"), None);
    }

    #[test]
    fn test_raw_id_strips_prefix() {
        assert_eq!(
            EntityKind::DockerContainer.raw_id("docker-abcdef123456"),
            Some("abcdef123456")
        );
        assert_eq!(EntityKind::TmuxPane.raw_id("tmux-pane-%3"), Some("%3"));
        assert_eq!(EntityKind::TmuxSession.raw_id("docker-abc"), None);
        assert_eq!(EntityKind::TmuxSession.raw_id("tmux-session-"), None);
    }

    #[test]
    fn test_health_parse() {
        assert_eq!(Health::parse("healthy"), Health::Healthy);
        assert_eq!(Health::parse("unhealthy"), Health::Unhealthy);
        assert_eq!(Health::parse("none"), Health::None);
        assert_eq!(Health::parse(""), Health::None);
        assert_eq!(Health::parse("starting"), Health::Unknown);
    }

    #[test]
    fn test_container_serializes_with_type_marker() {
        let json = serde_json::to_value(container(true)).unwrap();
        assert_eq!(json["type"], "docker-container");
        assert_eq!(json["id"], "docker-abcdef123456");
        assert_eq!(json["containerId"], "abcdef123456");
        assert_eq!(json["netIO"], "0B / 0B");
        assert_eq!(json["health"], "unknown");
        assert_eq!(json["active"], false);
    }

    #[test]
    fn test_containers_are_never_active() {
        let entity = ProcessEntity::from(container(true));
        assert!(!entity.is_active());
        assert!(!entity.is_stopped_container());
        assert!(ProcessEntity::from(container(false)).is_stopped_container());
    }

    #[test]
    fn test_snapshot_entity_order() {
        let snapshot = Snapshot {
            timestamp: 0,
            tmux: TmuxSnapshot {
                sessions: vec![TmuxSession {
                    id: TmuxSession::id_for("work"),
                    entity_type: EntityKind::TmuxSession,
                    name: "work".to_string(),
                    active: true,
                    attached: true,
                    last_activity_epoch: 10,
                    created_epoch: 5,
                    window_count: 1,
                    uptime_secs: 5,
                    uptime_text: "5s".to_string(),
                }],
                panes: vec![],
            },
            docker: DockerSnapshot {
                containers: vec![container(true)],
            },
        };

        let ids: Vec<String> = snapshot.entities().iter().map(|e| e.id().to_string()).collect();
        assert_eq!(ids, vec!["tmux-session-work", "docker-abcdef123456"]);
        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.is_empty());
    }
}
