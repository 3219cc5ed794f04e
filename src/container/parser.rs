//! Parsers for `docker ps`, `docker inspect` and `docker stats` output.
//!
//! `ps` and `stats` are run with a Go template that prints one JSON object
//! per line; `inspect` prints `fullId|health|restarts`. A line that doesn't
//! decode is dropped and the rest of the batch is kept.

use crate::models::{DockerContainer, EntityKind, Health, Port};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Length of docker's short container id.
pub const SHORT_ID_LEN: usize = 12;

/// Default for a missing net/block IO column.
pub const EMPTY_IO: &str = "0B / 0B";

static UPTIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Up\s+(.+?)(?:\s+\(|$)").expect("valid uptime regex"));

static MAPPED_PORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+(?:-\d+)?)->(\d+(?:-\d+)?)/(\w+)").expect("valid mapped port regex")
});

static EXPOSED_PORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:-\d+)?)/(\w+)").expect("valid exposed port regex"));

/// One line of `docker ps --format` output.
#[derive(Debug, Deserialize)]
struct PsLine {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    image: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    ports: String,
    #[serde(default)]
    size: String,
}

/// One line of `docker stats --format` output.
#[derive(Debug, Deserialize)]
struct StatsLine {
    id: String,
    #[serde(default)]
    cpu: String,
    #[serde(default)]
    mem: String,
    #[serde(default)]
    netio: String,
    #[serde(default)]
    blockio: String,
}

/// Health and restart count for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectInfo {
    pub health: Health,
    pub restart_count: u32,
}

/// Resource usage for one running container.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsInfo {
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub net_io: String,
    pub block_io: String,
}

/// Truncate a docker id to its 12-character short form.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// Extract the uptime from a status like `Up 3 hours (healthy)`.
///
/// Returns an empty string for statuses that aren't `Up ...`.
pub fn parse_uptime(status: &str) -> String {
    UPTIME_RE
        .captures(status)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Parse the `Ports` column, e.g. `0.0.0.0:8080->80/tcp, 443/tcp`.
///
/// Unrecognized fragments are dropped; order is preserved.
pub fn parse_ports(ports: &str) -> Vec<Port> {
    ports
        .split(", ")
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(parse_port)
        .collect()
}

fn parse_port(part: &str) -> Option<Port> {
    if let Some(caps) = MAPPED_PORT_RE.captures(part) {
        let host = caps[1].to_string();
        let container = caps[2].to_string();
        return Some(Port {
            display: format!("{}→{}", host, container),
            host_port: Some(host),
            container_port: container,
            protocol: caps[3].to_string(),
        });
    }

    EXPOSED_PORT_RE.captures(part).map(|caps| Port {
        host_port: None,
        container_port: caps[1].to_string(),
        protocol: caps[2].to_string(),
        display: caps[1].to_string(),
    })
}

/// Join port displays for the label, or `none`.
pub fn ports_text(ports: &[Port]) -> String {
    if ports.is_empty() {
        "none".to_string()
    } else {
        ports
            .iter()
            .map(|p| p.display.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Parse `docker ps -a` output into containers with enrichment defaults.
pub fn parse_containers(output: &str) -> Vec<DockerContainer> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<PsLine>(line) {
            Ok(ps) => Some(container_from_ps(ps)),
            Err(e) => {
                tracing::debug!("skipping malformed docker ps line: {}", e);
                None
            }
        })
        .collect()
}

fn container_from_ps(ps: PsLine) -> DockerContainer {
    let ports = parse_ports(&ps.ports);
    let container_id = short_id(&ps.id).to_string();
    let size_text = if ps.size.trim().is_empty() {
        "N/A".to_string()
    } else {
        ps.size
    };

    DockerContainer {
        id: DockerContainer::id_for(&container_id),
        entity_type: EntityKind::DockerContainer,
        container_id,
        name: ps.name,
        active: false,
        image: ps.image,
        uptime_text: parse_uptime(&ps.status),
        status_text: ps.status,
        running: ps.state == "running",
        ports_text: ports_text(&ports),
        ports,
        size_text,
        cpu_percent: 0.0,
        mem_percent: 0.0,
        net_io: EMPTY_IO.to_string(),
        block_io: EMPTY_IO.to_string(),
        health: Health::Unknown,
        restart_count: 0,
    }
}

/// Parse `docker inspect` batch output, keyed by short id.
pub fn parse_inspect(output: &str) -> HashMap<String, InspectInfo> {
    let mut map = HashMap::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut fields = line.split('|');
        let full_id = fields.next().unwrap_or("").trim();
        if full_id.is_empty() {
            continue;
        }
        let health = Health::parse(fields.next().unwrap_or(""));
        let restart_count = fields
            .next()
            .and_then(|s| s.trim().parse::<u32>().ok())
            .unwrap_or(0);

        map.insert(
            short_id(full_id).to_string(),
            InspectInfo {
                health,
                restart_count,
            },
        );
    }

    map
}

/// Parse a percentage like `12.3%`. Anything unparseable is `0`.
pub fn parse_percent(value: &str) -> f64 {
    value
        .trim()
        .trim_end_matches('%')
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

/// Parse `docker stats --no-stream` output, keyed by short id.
pub fn parse_stats(output: &str) -> HashMap<String, StatsInfo> {
    let mut map = HashMap::new();

    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let stats = match serde_json::from_str::<StatsLine>(line) {
            Ok(stats) => stats,
            Err(e) => {
                tracing::debug!("skipping malformed docker stats line: {}", e);
                continue;
            }
        };

        map.insert(
            short_id(&stats.id).to_string(),
            StatsInfo {
                cpu_percent: parse_percent(&stats.cpu),
                mem_percent: parse_percent(&stats.mem),
                net_io: non_empty_or(stats.netio, EMPTY_IO),
                block_io: non_empty_or(stats.blockio, EMPTY_IO),
            },
        );
    }

    map
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}
