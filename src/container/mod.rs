//! Docker source.
//!
//! Builds a [`DockerSnapshot`] in three stages:
//! 1. `docker ps -a` lists every container with enrichment defaults
//! 2. one batch `docker inspect` adds health and restart counts
//! 3. one batch `docker stats --no-stream` over the running subset adds usage
//!
//! Stages 2 and 3 are best effort. If either fails the containers keep the
//! defaults from stage 1.

pub mod parser;

use crate::Error;
use crate::exec::CommandRunner;
use crate::models::{DockerContainer, DockerSnapshot};
use parser::{InspectInfo, StatsInfo};
use std::collections::HashMap;

/// `docker ps` template: one JSON object per container.
pub const PS_FORMAT: &str = r#"{"id":"{{.ID}}","name":"{{.Names}}","status":"{{.Status}}","image":"{{.Image}}","state":"{{.State}}","ports":"{{.Ports}}","created":"{{.CreatedAt}}","size":"{{.Size}}"}"#;

/// `docker inspect` template: `fullId|health|restarts`.
pub const INSPECT_FORMAT: &str =
    "{{.Id}}|{{if .State.Health}}{{.State.Health.Status}}{{else}}none{{end}}|{{.RestartCount}}";

/// `docker stats` template: one JSON object per container.
pub const STATS_FORMAT: &str = r#"{"id":"{{.ID}}","cpu":"{{.CPUPerc}}","mem":"{{.MemPerc}}","netio":"{{.NetIO}}","blockio":"{{.BlockIO}}"}"#;

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

pub fn ps_args() -> Vec<String> {
    args(&["ps", "-a", "--format", PS_FORMAT])
}

pub fn inspect_args(ids: &[&str]) -> Vec<String> {
    let mut list = args(&["inspect", "--format", INSPECT_FORMAT]);
    list.extend(ids.iter().map(|id| id.to_string()));
    list
}

pub fn stats_args(ids: &[&str]) -> Vec<String> {
    let mut list = args(&["stats", "--no-stream", "--format", STATS_FORMAT]);
    list.extend(ids.iter().map(|id| id.to_string()));
    list
}

pub fn logs_args(container_id: &str, tail: u32) -> Vec<String> {
    vec![
        "logs".to_string(),
        "--tail".to_string(),
        tail.to_string(),
        container_id.to_string(),
    ]
}

pub fn stop_args(container_id: &str) -> Vec<String> {
    vec!["stop".to_string(), container_id.to_string()]
}

/// Collect all containers. Never fails; a host without docker yields an
/// empty snapshot.
pub async fn collect(runner: &dyn CommandRunner, docker_bin: &str) -> DockerSnapshot {
    let mut containers = match runner.run(docker_bin, &ps_args()).await {
        Ok(out) => parser::parse_containers(&out),
        Err(e) => {
            log_failure("ps", &e);
            return DockerSnapshot::default();
        }
    };

    if !containers.is_empty() {
        let ids: Vec<&str> = containers.iter().map(|c| c.container_id.as_str()).collect();
        let inspect_args = inspect_args(&ids);
        match salvage(runner.run(docker_bin, &inspect_args).await) {
            Ok(out) => apply_inspect(&mut containers, &parser::parse_inspect(&out)),
            Err(e) => log_failure("inspect", &e),
        }
    }

    let running: Vec<&str> = containers
        .iter()
        .filter(|c| c.running)
        .map(|c| c.container_id.as_str())
        .collect();
    if !running.is_empty() {
        let stats_args = stats_args(&running);
        match salvage(runner.run(docker_bin, &stats_args).await) {
            Ok(out) => apply_stats(&mut containers, &parser::parse_stats(&out)),
            Err(e) => log_failure("stats", &e),
        }
    }

    DockerSnapshot { containers }
}

/// Batch calls exit non-zero when one container vanished mid-poll but
/// still print the others. Keep what they printed.
fn salvage(result: crate::Result<String>) -> crate::Result<String> {
    match result {
        Err(Error::CommandFailed { stdout, .. }) if !stdout.trim().is_empty() => Ok(stdout),
        other => other,
    }
}

fn apply_inspect(containers: &mut [DockerContainer], info: &HashMap<String, InspectInfo>) {
    for container in containers.iter_mut() {
        if let Some(info) = info.get(&container.container_id) {
            container.health = info.health;
            container.restart_count = info.restart_count;
        }
    }
}

fn apply_stats(containers: &mut [DockerContainer], stats: &HashMap<String, StatsInfo>) {
    for container in containers.iter_mut().filter(|c| c.running) {
        if let Some(stats) = stats.get(&container.container_id) {
            container.cpu_percent = stats.cpu_percent;
            container.mem_percent = stats.mem_percent;
            container.net_io = stats.net_io.clone();
            container.block_io = stats.block_io.clone();
        }
    }
}

fn log_failure(stage: &str, err: &Error) {
    if crate::exec::is_unavailable(err) {
        tracing::debug!(stage, "docker not available: {}", err);
    } else {
        tracing::warn!(stage, "docker query failed: {}", err);
    }
}
