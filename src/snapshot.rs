//! Snapshot assembly.
//!
//! [`Collector`] runs the tmux and docker sources concurrently and stamps the
//! result. It is cheap to clone and shared by the poll loop, the HTTP
//! handlers and `watch`.

use crate::config::Settings;
use crate::exec::{CommandRunner, SystemRunner};
use crate::models::Snapshot;
use crate::{container, tmux};
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct Collector {
    runner: Arc<dyn CommandRunner>,
    docker_bin: String,
    tmux_bin: String,
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("docker_bin", &self.docker_bin)
            .field("tmux_bin", &self.tmux_bin)
            .finish_non_exhaustive()
    }
}

impl Collector {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        docker_bin: impl Into<String>,
        tmux_bin: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            docker_bin: docker_bin.into(),
            tmux_bin: tmux_bin.into(),
        }
    }

    /// A collector running real commands with the configured binaries and
    /// deadline.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            Arc::new(SystemRunner::new(settings.command_timeout())),
            settings.docker_bin.clone(),
            settings.tmux_bin.clone(),
        )
    }

    pub fn runner(&self) -> &dyn CommandRunner {
        self.runner.as_ref()
    }

    pub fn docker_bin(&self) -> &str {
        &self.docker_bin
    }

    pub fn tmux_bin(&self) -> &str {
        &self.tmux_bin
    }

    /// Take one snapshot of the host. Never fails; missing tools yield
    /// empty lists.
    pub async fn collect(&self) -> Snapshot {
        let now = Utc::now();
        let (tmux, docker) = tokio::join!(
            tmux::collect(self.runner(), &self.tmux_bin, now.timestamp()),
            container::collect(self.runner(), &self.docker_bin)
        );

        tracing::debug!(
            sessions = tmux.sessions.len(),
            panes = tmux.panes.len(),
            containers = docker.containers.len(),
            "collected snapshot"
        );

        Snapshot {
            timestamp: now.timestamp_millis(),
            tmux,
            docker,
        }
    }
}
