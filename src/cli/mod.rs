//! CLI argument definitions for fishtank.

use crate::config::FishtankConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Fishtank - watch tmux sessions and docker containers swim by.
///
/// Start with `fishtank serve` and point a browser or `fishtank watch` at it.
#[derive(Parser, Debug)]
#[command(name = "fishtank")]
#[command(author, version, about = "Live view of tmux sessions, panes and docker containers", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Config file to use instead of ~/.config/fishtank/config.kdl
    #[arg(long = "config", global = true, env = "FISHTANK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long = "log-json", global = true)]
    pub log_json: bool,

    #[command(flatten)]
    pub tools: ToolArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Overrides for the external tools, shared by every command.
#[derive(Args, Debug, Default, Clone)]
pub struct ToolArgs {
    /// docker binary
    #[arg(long, global = true, env = "FISHTANK_DOCKER_BIN")]
    pub docker_bin: Option<String>,

    /// tmux binary
    #[arg(long, global = true, env = "FISHTANK_TMUX_BIN")]
    pub tmux_bin: Option<String>,

    /// Deadline for each docker/tmux call, in milliseconds
    #[arg(long, global = true, env = "FISHTANK_COMMAND_TIMEOUT_MS")]
    pub command_timeout_ms: Option<u64>,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the host and stream snapshots over a websocket
    Serve {
        /// Address to bind
        #[arg(long, env = "FISHTANK_HOST")]
        host: Option<String>,

        /// Port to listen on (default 3001)
        #[arg(short, long, env = "FISHTANK_PORT")]
        port: Option<u16>,

        /// Poll interval in milliseconds (default 2000)
        #[arg(long = "interval-ms", env = "FISHTANK_POLL_INTERVAL_MS")]
        interval_ms: Option<u64>,

        /// Lines returned by the logs endpoint (default 50)
        #[arg(long = "log-tail-lines", env = "FISHTANK_LOG_TAIL_LINES")]
        log_tail_lines: Option<u32>,
    },

    /// Print one snapshot of the host
    Snapshot,

    /// Print lifecycle events as they happen
    Watch {
        /// Watch a running server instead of polling locally
        /// (e.g. ws://127.0.0.1:3001/ws)
        #[arg(long)]
        url: Option<String>,

        /// Poll interval in milliseconds when polling locally
        #[arg(long = "interval-ms", env = "FISHTANK_POLL_INTERVAL_MS")]
        interval_ms: Option<u64>,

        /// Seconds of inactivity before an entity is reported stale
        #[arg(long = "stale-after-secs", env = "FISHTANK_STALE_AFTER_SECS")]
        stale_after_secs: Option<u64>,

        /// Polls an entity may be missing before it is reported removed
        #[arg(long = "remove-grace-polls", env = "FISHTANK_REMOVE_GRACE_POLLS")]
        remove_grace_polls: Option<u32>,

        /// Also print updates without transitions
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show recent output of a container, pane or session
    Logs {
        /// Entity id (e.g. docker-3f2a1b9c0d4e, tmux-pane-%3, tmux-session-work)
        id: String,

        /// Number of lines (default 50)
        #[arg(short = 'n', long = "lines", env = "FISHTANK_LOG_TAIL_LINES")]
        lines: Option<u32>,
    },

    /// Stop a container, or kill a pane or session
    Kill {
        /// Entity id (e.g. docker-3f2a1b9c0d4e, tmux-pane-%3, tmux-session-work)
        id: String,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show resolved settings and where each one came from
    Show,

    /// Print the config file location
    Path,
}

impl Cli {
    /// The CLI layer of configuration.
    pub fn overrides(&self) -> FishtankConfig {
        let mut layer = FishtankConfig {
            docker_bin: self.tools.docker_bin.clone(),
            tmux_bin: self.tools.tmux_bin.clone(),
            command_timeout_ms: self.tools.command_timeout_ms,
            ..FishtankConfig::default()
        };

        match &self.command {
            Commands::Serve {
                host,
                port,
                interval_ms,
                log_tail_lines,
            } => {
                layer.host = host.clone();
                layer.port = *port;
                layer.poll_interval_ms = *interval_ms;
                layer.log_tail_lines = *log_tail_lines;
            }
            Commands::Watch {
                interval_ms,
                stale_after_secs,
                remove_grace_polls,
                ..
            } => {
                layer.poll_interval_ms = *interval_ms;
                layer.stale_after_secs = *stale_after_secs;
                layer.remove_grace_polls = *remove_grace_polls;
            }
            Commands::Logs { lines, .. } => layer.log_tail_lines = *lines,
            Commands::Snapshot | Commands::Kill { .. } | Commands::Config { .. } => {}
        }

        layer
    }
}
