//! Fishtank CLI - a live view of tmux sessions, panes and docker containers.

use clap::Parser;
use fishtank::cli::{Cli, Commands, ConfigCommands};
use fishtank::commands::{self, CommandResult, ConfigPath, ConfigShow};
use fishtank::config;
use fishtank::models::EntityKind;
use fishtank::server::protocol::{KillRequest, KillResponse, LogsResponse};
use fishtank::snapshot::Collector;
use fishtank::watch::connection::ReconnectPolicy;
use fishtank::watch::{self, Source, Watcher};
use fishtank::{Error, Result};
use std::future::Future;
use std::process;
use tracing_subscriber::EnvFilter;

/// Log filter used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "fishtank=info";

fn main() {
    let cli = Cli::parse();
    let human = cli.human_readable;

    init_logging(cli.log_json);

    if let Err(e) = run_command(cli, human) {
        if human {
            eprintln!("Error: {}", e);
        } else {
            eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
        }
        process::exit(1);
    }
}

/// Install the tracing subscriber. Logs go to stderr so stdout stays
/// machine-readable.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    // A subscriber may already be installed; keep it
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

fn run_command(cli: Cli, human: bool) -> Result<()> {
    if let Commands::Config {
        command: ConfigCommands::Path,
    } = &cli.command
    {
        let path = cli.config.clone().or_else(config::default_config_path);
        output(&ConfigPath::new(path), human);
        return Ok(());
    }

    let resolved = config::resolve(cli.config.as_deref(), &cli.overrides())?;
    let settings = resolved.settings.clone();
    let collector = Collector::from_settings(&settings);

    match cli.command {
        Commands::Config { .. } => output(&ConfigShow::from(resolved), human),

        Commands::Serve { .. } => {
            block_on(fishtank::server::start_server(settings, collector))??;
        }

        Commands::Snapshot => {
            let snapshot = block_on(collector.collect())?;
            output(&snapshot, human);
        }

        Commands::Watch { url, verbose, .. } => {
            let source = match url {
                Some(url) => Source::Remote {
                    url,
                    reconnect: ReconnectPolicy::default(),
                },
                None => Source::Local {
                    collector,
                    interval: settings.poll_interval(),
                },
            };
            let watcher = Watcher::new(settings.reconciler_options(), verbose);
            block_on(watch::run(source, watcher, human))??;
        }

        Commands::Logs { id, .. } => {
            let kind = kind_of(&id)?;
            let logs = block_on(commands::fetch_logs(
                &collector,
                kind,
                &id,
                settings.log_tail_lines,
            ))??;
            output(&LogsResponse::ok(logs), human);
        }

        Commands::Kill { id } => {
            let request = KillRequest {
                kind: kind_of(&id)?.as_str().to_string(),
                id,
                name: String::new(),
                pane_id: None,
            };
            let message = block_on(commands::kill_process(&collector, &request))??;
            output(&KillResponse::done(message), human);
        }
    }

    Ok(())
}

fn kind_of(id: &str) -> Result<EntityKind> {
    EntityKind::from_id(id).ok_or_else(|| {
        Error::InvalidInput(format!(
            "'{}' is not an entity id (expected tmux-session-*, tmux-pane-* or docker-*)",
            id
        ))
    })
}

/// Run a future on a fresh multi-threaded runtime.
fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| Error::Other(format!("Failed to create runtime: {}", e)))?;
    Ok(runtime.block_on(future))
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, human: bool) {
    if human {
        println!("{}", result.to_human());
    } else {
        println!("{}", result.to_json());
    }
}
