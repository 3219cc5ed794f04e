//! Fishtank - a process aquarium for tmux and docker.
//!
//! This library provides the core functionality for the `fishtank` CLI:
//! parsing `docker` and `tmux` output into typed snapshots, polling and
//! broadcasting those snapshots, and reconciling a stream of snapshots into
//! long-lived entities with lifecycle transitions.

pub mod cli;
pub mod commands;
pub mod config;
pub mod container;
pub mod exec;
pub mod models;
pub mod reconcile;
pub mod server;
pub mod snapshot;
pub mod tmux;
pub mod watch;

/// Test utilities shared by unit tests.
#[cfg(test)]
pub(crate) mod test_utils {
    use crate::exec::{CommandOutput, CommandRunner};
    use crate::{Error, Result};
    use futures::future::BoxFuture;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// What the fake runner does for one `program subcommand` pair.
    #[derive(Debug, Clone)]
    pub enum Reply {
        Stdout(String),
        Fail { stderr: String, stdout: String },
        Missing,
    }

    /// A `CommandRunner` that answers from a table keyed by
    /// `"<program> <first arg>"` and records every call.
    ///
    /// Unscripted commands behave as if the tool is not installed.
    #[derive(Debug, Default)]
    pub struct FakeRunner {
        replies: HashMap<String, Reply>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn stdout(mut self, key: &str, stdout: &str) -> Self {
            self.replies
                .insert(key.to_string(), Reply::Stdout(stdout.to_string()));
            self
        }

        pub fn fail(self, key: &str, stderr: &str) -> Self {
            self.partial(key, "", stderr)
        }

        /// Exit non-zero after printing `stdout`, like `docker inspect` when
        /// one of several containers is gone.
        pub fn partial(mut self, key: &str, stdout: &str, stderr: &str) -> Self {
            self.replies.insert(
                key.to_string(),
                Reply::Fail {
                    stderr: stderr.to_string(),
                    stdout: stdout.to_string(),
                },
            );
            self
        }

        /// Every command line that was run, in order.
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn was_called(&self, key: &str) -> bool {
            self.calls().iter().any(|c| c.starts_with(key))
        }
    }

    impl CommandRunner for FakeRunner {
        fn output<'a>(
            &'a self,
            program: &'a str,
            args: &'a [String],
        ) -> BoxFuture<'a, Result<CommandOutput>> {
            Box::pin(async move {
                let line = crate::exec::display_command(program, args);
                self.calls.lock().unwrap().push(line.clone());

                let key = match args.first() {
                    Some(sub) => format!("{} {}", program, sub),
                    None => program.to_string(),
                };
                match self.replies.get(&key).cloned().unwrap_or(Reply::Missing) {
                    Reply::Stdout(stdout) => Ok(CommandOutput {
                        stdout,
                        stderr: String::new(),
                    }),
                    Reply::Fail { stderr, stdout } => Err(Error::CommandFailed {
                        command: line,
                        status: 1,
                        stderr,
                        stdout,
                    }),
                    Reply::Missing => Err(Error::ToolUnavailable(program.to_string())),
                }
            })
        }
    }
}

/// Library-level error type for Fishtank operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} is not available on this host")]
    ToolUnavailable(String),

    #[error("`{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
        /// Whatever the command printed before failing
        stdout: String,
    },

    #[error("`{0}` did not finish before the deadline")]
    CommandTimeout(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Fishtank operations.
pub type Result<T> = std::result::Result<T, Error>;
