//! Tmux source.
//!
//! Lists sessions and panes from the default tmux server and turns them into
//! a [`TmuxSnapshot`]. A host without tmux, or without a running tmux server,
//! simply yields an empty snapshot.

pub mod command;
pub mod parser;

use crate::Error;
use crate::exec::CommandRunner;
use crate::models::TmuxSnapshot;
use command::TmuxCommand;

/// Collect sessions and panes. `now` is the current epoch in seconds.
///
/// The two listings don't depend on each other and run concurrently. Either
/// one failing leaves its half of the snapshot empty.
pub async fn collect(runner: &dyn CommandRunner, tmux_bin: &str, now: i64) -> TmuxSnapshot {
    let session_args = TmuxCommand::list_sessions().into_args();
    let pane_args = TmuxCommand::list_panes().into_args();

    let (sessions, panes) = tokio::join!(
        runner.run(tmux_bin, &session_args),
        runner.run(tmux_bin, &pane_args)
    );

    let sessions = match sessions {
        Ok(out) => parser::parse_sessions(&out, now),
        Err(e) => {
            log_failure("list-sessions", &e);
            Vec::new()
        }
    };
    let panes = match panes {
        Ok(out) => parser::parse_panes(&out),
        Err(e) => {
            log_failure("list-panes", &e);
            Vec::new()
        }
    };

    TmuxSnapshot { sessions, panes }
}

/// No tmux binary, or no server to talk to, is the normal idle state.
fn is_idle(err: &Error) -> bool {
    match err {
        Error::ToolUnavailable(_) => true,
        Error::CommandFailed { stderr, .. } => {
            stderr.contains("no server running") || stderr.contains("error connecting to")
        }
        _ => false,
    }
}

fn log_failure(stage: &str, err: &Error) {
    if is_idle(err) {
        tracing::debug!(stage, "tmux not available: {}", err);
    } else {
        tracing::warn!(stage, "tmux query failed: {}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeRunner;

    const NOW: i64 = 1_700_000_000;

    #[tokio::test]
    async fn test_collect_sessions_and_panes() {
        let runner = FakeRunner::new()
            .stdout("tmux list-sessions", &format!("work|1|{}|{}|2\n", NOW, NOW - 90))
            .stdout("tmux list-panes", "work|%0|bash|1|10|/tmp|80|24|0|main\n");

        let snapshot = collect(&runner, "tmux", NOW).await;

        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.sessions[0].uptime_text, "1m");
        assert_eq!(snapshot.panes.len(), 1);
        assert_eq!(snapshot.panes[0].session_name, "work");
    }

    #[tokio::test]
    async fn test_collect_without_tmux_is_empty() {
        let runner = FakeRunner::new();
        let snapshot = collect(&runner, "tmux", NOW).await;
        assert_eq!(snapshot, TmuxSnapshot::default());
    }

    #[tokio::test]
    async fn test_pane_listing_survives_session_failure() {
        let runner = FakeRunner::new()
            .fail("tmux list-sessions", "no server running on /tmp/tmux-1000/default")
            .stdout("tmux list-panes", "gone|%4|top|0|11|/|80|24|0|w\n");

        let snapshot = collect(&runner, "tmux", NOW).await;

        assert!(snapshot.sessions.is_empty());
        assert_eq!(snapshot.panes.len(), 1);
        assert_eq!(snapshot.panes[0].session_name, "gone");
    }

    #[test]
    fn test_no_server_counts_as_idle() {
        let err = Error::CommandFailed {
            command: "tmux list-sessions".to_string(),
            status: 1,
            stderr: "no server running on /tmp/tmux-0/default".to_string(),
            stdout: String::new(),
        };
        assert!(is_idle(&err));
        assert!(is_idle(&Error::ToolUnavailable("tmux".to_string())));
        assert!(!is_idle(&Error::CommandTimeout("tmux".to_string())));
    }
}
