//! Tmux command construction.
//!
//! This module provides a builder for the tmux invocations fishtank needs.
//! It produces argument vectors for [`crate::exec::CommandRunner`]; nothing
//! here runs a process or goes through a shell.

/// `list-sessions` format: `name|attached|activity|created|windows`.
pub const SESSION_FORMAT: &str =
    "#{session_name}|#{session_attached}|#{session_activity}|#{session_created}|#{session_windows}";

/// `list-panes` format:
/// `session|pane_id|command|active|pid|cwd|width|height|dead|window_name`.
pub const PANE_FORMAT: &str = "#{session_name}|#{pane_id}|#{pane_current_command}|#{pane_active}|#{pane_pid}|#{pane_current_path}|#{pane_width}|#{pane_height}|#{pane_dead}|#{window_name}";

/// Builder for tmux argument vectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TmuxCommand {
    args: Vec<String>,
}

impl TmuxCommand {
    fn new(command: &str) -> Self {
        Self {
            args: vec![command.to_string()],
        }
    }

    fn flag(mut self, flag: &str) -> Self {
        self.args.push(flag.to_string());
        self
    }

    fn flag_with_value(mut self, flag: &str, value: &str) -> Self {
        self.args.push(flag.to_string());
        self.args.push(value.to_string());
        self
    }

    /// Arguments to pass after the tmux binary.
    pub fn into_args(self) -> Vec<String> {
        self.args
    }

    /// Human-readable form, for logs.
    pub fn build(&self) -> String {
        format!("tmux {}", self.args.join(" "))
    }

    /// List every session on the default server.
    ///
    /// # Example
    /// ```
    /// use fishtank::tmux::command::TmuxCommand;
    /// let cmd = TmuxCommand::list_sessions();
    /// assert!(cmd.build().starts_with("tmux list-sessions -F #{session_name}|"));
    /// ```
    pub fn list_sessions() -> Self {
        Self::new("list-sessions").flag_with_value("-F", SESSION_FORMAT)
    }

    /// List every pane across all sessions.
    pub fn list_panes() -> Self {
        Self::new("list-panes")
            .flag("-a")
            .flag_with_value("-F", PANE_FORMAT)
    }

    /// Print the last `lines` lines of a pane's scrollback.
    ///
    /// # Example
    /// ```
    /// use fishtank::tmux::command::TmuxCommand;
    /// let cmd = TmuxCommand::capture_pane("%3", 50);
    /// assert_eq!(cmd.build(), "tmux capture-pane -p -t %3 -S -50");
    /// ```
    pub fn capture_pane(target: &str, lines: u32) -> Self {
        Self::new("capture-pane")
            .flag("-p")
            .flag_with_value("-t", target)
            .flag_with_value("-S", &format!("-{}", lines))
    }

    /// Kill a single pane.
    ///
    /// # Example
    /// ```
    /// use fishtank::tmux::command::TmuxCommand;
    /// assert_eq!(TmuxCommand::kill_pane("%3").build(), "tmux kill-pane -t %3");
    /// ```
    pub fn kill_pane(pane_id: &str) -> Self {
        Self::new("kill-pane").flag_with_value("-t", pane_id)
    }

    /// Kill a whole session.
    ///
    /// The name is prefixed with `=` so tmux matches it exactly instead of
    /// by prefix.
    ///
    /// # Example
    /// ```
    /// use fishtank::tmux::command::TmuxCommand;
    /// assert_eq!(TmuxCommand::kill_session("work").build(), "tmux kill-session -t =work");
    /// ```
    pub fn kill_session(session_name: &str) -> Self {
        Self::new("kill-session").flag_with_value("-t", &format!("={}", session_name))
    }
}
