//! Parsers for `tmux list-sessions` and `tmux list-panes` output.
//!
//! Both commands are run with the pipe-delimited formats from
//! [`super::command`]. A line that can't be used is skipped; the rest of the
//! batch is still returned.

use crate::models::{EntityKind, TmuxPane, TmuxSession};

/// Format an uptime in seconds as `Ns`, `Nm`, `Nh` or `Nd`.
pub fn format_uptime(seconds: i64) -> String {
    let seconds = seconds.max(0);
    if seconds < 60 {
        format!("{}s", seconds)
    } else if seconds < 3600 {
        format!("{}m", seconds / 60)
    } else if seconds < 86400 {
        format!("{}h", seconds / 3600)
    } else {
        format!("{}d", seconds / 86400)
    }
}

/// Parse `list-sessions` output. `now` is the current epoch in seconds.
///
/// A missing or non-numeric created timestamp is taken as `now`, so the
/// uptime comes out as zero.
pub fn parse_sessions(output: &str, now: i64) -> Vec<TmuxSession> {
    output
        .lines()
        .filter_map(|line| parse_session_line(line, now))
        .collect()
}

fn parse_session_line(line: &str, now: i64) -> Option<TmuxSession> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return None;
    }

    let fields: Vec<&str> = line.split('|').collect();
    let field = |i: usize| fields.get(i).copied().unwrap_or("").trim();

    let name = fields.first().copied().unwrap_or("");
    if name.is_empty() {
        return None;
    }

    let attached = is_flag_set(field(1));
    let created_epoch = field(3).parse::<i64>().unwrap_or(now);
    let uptime_secs = (now - created_epoch).max(0);
    let window_count = field(4)
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .unwrap_or(1);

    Some(TmuxSession {
        id: TmuxSession::id_for(name),
        entity_type: EntityKind::TmuxSession,
        name: name.to_string(),
        active: attached,
        attached,
        last_activity_epoch: field(2).parse().unwrap_or(0),
        created_epoch,
        window_count,
        uptime_secs,
        uptime_text: format_uptime(uptime_secs),
    })
}

/// Parse `list-panes -a` output.
pub fn parse_panes(output: &str) -> Vec<TmuxPane> {
    output.lines().filter_map(parse_pane_line).collect()
}

fn parse_pane_line(line: &str) -> Option<TmuxPane> {
    let line = line.trim_end_matches('\r');
    if line.trim().is_empty() {
        return None;
    }

    // The cwd may itself contain `|`, so the columns after it are taken
    // from the right.
    let mut fields: Vec<&str> = line.splitn(6, '|').collect();
    let rest = if fields.len() == 6 { fields.pop() } else { None };
    if let Some(rest) = rest {
        let mut tail: Vec<&str> = rest.rsplitn(5, '|').collect();
        tail.reverse();
        fields.extend(tail);
    }
    let field = |i: usize| fields.get(i).copied().unwrap_or("").trim();

    // No pane id means no stable identity
    let pane_id = field(1);
    if pane_id.is_empty() {
        return None;
    }

    let command = match field(2) {
        "" => "shell",
        cmd => cmd,
    };
    let working_directory = match fields.get(5).copied().unwrap_or("") {
        "" => "~",
        path => path,
    };

    let is_active_pane = is_flag_set(field(3));

    Some(TmuxPane {
        id: TmuxPane::id_for(pane_id),
        entity_type: EntityKind::TmuxPane,
        name: command.to_string(),
        pane_id: pane_id.to_string(),
        session_name: fields.first().copied().unwrap_or("").to_string(),
        command: command.to_string(),
        active: is_active_pane,
        is_active_pane,
        pid: field(4).parse().unwrap_or(0),
        working_directory: working_directory.to_string(),
        width: field(6).parse().unwrap_or(0),
        height: field(7).parse().unwrap_or(0),
        is_dead: is_flag_set(field(8)),
        window_name: field(9).to_string(),
    })
}

fn is_flag_set(value: &str) -> bool {
    value == "1"
}
