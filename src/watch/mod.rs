//! Live lifecycle events.
//!
//! `fishtank watch` feeds snapshots through a [`Reconciler`] and prints the
//! resulting creates, updates, removals and staleness flips. Snapshots come
//! either from polling this host or from a running server's websocket.

pub mod connection;

use crate::commands::CommandResult;
use crate::models::EntityKind;
use crate::reconcile::{Change, Reconciler, ReconcilerOptions, StalenessChange, Transition};
use crate::server::protocol::ServerMessage;
use crate::snapshot::Collector;
use crate::{Error, Result};
use connection::ReconnectPolicy;
use futures::StreamExt;
use serde::Serialize;
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::Message as WsMessage;

/// How often staleness is re-checked between snapshots.
pub const STALENESS_TICK: Duration = Duration::from_secs(1);

/// Where snapshots come from.
#[derive(Debug, Clone)]
pub enum Source {
    /// Poll this host directly
    Local { collector: Collector, interval: Duration },
    /// Subscribe to a fishtank server, e.g. `ws://127.0.0.1:3001/ws`
    Remote {
        url: String,
        reconnect: ReconnectPolicy,
    },
}

/// Kind of a printed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventOp {
    Create,
    Update,
    Remove,
    /// Staleness flip between snapshots
    Stale,
}

/// One printed line of `watch` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WatchEvent {
    pub op: EventOp,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transitions: Vec<Transition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stale: Option<bool>,
}

impl CommandResult for WatchEvent {
    fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    fn to_human(&self) -> String {
        let marker = match self.op {
            EventOp::Create => '+',
            EventOp::Update => '~',
            EventOp::Remove => '-',
            EventOp::Stale => '!',
        };
        let mut line = format!("{} {} {} ({})", marker, self.kind, self.id, self.name);
        if !self.transitions.is_empty() {
            let names: Vec<&str> = self.transitions.iter().map(Transition::as_str).collect();
            line.push_str(": ");
            line.push_str(&names.join(", "));
        }
        if self.op == EventOp::Create && self.stale == Some(true) {
            line.push_str(" [stale]");
        }
        line
    }
}

/// A reconciler plus the rules for turning its output into events.
#[derive(Debug)]
pub struct Watcher {
    reconciler: Reconciler,
    /// Also report updates that carry no transition
    verbose: bool,
}

impl Watcher {
    pub fn new(options: ReconcilerOptions, verbose: bool) -> Self {
        Self {
            reconciler: Reconciler::new(options),
            verbose,
        }
    }

    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Reconcile one snapshot.
    pub fn apply(&mut self, snapshot: &crate::models::Snapshot, now: Instant) -> Vec<WatchEvent> {
        let changes = self.reconciler.reconcile(snapshot, now);
        changes
            .iter()
            .filter(|change| match change {
                Change::Update { transitions, .. } => self.verbose || !transitions.is_empty(),
                Change::Create { .. } | Change::Remove { .. } => true,
            })
            .map(event_for_change)
            .collect()
    }

    /// Re-check staleness against the clock.
    pub fn tick(&mut self, now: Instant) -> Vec<WatchEvent> {
        let flips = self.reconciler.tick(now);
        flips
            .into_iter()
            .filter_map(|flip| self.event_for_flip(flip))
            .collect()
    }

    fn event_for_flip(&self, flip: StalenessChange) -> Option<WatchEvent> {
        let entity = self.reconciler.get(&flip.id)?;
        Some(WatchEvent {
            op: EventOp::Stale,
            id: flip.id,
            kind: entity.kind(),
            name: entity.name().to_string(),
            transitions: vec![flip.transition],
            stale: Some(flip.transition == Transition::WentStale),
        })
    }
}

fn event_for_change(change: &Change) -> WatchEvent {
    let entity = change.entity();
    let (op, stale) = match change {
        Change::Create { stale, .. } => (EventOp::Create, Some(*stale)),
        Change::Update { .. } => (EventOp::Update, None),
        Change::Remove { .. } => (EventOp::Remove, None),
    };
    WatchEvent {
        op,
        id: entity.id().to_string(),
        kind: entity.kind(),
        name: entity.name().to_string(),
        transitions: change.transitions().to_vec(),
        stale,
    }
}

fn print_events(events: Vec<WatchEvent>, human: bool) {
    for event in events {
        if human {
            println!("{}", event.to_human());
        } else {
            println!("{}", event.to_json());
        }
    }
}

/// Watch until Ctrl+C.
pub async fn run(source: Source, mut watcher: Watcher, human: bool) -> Result<()> {
    match source {
        Source::Local {
            collector,
            interval,
        } => watch_local(&collector, interval, &mut watcher, human).await,
        Source::Remote { url, reconnect } => {
            watch_remote(&url, reconnect, &mut watcher, human).await
        }
    }
}

async fn watch_local(
    collector: &Collector,
    period: Duration,
    watcher: &mut Watcher,
    human: bool,
) -> Result<()> {
    let mut poll = tokio::time::interval(period);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut staleness = tokio::time::interval(STALENESS_TICK);
    staleness.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = poll.tick() => {
                let snapshot = collector.collect().await;
                print_events(watcher.apply(&snapshot, Instant::now()), human);
            }
            _ = staleness.tick() => print_events(watcher.tick(Instant::now()), human),
            _ = &mut shutdown => return Ok(()),
        }
    }
}

async fn watch_remote(
    url: &str,
    policy: ReconnectPolicy,
    watcher: &mut Watcher,
    human: bool,
) -> Result<()> {
    let mut staleness = tokio::time::interval(STALENESS_TICK);
    staleness.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    // Counts connections that ended before delivering a snapshot, so a
    // server that accepts and then drops us still runs out of attempts.
    let mut attempt = 0u32;
    loop {
        match tokio_tungstenite::connect_async(url).await {
            Ok((stream, _response)) => {
                tracing::info!(url, "connected");
                let (_write, mut read) = stream.split();

                loop {
                    tokio::select! {
                        frame = read.next() => match frame {
                            Some(Ok(WsMessage::Text(text))) => {
                                match ServerMessage::from_json(&text) {
                                    Ok(ServerMessage::Processes(snapshot)) => {
                                        attempt = 0;
                                        let events = watcher.apply(&snapshot, Instant::now());
                                        print_events(events, human);
                                    }
                                    Err(e) => tracing::warn!("ignoring undecodable frame: {}", e),
                                }
                            }
                            Some(Ok(WsMessage::Close(_))) | None => break,
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                tracing::warn!(url, "connection error: {}", e);
                                break;
                            }
                        },
                        _ = staleness.tick() => print_events(watcher.tick(Instant::now()), human),
                        _ = &mut shutdown => return Ok(()),
                    }
                }
                tracing::warn!(url, "connection lost");
            }
            Err(e) => tracing::warn!(url, attempt, "connect failed: {}", e),
        }

        attempt += 1;
        if attempt > policy.max_attempts {
            return Err(Error::Other(format!(
                "No fishtank server reachable at {} after {} attempts",
                url, policy.max_attempts
            )));
        }

        tokio::select! {
            _ = tokio::time::sleep(policy.backoff(attempt)) => {}
            _ = &mut shutdown => return Ok(()),
        }
    }
}
