//! The poll loop.
//!
//! One task drives the interval, so ticks never overlap; a slow poll delays
//! the next tick instead of stacking up behind it.

use super::protocol::ServerMessage;
use crate::snapshot::Collector;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;

/// Snapshots buffered per client before it starts skipping.
pub const CHANNEL_CAPACITY: usize = 16;

/// Take a snapshot and encode it as a websocket frame.
pub async fn encode_snapshot(collector: &Collector) -> crate::Result<String> {
    ServerMessage::Processes(collector.collect().await).to_json()
}

/// Poll forever, broadcasting each snapshot.
///
/// Polls are skipped while nobody is subscribed. A failing tick is logged
/// and the loop carries on.
pub async fn run_poll_loop(
    collector: Collector,
    update_tx: broadcast::Sender<String>,
    period: Duration,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;

        if update_tx.receiver_count() == 0 {
            tracing::trace!("no clients, skipping poll");
            continue;
        }

        match encode_snapshot(&collector).await {
            Ok(frame) => {
                // Send only fails when every receiver is gone
                if update_tx.send(frame).is_err() {
                    tracing::debug!("clients disconnected during poll");
                }
            }
            Err(e) => tracing::error!("poll failed: {}", e),
        }
    }
}
