//! Snapshot server.
//!
//! Polls the host on a fixed interval and pushes every snapshot to all
//! connected websocket clients. The HTTP API serves on-demand snapshots,
//! logs and kill actions.

mod http;
mod poll;
pub mod protocol;
mod websocket;

pub use http::{AppState, router, start_server};
pub use poll::{CHANNEL_CAPACITY, encode_snapshot, run_poll_loop};
