//! Wire types for the websocket and HTTP API.
//!
//! # Websocket
//!
//! The server exposes `/ws` and only ever pushes. Every frame is a JSON
//! [`ServerMessage`] with a `type` field:
//!
//! ```json
//! {"type": "processes", "timestamp": 1700000000000,
//!  "tmux": {"sessions": [], "panes": []},
//!  "docker": {"containers": []}}
//! ```
//!
//! Anything a client sends is ignored.
//!
//! # HTTP
//!
//! - `GET /api/logs?id=..&type=..` answers [`LogsResponse`]
//! - `POST /api/kill` takes a [`KillRequest`] and answers [`KillResponse`]

use crate::models::Snapshot;
use serde::{Deserialize, Serialize};

/// Messages pushed from the server to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A full snapshot of both sources.
    Processes(Snapshot),
}

impl ServerMessage {
    /// Encode for a text frame.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Decode a text frame.
    pub fn from_json(text: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Query for `GET /api/logs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsRequest {
    pub id: String,
    /// Wire name of the entity kind; unknown kinds are answered with an
    /// error payload.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Answer to a logs request. `error` is set only on failure, with `logs`
/// empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsResponse {
    pub logs: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LogsResponse {
    pub fn ok(logs: String) -> Self {
        Self { logs, error: None }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            logs: String::new(),
            error: Some(error.into()),
        }
    }
}

/// Body for `POST /api/kill`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillRequest {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Display name, used in the confirmation message
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pane_id: Option<String>,
}

/// Answer to a kill request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KillResponse {
    Done { success: bool, message: String },
    Failed { error: String },
}

impl KillResponse {
    pub fn done(message: impl Into<String>) -> Self {
        KillResponse::Done {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        KillResponse::Failed {
            error: error.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, KillResponse::Done { success: true, .. })
    }
}

/// Answer to `GET /api/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// Short git commit the binary was built from
    pub commit: String,
    pub built_at: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            commit: env!("FISHTANK_GIT_COMMIT").to_string(),
            built_at: env!("FISHTANK_BUILD_TIMESTAMP").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_processes_envelope_shape() {
        let msg = ServerMessage::Processes(Snapshot {
            timestamp: 42,
            ..Snapshot::default()
        });

        let json: serde_json::Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "processes");
        assert_eq!(json["timestamp"], 42);
        assert!(json["tmux"]["sessions"].as_array().unwrap().is_empty());
        assert!(json["tmux"]["panes"].as_array().unwrap().is_empty());
        assert!(json["docker"]["containers"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_envelope_decodes() {
        let text = r#"{"type":"processes","timestamp":7,"tmux":{"sessions":[],"panes":[]},"docker":{"containers":[]}}"#;
        let ServerMessage::Processes(snapshot) = ServerMessage::from_json(text).unwrap();
        assert_eq!(snapshot.timestamp, 7);
    }

    #[test]
    fn test_kill_request_accepts_camel_case() {
        let req: KillRequest = serde_json::from_str(
            r#"{"id":"tmux-pane-%3","type":"tmux-pane","name":"vim","paneId":"%3","session":"work"}"#,
        )
        .unwrap();
        assert_eq!(req.pane_id.as_deref(), Some("%3"));

        let minimal: KillRequest =
            serde_json::from_str(r#"{"id":"docker-abc","type":"docker-container"}"#).unwrap();
        assert_eq!(minimal.name, "");
        assert!(minimal.pane_id.is_none());
    }

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_string(&LogsResponse::ok("hi".to_string())).unwrap(),
            r#"{"logs":"hi"}"#
        );
        assert_eq!(
            serde_json::to_string(&LogsResponse::failed("nope")).unwrap(),
            r#"{"logs":"","error":"nope"}"#
        );
        assert_eq!(
            serde_json::to_string(&KillResponse::done("Killed pane %3")).unwrap(),
            r#"{"success":true,"message":"Killed pane %3"}"#
        );
        assert_eq!(
            serde_json::to_string(&KillResponse::failed("Unknown process type")).unwrap(),
            r#"{"error":"Unknown process type"}"#
        );
    }
}
