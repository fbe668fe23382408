//! Control-channel wire format between hosted content and the orchestrator.
//!
//! Content posts JSON objects tagged by `type` through `window.ipc`. Replies
//! and pushes go back as `{"channel": ..., "payload": ...}` envelopes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Push channel carrying the surface's maximize state (boolean).
pub const MAXIMIZE_STATE_CHANNEL: &str = "maximize-state-changed";

/// Reply channel for [`ControlRequest::IsWindowMaximized`].
pub const IS_MAXIMIZED_CHANNEL: &str = "is-window-maximized";

/// Largest control message accepted from content.
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ControlRequest {
    CloseWindow,
    MinimizeWindow,
    /// Toggle between maximized and restored.
    MaximizeWindow,
    IsWindowMaximized {
        #[serde(default, rename = "requestId")]
        request_id: u64,
    },
    ContentReady,
}

impl ControlRequest {
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

/// Messages posted by the loading placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum OverlaySignal {
    OverlayPainted,
}

impl OverlaySignal {
    pub fn parse(body: &str) -> Result<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    channel: &'a str,
    payload: &'a Value,
}

/// Serialize a push for delivery to content.
pub fn envelope(channel: &str, payload: &Value) -> Result<String> {
    Ok(serde_json::to_string(&Envelope { channel, payload })?)
}

/// Payload answering an `isWindowMaximized` request.
pub fn maximized_reply(request_id: u64, value: bool) -> Value {
    serde_json::json!({ "requestId": request_id, "value": value })
}
