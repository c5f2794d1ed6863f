use serde::{Deserialize, Serialize};

use termbridge_terminal::{Resize, SessionCommand};

/// Events pushed to one observer over the subscription stream.
///
/// Keepalives are not events; they go out as comment frames and never
/// reach the JSON layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Emitted exactly once, immediately after the subscription succeeds.
    #[serde(rename_all = "camelCase")]
    Connected {
        session_id: String,
        connection_id: String,
    },
    /// A chunk of raw process output, in arrival order.
    Output { data: String },
}

/// Body of the write-path command request. `input` and the resize pair are
/// independent; either, both, or neither may be present.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandBody {
    pub session_id: String,
    #[serde(default)]
    pub input: Option<String>,
    #[serde(default)]
    pub cols: Option<u16>,
    #[serde(default)]
    pub rows: Option<u16>,
}

impl CommandBody {
    /// A resize is only meaningful with both dimensions present.
    pub fn to_command(&self) -> SessionCommand {
        let resize = match (self.cols, self.rows) {
            (Some(cols), Some(rows)) => Some(Resize { cols, rows }),
            _ => None,
        };
        SessionCommand {
            input: self.input.clone(),
            resize,
        }
    }
}

/// Acknowledgment for a successful command.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandAck {
    pub success: bool,
    pub session_id: String,
}
