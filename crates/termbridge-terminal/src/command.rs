use std::sync::Arc;

use crate::error::TerminalError;
use crate::registry::SessionRegistry;

/// Requested terminal geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resize {
    pub cols: u16,
    pub rows: u16,
}

/// A command targeted at one session. Input and resize are independent
/// operations that happen to share a request; either, both, or neither may
/// be present.
#[derive(Debug, Clone, Default)]
pub struct SessionCommand {
    pub input: Option<String>,
    pub resize: Option<Resize>,
}

impl SessionCommand {
    pub fn is_empty(&self) -> bool {
        self.input.is_none() && self.resize.is_none()
    }
}

/// Write-only command path into live sessions.
///
/// Commands never create sessions: an unknown id is `SessionNotFound`, kept
/// distinct so the caller can prompt for a reconnect instead of showing a
/// generic failure.
pub struct CommandChannel {
    registry: Arc<SessionRegistry>,
}

impl CommandChannel {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// Apply `command` to the session. Input bytes are written verbatim,
    /// no interpretation, no added line buffering. Both operations are
    /// attempted even if the first fails; the first failure is reported.
    pub async fn dispatch(
        &self,
        session_id: &str,
        command: &SessionCommand,
    ) -> Result<(), TerminalError> {
        let session = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| TerminalError::SessionNotFound(session_id.to_string()))?;

        let input_result = match &command.input {
            Some(input) => session.write_input(input.as_bytes()),
            None => Ok(()),
        };
        let resize_result = match command.resize {
            Some(Resize { cols, rows }) => session.resize(cols, rows),
            None => Ok(()),
        };

        input_result.and(resize_result)
    }
}
