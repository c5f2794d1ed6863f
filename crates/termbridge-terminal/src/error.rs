use thiserror::Error;

/// Errors from terminal session operations.
///
/// `SessionNotFound` is kept distinct from everything else so callers can
/// tell "ask the user to reconnect" apart from a genuine failure.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("failed to spawn shell: {0}")]
    SpawnFailed(String),

    #[error("session '{0}' not found")]
    SessionNotFound(String),

    #[error("PTY resize failed: {0}")]
    ResizeFailed(String),

    #[error("maximum concurrent sessions ({0}) reached")]
    SessionLimit(usize),

    #[error("process already exited")]
    ProcessExited,

    #[error("PTY I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TerminalError {
    /// True when the error means the session id is simply unknown.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TerminalError::SessionNotFound(_))
    }
}
