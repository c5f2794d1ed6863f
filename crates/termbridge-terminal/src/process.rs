/// Process abstraction over the OS-level PTY facility.
///
/// The registry and fan-out only ever talk to these traits, so a test double
/// can stand in for the real PTY without touching either.
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};

use crate::error::TerminalError;
use crate::shell::ShellConfig;

/// Capability set of one live shell process.
///
/// Output is a raw byte stream fanned out through a broadcast channel: every
/// subscriber receives every chunk emitted after it subscribed, in emission
/// order. Chunk boundaries carry no meaning; consumers must treat the
/// concatenation as canonical.
pub trait ProcessHandle: Send + Sync {
    /// Write bytes verbatim to the process input. No interpretation, no
    /// added buffering.
    fn write_input(&self, data: &[u8]) -> Result<(), TerminalError>;

    /// Forward new terminal geometry to the process.
    fn resize(&self, cols: u16, rows: u16) -> Result<(), TerminalError>;

    /// Terminate the process.
    fn kill(&self) -> Result<(), TerminalError>;

    /// Subscribe to the raw output stream.
    fn subscribe_output(&self) -> broadcast::Receiver<Vec<u8>>;

    /// Watch for process exit. The value flips to `true` exactly once.
    fn subscribe_exit(&self) -> watch::Receiver<bool>;

    /// Check whether the process is still running.
    fn is_alive(&self) -> bool;
}

/// Spawns process handles. The real implementation opens a PTY; tests
/// substitute an in-memory fake.
#[async_trait]
pub trait ProcessFactory: Send + Sync {
    async fn spawn(&self, config: &ShellConfig) -> Result<Arc<dyn ProcessHandle>, TerminalError>;
}
