// Terminal session management module
//
// This module keeps one shell-backed PTY process alive per logical session,
// fans its raw output out to any number of concurrently attached observers,
// and accepts input/resize commands targeted at a session. Process lifetime
// and observer lifetime are deliberately decoupled: an observer detaching
// never touches the process, and the process exiting cascades cleanup into
// every observer.

mod command;
mod error;
mod process;
mod pty;
mod registry;
mod session;
mod shell;

// Re-export public API
pub use command::{CommandChannel, Resize, SessionCommand};
pub use error::TerminalError;
pub use process::{ProcessFactory, ProcessHandle};
pub use pty::{PtyProcess, PtyProcessFactory};
pub use registry::SessionRegistry;
pub use session::{ObserverGuard, Session, SessionInfo};
pub use shell::ShellConfig;

// Constants
pub const DEFAULT_SESSION_ID: &str = "default";
pub const DEFAULT_COLS: u16 = 80;
pub const DEFAULT_ROWS: u16 = 24;
pub const MAX_CONCURRENT_SESSIONS: usize = 15;
pub const OUTPUT_CHANNEL_CAPACITY: usize = 256;
