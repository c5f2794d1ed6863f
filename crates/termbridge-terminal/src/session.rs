use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::error::TerminalError;
use crate::process::ProcessHandle;
use crate::shell::ShellConfig;

/// One logical terminal session: a named, long-lived shell process plus the
/// state shared by everyone observing it.
///
/// The session's cancellation token is the teardown broadcast: it is
/// cancelled exactly when the process is gone (exit or explicit stop), and
/// every observer stream ends when it fires.
pub struct Session {
    id: String,
    handle: Arc<dyn ProcessHandle>,
    created_at: DateTime<Utc>,
    working_dir: Option<PathBuf>,
    size: Mutex<(u16, u16)>,
    cancel: CancellationToken,
    observers: AtomicUsize,
}

/// Snapshot of session metadata for listing and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: String,
    pub created_at: String,
    pub cols: u16,
    pub rows: u16,
    pub working_dir: Option<String>,
    pub observers: usize,
    pub alive: bool,
}

impl Session {
    pub fn new(id: String, handle: Arc<dyn ProcessHandle>, config: &ShellConfig) -> Self {
        Self {
            id,
            handle,
            created_at: Utc::now(),
            working_dir: config.working_dir.clone(),
            size: Mutex::new((config.cols, config.rows)),
            cancel: CancellationToken::new(),
            observers: AtomicUsize::new(0),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_alive(&self) -> bool {
        self.handle.is_alive()
    }

    /// Attach one observer: a fresh subscription to the output stream plus
    /// the guard that owns this observer's cleanup.
    pub fn attach(self: &Arc<Self>) -> (broadcast::Receiver<Vec<u8>>, ObserverGuard) {
        let rx = self.handle.subscribe_output();
        self.observers.fetch_add(1, Ordering::SeqCst);
        log::debug!(
            "session '{}': observer attached ({} active)",
            self.id,
            self.observers.load(Ordering::SeqCst)
        );
        let guard = ObserverGuard {
            session: Arc::clone(self),
            closed: AtomicBool::new(false),
        };
        (rx, guard)
    }

    /// Token observers select on; fires on process exit or explicit stop.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Watch for process exit, for the registry's exit watcher.
    pub fn subscribe_exit(&self) -> tokio::sync::watch::Receiver<bool> {
        self.handle.subscribe_exit()
    }

    pub fn write_input(&self, data: &[u8]) -> Result<(), TerminalError> {
        self.handle.write_input(data)
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), TerminalError> {
        self.handle.resize(cols, rows)?;
        *self.size.lock().unwrap() = (cols, rows);
        Ok(())
    }

    /// Cascade teardown into every observer. Idempotent; does not touch the
    /// process (used when the process is already gone).
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Explicit stop: kill the process and cascade teardown.
    pub fn stop(&self) {
        if let Err(e) = self.handle.kill() {
            log::warn!("session '{}': kill failed: {e}", self.id);
        }
        self.cancel.cancel();
    }

    pub fn observer_count(&self) -> usize {
        self.observers.load(Ordering::SeqCst)
    }

    pub fn info(&self) -> SessionInfo {
        let (cols, rows) = *self.size.lock().unwrap();
        SessionInfo {
            id: self.id.clone(),
            created_at: self.created_at.to_rfc3339(),
            cols,
            rows,
            working_dir: self
                .working_dir
                .as_ref()
                .map(|dir| dir.display().to_string()),
            observers: self.observer_count(),
            alive: self.is_alive(),
        }
    }
}

/// Owns exactly one observer's cleanup.
///
/// `close` has a single authoritative closed transition: however many code
/// paths race to trigger it (client disconnect, write failure, keepalive
/// failure, process-exit cascade), the bookkeeping runs once. Dropping the
/// guard closes it too, so abandoning the observer's stream future is enough.
pub struct ObserverGuard {
    session: Arc<Session>,
    closed: AtomicBool,
}

impl ObserverGuard {
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.session.observers.fetch_sub(1, Ordering::SeqCst);
        log::debug!(
            "session '{}': observer detached ({} active)",
            self.session.id,
            self.session.observer_count()
        );
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        self.close();
    }
}
