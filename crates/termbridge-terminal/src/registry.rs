use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::error::TerminalError;
use crate::process::ProcessFactory;
use crate::session::{Session, SessionInfo};
use crate::shell::ShellConfig;
use crate::MAX_CONCURRENT_SESSIONS;

/// Single owner of every live session and its process handle.
///
/// Only the registry may spawn or kill processes. The map lock is held
/// across the spawn so two concurrent `get_or_create` calls for the same
/// unknown key cannot race into a duplicate process.
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<String, Arc<Session>>>>,
    factory: Arc<dyn ProcessFactory>,
    max_sessions: usize,
}

impl SessionRegistry {
    pub fn new(factory: Arc<dyn ProcessFactory>) -> Self {
        Self::with_limit(factory, MAX_CONCURRENT_SESSIONS)
    }

    pub fn with_limit(factory: Arc<dyn ProcessFactory>, max_sessions: usize) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            factory,
            max_sessions,
        }
    }

    /// Return the live session for `session_id`, spawning it first if none
    /// exists. The config only applies to a fresh spawn; an existing session
    /// is returned untouched.
    ///
    /// On spawn failure nothing is registered: the caller sees the error
    /// and the key stays free.
    pub async fn get_or_create(
        &self,
        session_id: &str,
        config: &ShellConfig,
    ) -> Result<Arc<Session>, TerminalError> {
        let mut sessions = self.sessions.lock().await;

        if let Some(existing) = sessions.get(session_id) {
            if existing.is_alive() {
                return Ok(Arc::clone(existing));
            }
            // The process died but the exit watcher hasn't evicted it yet;
            // treat the key as free.
            let stale = sessions.remove(session_id);
            if let Some(stale) = stale {
                stale.shutdown();
            }
        }

        if sessions.len() >= self.max_sessions {
            return Err(TerminalError::SessionLimit(self.max_sessions));
        }

        let handle = self.factory.spawn(config).await?;
        let session = Arc::new(Session::new(session_id.to_string(), handle, config));
        sessions.insert(session_id.to_string(), Arc::clone(&session));
        drop(sessions);

        log::info!("session '{session_id}' spawned");
        self.watch_exit(Arc::clone(&session));

        Ok(session)
    }

    /// Look up a live session without creating one.
    pub async fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.lock().await.get(session_id).cloned()
    }

    /// Metadata snapshot of every registered session.
    pub async fn list(&self) -> Vec<SessionInfo> {
        let sessions = self.sessions.lock().await;
        let mut infos: Vec<SessionInfo> = sessions.values().map(|s| s.info()).collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Explicitly stop a session: kill its process, evict it, and cascade
    /// cleanup into every observer.
    pub async fn remove(&self, session_id: &str) -> Result<(), TerminalError> {
        let session = self
            .sessions
            .lock()
            .await
            .remove(session_id)
            .ok_or_else(|| TerminalError::SessionNotFound(session_id.to_string()))?;
        session.stop();
        log::info!("session '{session_id}' stopped");
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Watch for the process exiting on its own (e.g. the user typed
    /// `exit`). When it does: evict the entry and cancel the session so
    /// every observer runs its cleanup, even though the process, not any
    /// observer, initiated the teardown.
    fn watch_exit(&self, session: Arc<Session>) {
        let sessions = Arc::clone(&self.sessions);
        let mut exit_rx = session.subscribe_exit();
        tokio::spawn(async move {
            while !*exit_rx.borrow() {
                if exit_rx.changed().await.is_err() {
                    break;
                }
            }
            let id = session.id().to_string();
            // An explicit stop may have already evicted this entry, or a
            // newer session may have taken the key; only evict the exact
            // session we watched. The cascade always runs.
            {
                let mut map = sessions.lock().await;
                match map.get(&id) {
                    Some(current) if Arc::ptr_eq(current, &session) => {
                        map.remove(&id);
                        log::info!("session '{id}' exited");
                    }
                    _ => {}
                }
            }
            session.shutdown();
        });
    }
}
