use futures_util::StreamExt;
use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::events::TerminalEvent;
use crate::sse::{SseDecoder, SseFrame};
use crate::state::{ConnectionState, ReconnectPolicy, ReconnectState};

/// Errors from the terminal client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server does not know this session; the caller should
    /// re-subscribe rather than retry the command.
    #[error("session '{0}' not found on server")]
    SessionNotFound(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("reconnection attempts exhausted")]
    GaveUp,
}

/// What the embedding UI receives while the client runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientUpdate {
    State(ConnectionState),
    Event(TerminalEvent),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server base URL, e.g. `http://127.0.0.1:3001`.
    pub base_url: String,
    pub session_id: String,
    pub policy: ReconnectPolicy,
}

/// Client for one logical terminal: subscribes to the output stream with
/// automatic bounded-backoff reconnection, and sends input/resize commands
/// out-of-band.
pub struct TerminalClient {
    config: ClientConfig,
    http: reqwest::Client,
    shutdown: CancellationToken,
}

impl TerminalClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Token for user-initiated teardown (closing the panel, navigating
    /// away). Cancelling it stops the run loop and any pending retry
    /// without counting as a failure.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Send input bytes to the session, verbatim.
    pub async fn send_input(&self, input: &str) -> Result<(), ClientError> {
        self.send_command(json!({
            "sessionId": self.config.session_id,
            "input": input,
        }))
        .await
    }

    /// Request new terminal geometry.
    pub async fn resize(&self, cols: u16, rows: u16) -> Result<(), ClientError> {
        self.send_command(json!({
            "sessionId": self.config.session_id,
            "cols": cols,
            "rows": rows,
        }))
        .await
    }

    async fn send_command(&self, body: serde_json::Value) -> Result<(), ClientError> {
        let url = format!("{}/api/terminal", self.config.base_url);
        let response = self.http.post(&url).json(&body).send().await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else if status == reqwest::StatusCode::NOT_FOUND {
            Err(ClientError::SessionNotFound(
                self.config.session_id.clone(),
            ))
        } else {
            Err(ClientError::Protocol(format!(
                "command rejected with status {status}"
            )))
        }
    }

    /// Run the subscription until the user shuts it down or the retry
    /// budget is exhausted. Decoded events and state transitions are pushed
    /// to `updates`.
    pub async fn run(
        &self,
        updates: mpsc::UnboundedSender<ClientUpdate>,
    ) -> Result<(), ClientError> {
        let mut state = ReconnectState::new(self.config.policy.clone());

        loop {
            if !state.begin_attempt() {
                break;
            }
            let _ = updates.send(ClientUpdate::State(ConnectionState::Connecting));

            let outcome = tokio::select! {
                _ = self.shutdown.cancelled() => {
                    state.user_closed();
                    let _ = updates.send(ClientUpdate::State(ConnectionState::Disconnected));
                    return Ok(());
                }
                outcome = self.stream_once(&mut state, &updates) => outcome,
            };

            if let Err(e) = outcome {
                log::warn!(
                    "terminal stream for '{}' failed: {e}",
                    self.config.session_id
                );
            } else {
                log::warn!(
                    "terminal stream for '{}' ended unexpectedly",
                    self.config.session_id
                );
            }

            match state.connection_failed() {
                Some(delay) => {
                    log::info!(
                        "reconnecting to '{}' in {}ms (attempt {})",
                        self.config.session_id,
                        delay.as_millis(),
                        state.attempts()
                    );
                    tokio::select! {
                        _ = self.shutdown.cancelled() => {
                            state.user_closed();
                            let _ = updates.send(ClientUpdate::State(ConnectionState::Disconnected));
                            return Ok(());
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => break,
            }
        }

        let _ = updates.send(ClientUpdate::State(ConnectionState::GaveUp));
        Err(ClientError::GaveUp)
    }

    /// One subscription attempt: consume the stream until it ends or errors.
    async fn stream_once(
        &self,
        state: &mut ReconnectState,
        updates: &mpsc::UnboundedSender<ClientUpdate>,
    ) -> Result<(), ClientError> {
        let url = format!(
            "{}/api/terminal?sessionId={}",
            self.config.base_url, self.config.session_id
        );
        let response = self.http.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Protocol(format!(
                "subscribe rejected with status {}",
                response.status()
            )));
        }

        let mut stream = response.bytes_stream();
        let mut decoder = SseDecoder::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            for frame in decoder.push(&chunk) {
                match frame {
                    SseFrame::Comment(comment) => {
                        // Keepalives carry no terminal output.
                        log::trace!("stream comment: {comment}");
                    }
                    SseFrame::Data(data) => match serde_json::from_str::<TerminalEvent>(&data) {
                        Ok(event) => {
                            if let TerminalEvent::Connected { connection_id, .. } = &event {
                                state.connection_established(connection_id);
                                let _ =
                                    updates.send(ClientUpdate::State(ConnectionState::Connected));
                            }
                            let _ = updates.send(ClientUpdate::Event(event));
                        }
                        Err(e) => {
                            log::warn!("failed to parse terminal event: {e} ({data})");
                        }
                    },
                }
            }
        }

        // The server never ends the stream on its own while the session is
        // healthy, so running dry counts as a transport failure.
        Ok(())
    }
}
