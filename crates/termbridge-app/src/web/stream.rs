use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use axum::response::sse::Event;
use chrono::Utc;
use futures::Stream;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval_at, Instant};

use termbridge_terminal::Session;

use crate::web::protocol::ServerEvent;

/// One turn of the observer loop.
enum Step {
    Emit(Event),
    Skip,
    Stop,
}

/// Build the event stream for one observer.
///
/// Emits `connected` first, then output chunks as they arrive, with
/// keepalive comments on idle gaps. The stream ends when the session is
/// torn down (process exit or explicit stop). If the transport dies
/// instead, axum abandons this future and dropping the guard runs the same
/// cleanup, so a dead observer can never wedge the session or its
/// siblings.
pub fn observer_stream(
    session: Arc<Session>,
    session_id: String,
    connection_id: String,
    keepalive: Duration,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream! {
        let cancel = session.cancellation();
        let (mut output_rx, guard) = session.attach();

        let connected = ServerEvent::Connected {
            session_id: session_id.clone(),
            connection_id: connection_id.clone(),
        };

        if let Ok(event) = Event::default().json_data(&connected) {
            yield Ok::<Event, Infallible>(event);

            let mut keepalive_timer = interval_at(Instant::now() + keepalive, keepalive);

            loop {
                let step = tokio::select! {
                    _ = cancel.cancelled() => {
                        log::debug!("connection {connection_id}: session torn down");
                        Step::Stop
                    }
                    chunk = output_rx.recv() => match chunk {
                        Ok(bytes) => {
                            let output = ServerEvent::Output {
                                data: String::from_utf8_lossy(&bytes).into_owned(),
                            };
                            match Event::default().json_data(&output) {
                                Ok(event) => Step::Emit(event),
                                Err(e) => {
                                    log::warn!(
                                        "connection {connection_id}: failed to encode output: {e}"
                                    );
                                    Step::Stop
                                }
                            }
                        }
                        // Only this observer fell behind; it rejoins the
                        // live stream and nobody else notices.
                        Err(RecvError::Lagged(skipped)) => {
                            log::warn!(
                                "connection {connection_id}: dropped {skipped} output chunks"
                            );
                            Step::Skip
                        }
                        Err(RecvError::Closed) => Step::Stop,
                    },
                    _ = keepalive_timer.tick() => {
                        let comment = format!("keepalive {}", Utc::now().timestamp_millis());
                        Step::Emit(Event::default().comment(comment))
                    }
                };

                match step {
                    Step::Emit(event) => yield Ok(event),
                    Step::Skip => {}
                    Step::Stop => break,
                }
            }
        } else {
            log::error!("connection {connection_id}: failed to encode connected event");
        }

        guard.close();
    }
}
