#![cfg(unix)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{Stream, StreamExt};
use tokio::time::timeout;

use termbridge::web::{create_router, AppState};
use termbridge_client::{
    ClientConfig, ClientUpdate, ConnectionState, ReconnectPolicy, SseDecoder, SseFrame,
    TerminalClient, TerminalEvent,
};
use termbridge_terminal::{CommandChannel, PtyProcessFactory, SessionRegistry, ShellConfig};

const DEADLINE: Duration = Duration::from_secs(10);

async fn spawn_server(keepalive: Duration) -> (String, Arc<SessionRegistry>) {
    let registry = Arc::new(SessionRegistry::new(Arc::new(PtyProcessFactory)));
    let commands = Arc::new(CommandChannel::new(Arc::clone(&registry)));
    let state = AppState {
        registry: Arc::clone(&registry),
        commands,
        shell: ShellConfig {
            command: Some("/bin/sh".to_string()),
            ..Default::default()
        },
        keepalive,
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), registry)
}

async fn subscribe(base: &str, session_id: &str) -> reqwest::Response {
    let response = reqwest::get(format!("{base}/api/terminal?sessionId={session_id}"))
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(
        response
            .headers()
            .get("cache-control")
            .and_then(|v| v.to_str().ok()),
        Some("no-cache")
    );
    response
}

/// Pull the next frame off an SSE byte stream, buffering partial records.
async fn next_frame<S, B, E>(
    stream: &mut S,
    decoder: &mut SseDecoder,
    pending: &mut VecDeque<SseFrame>,
) -> Option<SseFrame>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    loop {
        if let Some(frame) = pending.pop_front() {
            return Some(frame);
        }
        match stream.next().await {
            Some(Ok(chunk)) => pending.extend(decoder.push(chunk.as_ref())),
            _ => return None,
        }
    }
}

/// Next decoded event, skipping keepalive comments.
async fn next_event<S, B, E>(
    stream: &mut S,
    decoder: &mut SseDecoder,
    pending: &mut VecDeque<SseFrame>,
) -> Option<TerminalEvent>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    loop {
        match next_frame(stream, decoder, pending).await? {
            SseFrame::Comment(_) => continue,
            SseFrame::Data(data) => return serde_json::from_str(&data).ok(),
        }
    }
}

/// Accumulate output events until the concatenation contains `marker`.
async fn collect_output_until<S, B, E>(
    stream: &mut S,
    decoder: &mut SseDecoder,
    pending: &mut VecDeque<SseFrame>,
    marker: &str,
) -> String
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let mut collected = String::new();
    while !collected.contains(marker) {
        match next_event(stream, decoder, pending).await {
            Some(TerminalEvent::Output { data }) => collected.push_str(&data),
            Some(_) => {}
            None => break,
        }
    }
    collected
}

async fn send_command(base: &str, body: serde_json::Value) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{base}/api/terminal"))
        .json(&body)
        .send()
        .await
        .unwrap()
}

async fn session_list(base: &str) -> Vec<serde_json::Value> {
    let body: serde_json::Value = reqwest::get(format!("{base}/api/sessions"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["sessions"].as_array().cloned().unwrap_or_default()
}

#[tokio::test]
async fn connected_precedes_output_and_echo_round_trips() {
    let (base, registry) = spawn_server(Duration::from_millis(500)).await;

    let response = subscribe(&base, "s1").await;
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut pending = VecDeque::new();

    // The very first event must be `connected`, before any output.
    let first = timeout(DEADLINE, next_event(&mut stream, &mut decoder, &mut pending))
        .await
        .unwrap()
        .unwrap();
    match first {
        TerminalEvent::Connected {
            session_id,
            connection_id,
        } => {
            assert_eq!(session_id, "s1");
            assert!(connection_id.starts_with("s1-"));
        }
        other => panic!("expected connected first, got {other:?}"),
    }

    let ack = send_command(
        &base,
        serde_json::json!({"sessionId": "s1", "input": "echo hi\n"}),
    )
    .await;
    assert!(ack.status().is_success());
    let ack: serde_json::Value = ack.json().await.unwrap();
    assert_eq!(ack["success"], true);
    assert_eq!(ack["sessionId"], "s1");

    let output = timeout(
        DEADLINE,
        collect_output_until(&mut stream, &mut decoder, &mut pending, "hi"),
    )
    .await
    .unwrap();
    assert!(output.contains("hi"), "expected 'hi' in output: {output}");

    // Closing the observer must leave the process running.
    drop(stream);

    let mut observers_drained = false;
    for _ in 0..50 {
        let sessions = session_list(&base).await;
        let s1 = sessions.iter().find(|s| s["id"] == "s1").unwrap();
        assert_eq!(s1["alive"], true, "process must outlive its observers");
        if s1["observers"] == 0 {
            observers_drained = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
    assert!(observers_drained, "observer cleanup never ran");
    assert!(registry.get("s1").await.unwrap().is_alive());
}

#[tokio::test]
async fn two_observers_see_the_same_output_in_order() {
    let (base, _registry) = spawn_server(Duration::from_secs(30)).await;

    let mut stream_a = subscribe(&base, "shared").await.bytes_stream();
    let mut decoder_a = SseDecoder::new();
    let mut pending_a = VecDeque::new();
    let first_a = timeout(
        DEADLINE,
        next_event(&mut stream_a, &mut decoder_a, &mut pending_a),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(matches!(first_a, TerminalEvent::Connected { .. }));

    let mut stream_b = subscribe(&base, "shared").await.bytes_stream();
    let mut decoder_b = SseDecoder::new();
    let mut pending_b = VecDeque::new();
    let first_b = timeout(
        DEADLINE,
        next_event(&mut stream_b, &mut decoder_b, &mut pending_b),
    )
    .await
    .unwrap()
    .unwrap();
    assert!(matches!(first_b, TerminalEvent::Connected { .. }));

    let ack = send_command(
        &base,
        serde_json::json!({
            "sessionId": "shared",
            "input": "echo ONE_M; echo TWO_M; echo THREE_M\n",
        }),
    )
    .await;
    assert!(ack.status().is_success());

    let out_a = timeout(
        DEADLINE,
        collect_output_until(&mut stream_a, &mut decoder_a, &mut pending_a, "THREE_M"),
    )
    .await
    .unwrap();
    let out_b = timeout(
        DEADLINE,
        collect_output_until(&mut stream_b, &mut decoder_b, &mut pending_b, "THREE_M"),
    )
    .await
    .unwrap();

    for output in [&out_a, &out_b] {
        let one = output.find("ONE_M").unwrap();
        let two = output.find("TWO_M").unwrap();
        let three = output.find("THREE_M").unwrap();
        assert!(one < two && two < three, "markers out of order: {output}");
    }
}

#[tokio::test]
async fn unknown_session_command_is_distinct_404() {
    let (base, registry) = spawn_server(Duration::from_secs(30)).await;

    let response = send_command(
        &base,
        serde_json::json!({"sessionId": "missing", "input": "echo nope\n"}),
    )
    .await;

    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "session not found");

    // Commands never create sessions.
    assert!(registry.is_empty().await);
}

#[tokio::test]
async fn resize_command_is_acknowledged() {
    let (base, registry) = spawn_server(Duration::from_secs(30)).await;

    let response = subscribe(&base, "geo").await;
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut pending = VecDeque::new();
    timeout(DEADLINE, next_event(&mut stream, &mut decoder, &mut pending))
        .await
        .unwrap()
        .unwrap();

    let ack = send_command(
        &base,
        serde_json::json!({"sessionId": "geo", "cols": 120, "rows": 40}),
    )
    .await;
    assert!(ack.status().is_success());

    let info = registry.get("geo").await.unwrap().info();
    assert_eq!((info.cols, info.rows), (120, 40));
}

#[tokio::test]
async fn keepalive_comments_flow_on_idle_stream() {
    let (base, _registry) = spawn_server(Duration::from_millis(300)).await;

    let response = subscribe(&base, "idle").await;
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut pending = VecDeque::new();

    let mut saw_keepalive = false;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        let frame = timeout(
            Duration::from_secs(2),
            next_frame(&mut stream, &mut decoder, &mut pending),
        )
        .await;
        if let Ok(Some(SseFrame::Comment(comment))) = frame {
            assert!(
                comment.starts_with("keepalive "),
                "unexpected comment: {comment}"
            );
            // Timestamp payload is epoch millis.
            let stamp = comment.trim_start_matches("keepalive ").trim();
            assert!(stamp.parse::<i64>().is_ok(), "bad timestamp: {stamp}");
            saw_keepalive = true;
            break;
        }
    }
    assert!(saw_keepalive, "no keepalive comment within deadline");
}

#[tokio::test]
async fn missing_session_id_falls_back_to_default() {
    let (base, _registry) = spawn_server(Duration::from_secs(30)).await;

    let response = reqwest::get(format!("{base}/api/terminal")).await.unwrap();
    assert!(response.status().is_success());
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut pending = VecDeque::new();

    let first = timeout(DEADLINE, next_event(&mut stream, &mut decoder, &mut pending))
        .await
        .unwrap()
        .unwrap();
    match first {
        TerminalEvent::Connected { session_id, .. } => assert_eq!(session_id, "default"),
        other => panic!("expected connected, got {other:?}"),
    }
}

#[tokio::test]
async fn explicit_stop_ends_streams_and_evicts() {
    let (base, registry) = spawn_server(Duration::from_secs(30)).await;

    let response = subscribe(&base, "doomed").await;
    let mut stream = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut pending = VecDeque::new();
    timeout(DEADLINE, next_event(&mut stream, &mut decoder, &mut pending))
        .await
        .unwrap()
        .unwrap();

    let response = reqwest::Client::new()
        .delete(format!("{base}/api/sessions/doomed"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    // The teardown cascades into the open stream: it must end, not hang.
    let ended = timeout(DEADLINE, async {
        loop {
            if next_frame(&mut stream, &mut decoder, &mut pending)
                .await
                .is_none()
            {
                break;
            }
        }
    })
    .await;
    assert!(ended.is_ok(), "stream did not end after session stop");

    assert!(registry.get("doomed").await.is_none());

    // Stopping it again is a 404.
    let response = reqwest::Client::new()
        .delete(format!("{base}/api/sessions/doomed"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn terminal_client_round_trips_and_closes_cleanly() {
    let (base, _registry) = spawn_server(Duration::from_secs(30)).await;

    let client = Arc::new(TerminalClient::new(ClientConfig {
        base_url: base.clone(),
        session_id: "cli".to_string(),
        policy: ReconnectPolicy::default(),
    }));
    let shutdown = client.shutdown_token();

    let (tx, mut updates) = tokio::sync::mpsc::unbounded_channel();
    let runner = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.run(tx).await })
    };

    // Wait until the state machine reports Connected.
    timeout(DEADLINE, async {
        loop {
            match updates.recv().await {
                Some(ClientUpdate::State(ConnectionState::Connected)) => break,
                Some(_) => continue,
                None => panic!("update channel closed before connect"),
            }
        }
    })
    .await
    .unwrap();

    client.send_input("echo CLIENT_OK\n").await.unwrap();

    timeout(DEADLINE, async {
        let mut collected = String::new();
        loop {
            match updates.recv().await {
                Some(ClientUpdate::Event(TerminalEvent::Output { data })) => {
                    collected.push_str(&data);
                    if collected.contains("CLIENT_OK") {
                        break;
                    }
                }
                Some(_) => continue,
                None => panic!("update channel closed before output"),
            }
        }
    })
    .await
    .unwrap();

    // User-initiated close: the run loop must return cleanly, no retries.
    shutdown.cancel();
    let result = timeout(DEADLINE, runner).await.unwrap().unwrap();
    assert!(result.is_ok());
}
