use serde::Deserialize;

/// Events the server pushes over the subscription stream.
///
/// Keepalive comments never reach this type; the stream decoder drops them
/// before JSON parsing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TerminalEvent {
    /// First event on every successful subscription.
    #[serde(rename_all = "camelCase")]
    Connected {
        session_id: String,
        connection_id: String,
    },
    /// A chunk of raw process output. Chunk boundaries are arbitrary;
    /// concatenation is the canonical output.
    Output { data: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_connected_event() {
        let event: TerminalEvent = serde_json::from_str(
            r#"{"type":"connected","sessionId":"s1","connectionId":"s1-1700000000000-ab12cd34"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            TerminalEvent::Connected {
                session_id: "s1".to_string(),
                connection_id: "s1-1700000000000-ab12cd34".to_string(),
            }
        );
    }

    #[test]
    fn parses_output_event() {
        let event: TerminalEvent =
            serde_json::from_str(r#"{"type":"output","data":"hi\r\n"}"#).unwrap();
        assert_eq!(
            event,
            TerminalEvent::Output {
                data: "hi\r\n".to_string()
            }
        );
    }

    #[test]
    fn unknown_event_kind_is_an_error() {
        let result = serde_json::from_str::<TerminalEvent>(r#"{"type":"mystery"}"#);
        assert!(result.is_err());
    }
}
