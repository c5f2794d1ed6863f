/// Incremental decoder for text event-stream framing.
///
/// Records are blocks terminated by a blank line; `data:` lines carry
/// payloads and lines starting with `:` are comments (the server uses them
/// for keepalives). Network chunk boundaries are arbitrary, so the decoder
/// buffers until a full record is available.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: String,
}

/// One decoded frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Data(String),
    Comment(String),
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw transport bytes; returns every frame completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut frames = Vec::new();
        while let Some(record_end) = self.buffer.find("\n\n") {
            let record = self.buffer[..record_end].to_string();
            self.buffer = self.buffer[record_end + 2..].to_string();

            for line in record.lines() {
                if let Some(data) = line.strip_prefix("data:") {
                    frames.push(SseFrame::Data(data.trim_start().to_string()));
                } else if let Some(comment) = line.strip_prefix(':') {
                    frames.push(SseFrame::Comment(comment.trim_start().to_string()));
                }
                // Other field names (event:, id:, retry:) are not part of
                // this protocol and are ignored.
            }
        }
        frames
    }
}
