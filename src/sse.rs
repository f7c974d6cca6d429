//! Server-Sent Events (SSE) stream decoding.
//!
//! SSE format:
//! ```text
//! data: {"key": "value"}
//!
//! data: {"another": "event"}
//!
//! data: [DONE]
//! ```
//!
//! The decoder buffers raw bytes until a complete `data:` line has
//! arrived, so frames split across arbitrary chunk boundaries (including
//! mid-JSON and mid-UTF-8) are reassembled before being surfaced.

use serde_json::Value;

/// Incremental decoder for one SSE response stream.
///
/// One decoder per stream; the partial-frame buffer must never be shared
/// between concurrent streaming calls.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    buffer: Vec<u8>,
    done: bool,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the `[DONE]` sentinel has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed a raw network chunk, returning the complete frame payloads
    /// it finished.
    ///
    /// Incomplete trailing data stays buffered for the next call. Once
    /// the `[DONE]` sentinel is seen the decoder stops producing frames
    /// and discards everything after it.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        if self.done {
            return Vec::new();
        }

        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line_bytes);
            let line = line.trim();

            if line.is_empty() {
                continue;
            }

            if let Some(data) = parse_sse_line(line) {
                if is_done_marker(data) {
                    self.done = true;
                    self.buffer.clear();
                    break;
                }
                frames.push(data.to_string());
            }
        }

        frames
    }

    /// Feed a raw network chunk and return the decoded text fragment it
    /// produced, concatenating the content deltas of every frame the
    /// chunk completed. Returns `None` when no content was produced.
    pub fn feed_content(&mut self, chunk: &[u8]) -> Option<String> {
        let fragment: String = self
            .feed(chunk)
            .iter()
            .filter_map(|frame| delta_content(frame))
            .collect();

        if fragment.is_empty() {
            None
        } else {
            Some(fragment)
        }
    }
}

/// Parse an SSE line to extract the data portion.
///
/// SSE lines are in the format: `data: <content>`
///
/// # Example
/// ```
/// use petalflow::sse::parse_sse_line;
///
/// let line = "data: {\"key\": \"value\"}";
/// assert_eq!(parse_sse_line(line), Some("{\"key\": \"value\"}"));
///
/// let line = "invalid";
/// assert_eq!(parse_sse_line(line), None);
/// ```
pub fn parse_sse_line(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(|s| s.trim())
}

/// Check if an SSE data line indicates the stream is done.
///
/// # Example
/// ```
/// use petalflow::sse::is_done_marker;
///
/// assert!(is_done_marker("[DONE]"));
/// assert!(!is_done_marker("{\"data\": \"value\"}"));
/// ```
pub fn is_done_marker(data: &str) -> bool {
    data == "[DONE]"
}

/// Extract the first choice's delta content from a frame payload.
///
/// Frames that are not valid JSON, or that carry no content (role-only
/// deltas, finish frames), yield `None` rather than an error; the
/// upstream stream is a trusted first-party source.
pub fn delta_content(frame: &str) -> Option<String> {
    let value: Value = serde_json::from_str(frame).ok()?;
    value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()
        .map(str::to_string)
}
