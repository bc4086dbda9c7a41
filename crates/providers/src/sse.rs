//! Incremental decoder for `data: <json>` event streams.
//!
//! Network chunks split lines (and UTF-8 sequences) arbitrarily, so bytes are
//! buffered until a full line is available. A line fragment is never parsed.

use scenewright_core::error::FramingError;
use serde::Deserialize;
use tracing::{trace, warn};

/// A decoded unit of an event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    Delta(String),
    Done,
}

/// Where the text fragment lives in each chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeltaField {
    /// `choices[0].delta.content` (chat completions)
    ChatDelta,
    /// `choices[0].text` (text completions)
    CompletionText,
}

/// Longest line kept while waiting for its terminator.
const MAX_LINE_BYTES: usize = 1024 * 1024;

#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    field: DeltaField,
    done: bool,
    max_line: usize,
    /// Dropping the rest of an oversized line up to its `\n`.
    skipping: bool,
}

impl SseDecoder {
    pub fn new(field: DeltaField) -> Self {
        Self {
            buffer: Vec::new(),
            field,
            done: false,
            max_line: MAX_LINE_BYTES,
            skipping: false,
        }
    }

    #[cfg(test)]
    fn with_line_limit(mut self, max_line: usize) -> Self {
        self.max_line = max_line;
        self
    }

    /// Whether the terminal `[DONE]` marker has been seen.
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Feed one network chunk and collect every frame it completes.
    ///
    /// Nothing is decoded after `[DONE]`.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }
        self.buffer.extend_from_slice(chunk);

        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            if self.skipping {
                self.skipping = false;
                continue;
            }
            let Some(frame) = self.decode_line(&raw[..raw.len() - 1]) else {
                continue;
            };
            let is_done = frame == SseFrame::Done;
            frames.push(frame);
            if is_done {
                self.done = true;
                self.buffer.clear();
                return frames;
            }
        }

        if self.skipping {
            self.buffer.clear();
        } else if self.buffer.len() > self.max_line {
            warn!(
                pending = self.buffer.len(),
                limit = self.max_line,
                "Event-stream line exceeds limit, dropping it"
            );
            self.buffer.clear();
            self.skipping = true;
        }

        frames
    }

    /// Bytes still waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn decode_line(&self, raw: &[u8]) -> Option<SseFrame> {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim_end_matches('\r'),
            Err(e) => {
                warn!(error = %e, "Skipping SSE line with invalid UTF-8");
                return None;
            }
        };

        // Blank separators, comments and non-data fields carry no text
        let data = line.strip_prefix("data:")?.trim();
        if data == "[DONE]" {
            return Some(SseFrame::Done);
        }

        match parse_chunk(data, self.field) {
            Ok(Some(text)) => Some(SseFrame::Delta(text)),
            Ok(None) => {
                trace!(data = %data, "SSE chunk without text");
                None
            }
            Err(e) => {
                warn!(error = %e, data = %data, "Skipping undecodable SSE chunk");
                None
            }
        }
    }
}

// --- Chunk shapes (internal) ---

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// Extract the text fragment of one chunk. `Ok(None)` means a well-formed
/// chunk that carries no text (role preamble, finish reason).
fn parse_chunk(data: &str, field: DeltaField) -> Result<Option<String>, FramingError> {
    let chunk: StreamChunk =
        serde_json::from_str(data).map_err(|e| FramingError::InvalidJson {
            reason: e.to_string(),
        })?;

    if let Some(error) = chunk.error {
        return Err(FramingError::UnexpectedShape(format!(
            "error payload in stream: {error}"
        )));
    }

    let Some(choice) = chunk.choices.into_iter().next() else {
        return Ok(None);
    };

    let text = match field {
        DeltaField::ChatDelta => choice.delta.and_then(|d| d.content),
        DeltaField::CompletionText => choice.text,
    };
    Ok(text.filter(|t| !t.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reassembles_line_split_across_chunks() {
        let mut decoder = SseDecoder::new(DeltaField::ChatDelta);
        let first = decoder.feed(br#"data: {"choices":[{"delta":{"content":"Hel"#);
        assert!(first.is_empty());
        let second = decoder.feed(b"lo\"}}]}\n");
        assert_eq!(second, vec![SseFrame::Delta("Hello".into())]);
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn oversized_line_is_dropped() {
        let mut decoder = SseDecoder::new(DeltaField::ChatDelta).with_line_limit(16);
        assert!(decoder.feed(b"data: {\"choices\":[{\"delta\":").is_empty());
        assert_eq!(decoder.pending(), 0);
        // The rest of the oversized line is discarded too
        assert!(decoder.feed(b"{\"content\":\"lost\"}}]}\n").is_empty());
        assert_eq!(decoder.pending(), 0);

        let frames = decoder.feed(b"data: {\"choices\":[{\"delta\":{\"content\":\"kept\"}}]}\n");
        assert_eq!(frames, vec![SseFrame::Delta("kept".into())]);
    }

    #[test]
    fn done_marker_ends_decoding() {
        let mut decoder = SseDecoder::new(DeltaField::ChatDelta);
        let frames = decoder.feed(
            b"data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\ndata: [DONE]\n\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n",
        );
        assert_eq!(frames, vec![SseFrame::Delta("a".into()), SseFrame::Done]);
        assert!(decoder.is_done());
        assert!(decoder.feed(b"data: [DONE]\n").is_empty());
    }

    #[test]
    fn bad_json_is_skipped() {
        let mut decoder = SseDecoder::new(DeltaField::ChatDelta);
        let frames = decoder.feed(
            b"data: {not json}\ndata: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n",
        );
        assert_eq!(frames, vec![SseFrame::Delta("ok".into())]);
    }

    #[test]
    fn chunks_without_text_emit_nothing() {
        let mut decoder = SseDecoder::new(DeltaField::ChatDelta);
        let frames = decoder.feed(
            b": keep-alive\r\ndata: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\r\ndata: {\"choices\":[{\"delta\":{},\"finish_reason\":\"stop\"}]}\r\n",
        );
        assert!(frames.is_empty());
    }

    #[test]
    fn completion_text_field() {
        let mut decoder = SseDecoder::new(DeltaField::CompletionText);
        let frames = decoder.feed(b"data: {\"choices\":[{\"text\":\" once\"}]}\n");
        assert_eq!(frames, vec![SseFrame::Delta(" once".into())]);
    }

    #[test]
    fn utf8_split_across_chunks() {
        let mut decoder = SseDecoder::new(DeltaField::ChatDelta);
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\n";
        let bytes = line.as_bytes();
        let split = line.find('\u{e9}').unwrap() + 1;
        assert!(decoder.feed(&bytes[..split]).is_empty());
        assert_eq!(
            decoder.feed(&bytes[split..]),
            vec![SseFrame::Delta("caf\u{e9}".into())]
        );
    }

    #[test]
    fn error_payload_is_a_framing_error() {
        let err = parse_chunk(r#"{"error":{"message":"overloaded"}}"#, DeltaField::ChatDelta)
            .unwrap_err();
        assert!(matches!(err, FramingError::UnexpectedShape(_)));
    }
}
