//! Incremental frame parser for the streamed chat response.
//!
//! The backend answers with an event-stream style body: frames separated by
//! a blank line, each carrying one or more `data:` lines. The network may
//! split a frame across any number of fragments, or pack several frames
//! into one, so the parser buffers text and emits frames as soon as their
//! delimiter has arrived.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};

/// Prefix marking a payload line inside a frame.
pub const CONTENT_PREFIX: &str = "data:";

/// Buffered characters tolerated without a delimiter before the parser tries
/// to salvage an embedded JSON object.
pub const MAX_UNDELIMITED_CHARS: usize = 20_000;

static EMBEDDED_JSON: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)data:\s*(\{.*\})").expect("frame: static regex pattern must compile")
});

/// One delimited unit of the response body, reduced to its payload lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    lines: Vec<String>,
}

impl Frame {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Payload lines joined with `\n`, in order.
    pub fn payload(&self) -> String {
        self.lines.join("\n")
    }
}

/// Buffers fragments and yields complete frames in arrival order.
#[derive(Debug, Default)]
pub struct FrameParser {
    buffer: String,
    decoder: Utf8Decoder,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes. Multi-byte characters split across calls are held
    /// back until complete.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Frame> {
        let text = self.decoder.decode(bytes);
        self.push_str(&text)
    }

    /// Feed already-decoded text.
    pub fn push_str(&mut self, text: &str) -> Vec<Frame> {
        self.buffer.push_str(text);

        let mut frames = Vec::new();
        while let Some((at, delimiter_len)) = next_delimiter(&self.buffer) {
            let block: String = self.buffer.drain(..at + delimiter_len).collect();
            if let Some(frame) = parse_block(&block[..at]) {
                frames.push(frame);
            }
        }

        if self.is_overflowing() {
            if let Some(frame) = self.salvage_overflow() {
                frames.push(frame);
            }
        }

        frames
    }

    /// Flush at end of stream. The last frame may lack its delimiter.
    pub fn finish(&mut self) -> Option<Frame> {
        let tail = self.decoder.finish();
        self.buffer.push_str(&tail);

        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() {
            return None;
        }
        parse_block(&rest)
    }

    /// Characters currently waiting for a delimiter.
    pub fn buffered_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn is_overflowing(&self) -> bool {
        // Byte length bounds char count from above; only count when it matters.
        self.buffer.len() > MAX_UNDELIMITED_CHARS
            && self.buffer.chars().count() > MAX_UNDELIMITED_CHARS
    }

    fn salvage_overflow(&mut self) -> Option<Frame> {
        let candidate = EMBEDDED_JSON
            .captures(&self.buffer)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())?;

        if serde_json::from_str::<serde_json::Value>(&candidate).is_err() {
            debug!(
                buffered = self.buffer.len(),
                "undelimited buffer has no complete JSON object yet"
            );
            return None;
        }

        warn!(
            buffered = self.buffer.len(),
            "no frame delimiter within {MAX_UNDELIMITED_CHARS} chars; salvaged embedded JSON and dropped buffer"
        );
        self.buffer.clear();
        Some(Frame {
            lines: vec![candidate],
        })
    }
}

/// Position and length of the next blank-line delimiter.
/// `\r\n\r\n` wins whenever it appears anywhere in the buffer.
fn next_delimiter(buffer: &str) -> Option<(usize, usize)> {
    if let Some(at) = buffer.find("\r\n\r\n") {
        return Some((at, 4));
    }
    buffer.find("\n\n").map(|at| (at, 2))
}

fn parse_block(block: &str) -> Option<Frame> {
    let lines: Vec<String> = block
        .split('\n')
        .map(str::trim)
        .filter_map(|line| line.strip_prefix(CONTENT_PREFIX))
        .map(|rest| strip_one_whitespace(rest).to_string())
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(Frame { lines })
    }
}

fn strip_one_whitespace(s: &str) -> &str {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => s,
    }
}

/// Streaming UTF-8 decoder: keeps an incomplete trailing sequence for the
/// next call and replaces invalid bytes with U+FFFD.
#[derive(Debug, Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    return out;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(std::str::from_utf8(&self.pending[..valid]).unwrap_or_default());
                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + bad);
                        }
                        None => {
                            self.pending.drain(..valid);
                            return out;
                        }
                    }
                }
            }
        }
    }

    fn finish(&mut self) -> String {
        let rest = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        rest
    }
}
