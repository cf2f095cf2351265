//! SSE frame helpers and the pass-through scanner
//!
//! The relay never re-encodes upstream frames; bytes go downstream verbatim.
//! [`SseScanner`] rides along on the same bytes to answer two questions the
//! proxy needs at session end: did the upstream already send its `[DONE]`
//! sentinel, and what token usage did it report.

use bytes::Bytes;
use serde_json::Value;

use crate::core::types::TokenUsage;

/// Payload of the terminal SSE frame
pub const DONE_SENTINEL: &str = "[DONE]";

/// Longest `data:` line the scanner keeps; longer lines are relayed
/// untouched but not inspected
const MAX_SCAN_LINE: usize = 64 * 1024;

/// Encode one SSE data frame
pub fn data_frame(payload: &str) -> Bytes {
    Bytes::from(format!("data: {payload}\n\n"))
}

/// The terminal frame appended when the upstream ends without one
pub fn done_frame() -> Bytes {
    Bytes::from_static(b"data: [DONE]\n\n")
}

/// Incremental observer over a raw SSE byte stream.
///
/// Feed it every chunk in arrival order; it reassembles lines across chunk
/// boundaries, ignores everything that is not a `data:` line, and keeps the
/// most recent `usage` object seen in any JSON payload. Scanning is
/// best-effort: a malformed or oversized line never fails the relay.
#[derive(Debug, Default)]
pub struct SseScanner {
    carry: Vec<u8>,
    discarding: bool,
    saw_done: bool,
    usage: Option<TokenUsage>,
}

impl SseScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan one relayed chunk
    pub fn observe(&mut self, chunk: &[u8]) {
        for &byte in chunk {
            if byte == b'\n' {
                if !self.discarding {
                    self.scan_line();
                }
                self.discarding = false;
                self.carry.clear();
            } else if self.discarding {
                // Skip to the next newline
            } else if self.carry.len() >= MAX_SCAN_LINE {
                self.carry.clear();
                self.discarding = true;
            } else {
                self.carry.push(byte);
            }
        }
    }

    /// Whether a `data: [DONE]` frame has come through
    pub fn saw_done(&self) -> bool {
        self.saw_done
    }

    /// Most recent usage object reported by the upstream, if any
    pub fn usage(&self) -> Option<&TokenUsage> {
        self.usage.as_ref()
    }

    fn scan_line(&mut self) {
        let mut line = self.carry.as_slice();
        if line.ends_with(b"\r") {
            line = &line[..line.len() - 1];
        }
        let Ok(line) = std::str::from_utf8(line) else {
            return;
        };
        let Some(payload) = line.strip_prefix("data:") else {
            return;
        };
        let payload = payload.strip_prefix(' ').unwrap_or(payload);
        if payload.trim() == DONE_SENTINEL {
            self.saw_done = true;
            return;
        }
        if !payload.starts_with('{') {
            return;
        }
        if let Ok(value) = serde_json::from_str::<Value>(payload) {
            if value.get("usage").is_some_and(Value::is_object) {
                self.usage = Some(TokenUsage::from_response(&value));
            }
        }
    }
}
