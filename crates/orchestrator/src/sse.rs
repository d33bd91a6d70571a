//! Re-assembly of arbitrarily-chunked bytes into Server-Sent Events lines,
//! and extraction of the plain-text delta from an OpenAI-style
//! chat-completion chunk payload.

use serde_json::Value;

/// Sentinel line terminating an OpenAI-style SSE chat-completion stream.
const DONE_SENTINEL: &str = "[DONE]";

/// Buffers bytes across chunk boundaries and yields complete SSE `data:`
/// payloads as they become available. Bytes may arrive split anywhere,
/// including mid-line or mid-UTF-8-sequence; only complete lines are
/// parsed out of the buffer.
#[derive(Debug, Default)]
pub struct LineReassembler {
    buffer: String,
    pending_bytes: Vec<u8>,
}

impl LineReassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `chunk` and returns every complete `data: ` payload line
    /// now available, in order. The `[DONE]` sentinel is filtered out
    /// rather than returned, since it carries no delta to extract.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending_bytes.extend_from_slice(chunk);
        // Decode as much valid UTF-8 as is currently available; an
        // incomplete trailing multi-byte sequence is left in
        // `pending_bytes` for the next chunk to complete.
        match std::str::from_utf8(&self.pending_bytes) {
            Ok(s) => {
                self.buffer.push_str(s);
                self.pending_bytes.clear();
            }
            Err(e) => {
                let valid_len = e.valid_up_to();
                let valid = std::str::from_utf8(&self.pending_bytes[..valid_len])
                    .expect("validated prefix is UTF-8");
                self.buffer.push_str(valid);
                self.pending_bytes.drain(..valid_len);
            }
        }

        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']);
            if let Some(payload) = line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")) {
                let payload = payload.trim();
                if !payload.is_empty() && payload != DONE_SENTINEL {
                    payloads.push(payload.to_string());
                }
            }
        }
        payloads
    }
}

/// Pulls the plain-text delta content out of one chat-completion chunk's
/// JSON payload (`choices[0].delta.content`). Returns `None` for any
/// payload that doesn't match that shape rather than erroring — malformed
/// or unrelated chunks are treated as opaque and forwarding proceeds
/// unaffected.
pub fn extract_delta(payload: &str) -> Option<String> {
    let value: Value = serde_json::from_str(payload).ok()?;
    let content = value
        .get("choices")?
        .get(0)?
        .get("delta")?
        .get("content")?
        .as_str()?;
    if content.is_empty() {
        None
    } else {
        Some(content.to_string())
    }
}
