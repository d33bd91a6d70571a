use serde::{Deserialize, Serialize};

/// A trimmed, non-empty unit of text emitted by the streaming splitter and
/// submitted to the cache for synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// The trimmed text of the segment. Never empty.
    pub text: String,
    /// Opaque id of the chat-completion stream this segment was drawn from.
    pub request_id: String,
}

impl Segment {
    pub fn new(text: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_id: request_id.into(),
        }
    }
}
