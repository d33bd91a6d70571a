//! Prefetch orchestrator.
//!
//! Wires the streaming splitter and the TTS cache into the
//! chat-completion forwarding pipe: every upstream chunk reaches the
//! client unchanged while its text is split into synthesis-ready segments
//! and submitted for prefetch.

mod orchestrator;
mod sse;

pub use orchestrator::Orchestrator;
pub use sse::{extract_delta, LineReassembler};
