//! Shared types for the TTS prefetch accelerator
//!
//! This crate provides the foundational types used across the balancer,
//! cache, splitter, orchestrator and server crates:
//! - Cache fingerprinting
//! - Segment and endpoint snapshot types
//! - The crate-wide error type and its HTTP status/error-code mapping

pub mod error;
pub mod fingerprint;
pub mod segment;
pub mod stats;

pub use error::{Error, ErrorCode, Result};
pub use fingerprint::fingerprint;
pub use segment::Segment;
pub use stats::{BalancerStats, CacheStats, EndpointStats};
