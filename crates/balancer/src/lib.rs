//! Load balancer for the TTS synthesis upstream.
//!
//! Dispatches synthesis requests across N upstream TTS endpoints under a
//! per-endpoint concurrency cap, with least-loaded selection, exponential
//! backoff retry, and three-strikes health demotion.

mod balancer;
mod config;
mod endpoint;
mod health;

pub use balancer::LoadBalancer;
pub use config::BalancerConfig;
pub use endpoint::Endpoint;
pub use health::{spawn_health_checker, HealthCheckHandle};
