//! HTTP server for the streaming TTS prefetch accelerator.
//!
//! Wires [`AppState`] (settings, cache, balancer, orchestrator, upstream
//! HTTP client) into an axum [`Router`](axum::Router) exposing the routes
//! documented in the crate's top-level design notes.

mod chat;
mod error;
mod metrics;
mod routes;
mod state;

pub use error::ServerError;
pub use metrics::{init_metrics, metrics_handler};
pub use routes::create_router;
pub use state::AppState;
