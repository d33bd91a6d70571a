//! Configuration loading for the TTS prefetch accelerator.
//!
//! Settings are layered from an optional TOML file, environment variables
//! (`TTS_ACCEL_*`), and built-in defaults, then validated as a whole before
//! being handed to the components that consume them.

mod error;
mod settings;

pub use error::ConfigError;
pub use settings::{load_settings, Settings};
