//! # Federation Telemetry
//!
//! Structured logging setup for shard federation.
//!
//! The federation crates only emit `tracing` events; this crate installs
//! the subscriber that filters and formats them.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use federation_telemetry::{init_telemetry, TelemetryConfig};
//!
//! fn main() {
//!     init_telemetry(TelemetryConfig::from_env()).expect("Failed to init telemetry");
//! }
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FED_SERVICE_NAME` | `shard-federation` | Service name on every event |
//! | `FED_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `FED_CONSOLE_OUTPUT` | `true` | Write events to the console |
//! | `FED_JSON_LOGS` | `false` | JSON formatting (defaults on in containers) |

#![warn(missing_docs)]

mod config;
mod tracing_setup;

pub use config::TelemetryConfig;
pub use tracing_setup::build_filter;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    /// The global subscriber could not be installed.
    #[error("Failed to initialize tracing subscriber: {0}")]
    SubscriberInit(String),

    /// The configured filter is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Install the global subscriber described by `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_setup::init_tracing(&config)
}

/// Install the test subscriber once; later calls are no-ops.
pub fn init_test_telemetry() {
    let _ = init_telemetry(TelemetryConfig::for_testing());
}
