//! services/storyteller/src/telemetry.rs
//!
//! Logging bootstrap for whatever process embeds the storyteller.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Installs the global `tracing` subscriber at the configured level.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &Config) -> Result<(), tracing_subscriber::util::TryInitError> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
}
