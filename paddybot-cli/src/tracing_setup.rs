//! Tracing setup for the paddybot binary
//!
//! Usage:
//!   paddybot serve --debug             # Debug logging to console
//!   RUST_LOG=paddybot_server=debug ... # Fine-grained log control
//!
//! `RUST_LOG` always wins. Without it the level is `debug` when debug mode is
//! on (flag or `DEBUG=true`) and `info` otherwise.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

/// Tracing configuration options
#[derive(Debug, Clone, Default)]
pub struct TracingConfig {
    /// Enable debug logging (sets the level to debug if RUST_LOG is unset)
    pub debug: bool,
}

impl TracingConfig {
    fn filter(&self) -> EnvFilter {
        let fallback = if self.debug { "debug" } else { "info" };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    }
}

/// Install the global fmt subscriber. Fails if one is already installed.
pub fn init(config: &TracingConfig) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(config.filter())
        .with_target(config.debug) // Show targets in debug mode
        .with_writer(std::io::stderr) // stdout belongs to `config`
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}
