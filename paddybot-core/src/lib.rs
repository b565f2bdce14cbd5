//! paddybot-core: settings and shared primitives
//!
//! Everything in here is runtime-agnostic. The server crate builds its pools
//! from [`Settings`]; the CLI loads them once at process start.

pub mod config;
pub mod error;
pub mod security;
pub mod time;

pub use config::{
    load_dotenv, AppSettings, CacheSettings, DatabaseSettings, Secret, SecuritySettings, Settings,
};
pub use error::ConfigError;

/// Result type alias for paddybot-core operations
pub type Result<T> = std::result::Result<T, ConfigError>;
