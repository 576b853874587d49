//! TOML configuration: initial session settings, startup port and
//! diagnostic logging.

mod loader;
mod types;

pub use loader::ConfigError;
pub use types::{Config, Defaults, LoggingConfig, PortConfig};
