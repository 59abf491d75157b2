#[cfg(feature = "cli")]
pub mod cli;
pub mod defaults;
pub mod file;

pub use file::{BridgeConfig, LogFormat, LoggingConfig, ServerConfig, UpstreamConfig, UpstreamMode};
