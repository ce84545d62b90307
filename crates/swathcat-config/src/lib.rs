//! Configuration file parsing and the process-wide [`Context`].

pub mod config;
pub mod context;

pub use config::{Config, GeneralConfig, RegistryConfig};
pub use context::Context;
