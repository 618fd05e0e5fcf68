//! Configuration module for the Switchyard runtime.
//!
//! Layered loading (defaults, TOML files, `SWITCHYARD_*` environment
//! variables, programmatic overrides) plus validation of the result.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LoggingConfig, RuntimeConfig, SpanEventConfig,
    SwitchyardConfig,
};
pub use validation::validate_config;
