//! Runtime error types.

use thiserror::Error;

pub use crate::config::{ConfigError, ConfigResult};
use switchyard_core::RegistrationError;

/// Errors that can occur during runtime operations.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A record rejected a binding or an instance.
    #[error("Registration error: {0}")]
    Registration(#[from] RegistrationError),

    /// A handler with this identity is already registered.
    #[error("Handler already exists: {0}")]
    HandlerExists(String),

    /// Handler not found.
    #[error("Handler not found: {0}")]
    HandlerNotFound(String),

    /// The async runtime could not be started.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
