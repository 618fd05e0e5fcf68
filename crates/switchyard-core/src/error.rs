//! Error types for the Switchyard core.
//!
//! Registration errors propagate to whoever performed the registration.
//! Invocation errors never leave a dispatch cycle; they are handed to an
//! [`ErrorSink`](crate::ErrorSink) and counted as "not consumed".

use thiserror::Error;

use crate::identity::HandlerId;

/// Boxed error returned by fallible routines.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Registration Errors
// =============================================================================

/// Errors raised while binding a handler or registering an instance.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// The record already carries an identity.
    #[error("handler '{existing}' is already bound")]
    AlreadyBound {
        /// The identity that was set first.
        existing: HandlerId,
    },

    /// Instances cannot be registered before a routine is bound.
    #[error("handler has no routine bound")]
    Unbound,

    /// The bound routine does not take an instance.
    #[error("handler '{handler}' is static and does not accept instances")]
    NotInstanceBound {
        /// The static handler.
        handler: HandlerId,
    },

    /// The instance type differs from the type the routine was declared on.
    #[error("handler '{handler}' expects instances of '{expected}', got '{got}'")]
    InstanceTypeMismatch {
        /// The handler being registered against.
        handler: HandlerId,
        /// Type the routine was declared on.
        expected: &'static str,
        /// Type of the offered instance.
        got: &'static str,
    },
}

// =============================================================================
// Invocation Errors
// =============================================================================

/// A failure of a single routine invocation.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The routine returned an error.
    #[error("handler '{handler}' failed: {source}")]
    Failed {
        /// The failing handler.
        handler: HandlerId,
        /// Error returned by the routine.
        #[source]
        source: BoxError,
    },

    /// The routine panicked.
    #[error("handler '{handler}' panicked: {message}")]
    Panicked {
        /// The failing handler.
        handler: HandlerId,
        /// Panic payload rendered as text.
        message: String,
    },

    /// The live target could not be viewed as the routine's receiver type.
    #[error("handler '{handler}' received an instance that is not a '{expected}'")]
    TypeMismatch {
        /// The failing handler.
        handler: HandlerId,
        /// Receiver type of the routine.
        expected: &'static str,
    },

    /// The invocation task was cancelled before it produced a result.
    #[error("handler '{handler}' invocation was aborted")]
    Aborted {
        /// The failing handler.
        handler: HandlerId,
    },
}

impl InvocationError {
    /// Returns the identity of the handler whose invocation failed.
    pub fn handler(&self) -> &HandlerId {
        match self {
            Self::Failed { handler, .. }
            | Self::Panicked { handler, .. }
            | Self::TypeMismatch { handler, .. }
            | Self::Aborted { handler } => handler,
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;
