//! Error sinks for failed invocations.

use tracing::error;

use crate::error::InvocationError;

/// Receives invocation failures that dispatch swallowed.
///
/// Implemented for any `Fn(InvocationError) + Send + Sync` closure, which
/// is convenient for collecting failures in tests.
pub trait ErrorSink: Send + Sync {
    /// Reports one failed invocation.
    fn report(&self, error: InvocationError);
}

/// Default sink: logs every failure at `ERROR` level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn report(&self, error: InvocationError) {
        error!(handler = %error.handler(), error = %error, "Handler invocation failed");
    }
}

impl<F> ErrorSink for F
where
    F: Fn(InvocationError) + Send + Sync,
{
    fn report(&self, error: InvocationError) {
        self(error)
    }
}
