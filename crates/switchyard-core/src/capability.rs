//! The capability interface consumed by external drivers.
//!
//! Every handler variant offers the same three operations. The driver owns
//! the event loop and decides when to call them; the variants decide what
//! input means for them and delegate the actual routine calls to the
//! dispatch engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::record::HandlerRecord;

/// Contract shared by all handler variants.
#[async_trait]
pub trait InputHandler<E>: Send + Sync
where
    E: Send + 'static,
{
    /// Name of this handler for logs and diagnostics.
    fn name(&self) -> &str;

    /// Handles one input event.
    ///
    /// # Returns
    /// * `true` if the event was consumed (the driver stops propagating it)
    /// * `false` if it was not handled
    async fn handle_input(&self, event: E) -> bool;

    /// Advances per-frame state by `delta`.
    fn handle_tick(&self, delta: Duration);

    /// Resets transient input state after the application lost focus.
    fn handle_focus_lost(&self);
}

/// A shared, type-erased handler.
pub type BoxedInputHandler<E> = Arc<dyn InputHandler<E>>;

/// A bare record is the stateless variant: input goes straight to dispatch.
#[async_trait]
impl<P> InputHandler<P> for HandlerRecord<P>
where
    P: Send + Sync + 'static,
{
    fn name(&self) -> &str {
        self.id().map_or("unbound", |id| id.as_str())
    }

    async fn handle_input(&self, event: P) -> bool {
        self.invoke(event).await
    }

    fn handle_tick(&self, _delta: Duration) {}

    fn handle_focus_lost(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routine::Routine;

    #[tokio::test]
    async fn test_record_as_boxed_handler() {
        let handler: BoxedInputHandler<u8> = Arc::new(HandlerRecord::bound(
            "digits",
            Routine::function(|key: &u8| key.is_ascii_digit()),
        ));

        assert_eq!(handler.name(), "digits");
        assert!(handler.handle_input(b'7').await);
        assert!(!handler.handle_input(b'x').await);

        handler.handle_tick(Duration::from_millis(16));
        handler.handle_focus_lost();
    }

    #[test]
    fn test_unbound_record_name() {
        let record = HandlerRecord::<u8>::new();
        assert_eq!(InputHandler::name(&record), "unbound");
    }
}
