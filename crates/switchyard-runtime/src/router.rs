//! Priority-ordered routing of input events across handlers.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tracing::{debug, trace};

use switchyard_core::{BoxedInputHandler, InputHandler};

struct Route<E> {
    priority: i32,
    handler: BoxedInputHandler<E>,
}

impl<E> Clone for Route<E> {
    fn clone(&self) -> Self {
        Self {
            priority: self.priority,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Routes each input event to handlers from the highest priority down,
/// stopping at the first one that consumes it.
///
/// Ticks and focus loss are broadcast to every handler.
pub struct InputRouter<E> {
    routes: RwLock<Vec<Route<E>>>,
}

impl<E> InputRouter<E>
where
    E: Clone + Send + 'static,
{
    pub fn new() -> Self {
        Self {
            routes: RwLock::new(Vec::new()),
        }
    }

    /// Adds a handler. Higher priorities see events first; equal priorities
    /// keep insertion order.
    pub fn add(&self, handler: BoxedInputHandler<E>, priority: i32) {
        let mut routes = self.routes.write();
        let index = routes.partition_point(|r| r.priority >= priority);
        debug!(handler = handler.name(), priority, "Added input route");
        routes.insert(index, Route { priority, handler });
    }

    /// Removes every handler with this name. Returns how many were removed.
    pub fn remove(&self, name: &str) -> usize {
        let mut routes = self.routes.write();
        let before = routes.len();
        routes.retain(|r| r.handler.name() != name);
        before - routes.len()
    }

    /// Handler names in routing order.
    pub fn names(&self) -> Vec<String> {
        self.routes
            .read()
            .iter()
            .map(|r| r.handler.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.routes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.read().is_empty()
    }

    fn snapshot(&self) -> Vec<Route<E>> {
        self.routes.read().clone()
    }

    /// Offers `event` to each handler in turn.
    ///
    /// Returns `true` if some handler consumed it.
    pub async fn route(&self, event: E) -> bool {
        for route in self.snapshot() {
            if route.handler.handle_input(event.clone()).await {
                trace!(handler = route.handler.name(), "Input consumed");
                return true;
            }
        }
        false
    }

    /// Advances every handler by `delta`.
    pub fn tick(&self, delta: Duration) {
        for route in self.snapshot() {
            route.handler.handle_tick(delta);
        }
    }

    /// Tells every handler the application lost focus.
    pub fn focus_lost(&self) {
        let routes = self.snapshot();
        debug!(handlers = routes.len(), "Broadcasting focus loss");
        for route in routes {
            route.handler.handle_focus_lost();
        }
    }
}

impl<E> Default for InputRouter<E>
where
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use switchyard_core::{HandlerRecord, Routine};

    /// Handler that logs its name and consumes events equal to `claims`.
    struct Probe {
        name: &'static str,
        claims: char,
        log: Arc<Mutex<Vec<&'static str>>>,
        ticks: AtomicUsize,
        focus_lost: AtomicUsize,
    }

    impl Probe {
        fn new(name: &'static str, claims: char, log: &Arc<Mutex<Vec<&'static str>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                claims,
                log: Arc::clone(log),
                ticks: AtomicUsize::new(0),
                focus_lost: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl InputHandler<char> for Probe {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle_input(&self, event: char) -> bool {
            self.log.lock().push(self.name);
            event == self.claims
        }

        fn handle_tick(&self, _delta: Duration) {
            self.ticks.fetch_add(1, Ordering::SeqCst);
        }

        fn handle_focus_lost(&self) {
            self.focus_lost.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_priority_order_and_stop_at_consumer() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let router = InputRouter::<char>::new();
        router.add(Probe::new("world", 'w', &log), 0);
        router.add(Probe::new("menu", 'm', &log), 10);
        router.add(Probe::new("hud", 'h', &log), 5);

        assert_eq!(router.names(), vec!["menu", "hud", "world"]);

        assert!(router.route('h').await);
        assert_eq!(*log.lock(), vec!["menu", "hud"]);

        log.lock().clear();
        assert!(!router.route('x').await);
        assert_eq!(*log.lock(), vec!["menu", "hud", "world"]);
    }

    #[tokio::test]
    async fn test_equal_priority_keeps_insertion_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let router = InputRouter::<char>::new();
        router.add(Probe::new("first", '1', &log), 1);
        router.add(Probe::new("second", '2', &log), 1);

        router.route('2').await;
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[test]
    fn test_tick_and_focus_lost_broadcast() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = Probe::new("a", 'a', &log);
        let b = Probe::new("b", 'b', &log);
        let router = InputRouter::<char>::new();
        router.add(a.clone(), 0);
        router.add(b.clone(), 1);

        router.tick(Duration::from_millis(16));
        router.focus_lost();

        for probe in [&a, &b] {
            assert_eq!(probe.ticks.load(Ordering::SeqCst), 1);
            assert_eq!(probe.focus_lost.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn test_records_route_alongside_custom_handlers() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let router = InputRouter::<char>::new();
        router.add(
            Arc::new(HandlerRecord::bound(
                "digits",
                Routine::function(|c: &char| c.is_ascii_digit()),
            )),
            10,
        );
        router.add(Probe::new("fallback", 'z', &log), 0);

        assert!(router.route('4').await);
        assert!(log.lock().is_empty());

        assert_eq!(router.remove("digits"), 1);
        assert!(!router.route('4').await);
        assert_eq!(*log.lock(), vec!["fallback"]);
    }
}
