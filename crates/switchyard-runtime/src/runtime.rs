//! Hosting for dispatch cycles.
//!
//! Dispatch fans out onto tokio worker threads. Drivers with their own
//! synchronous event loop (a game loop, a GUI toolkit callback) use
//! [`SwitchyardRuntime`] to own that pool and to block on cycles.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use switchyard_runtime::SwitchyardRuntime;
//!
//! // Loads switchyard.toml from the current directory if present
//! let runtime = SwitchyardRuntime::new()?;
//!
//! // Custom configuration
//! let runtime = SwitchyardRuntime::builder()
//!     .config_file("config/switchyard.toml")
//!     .profile("production")
//!     .build()?;
//!
//! let consumed = runtime.route_input(&router, event);
//! ```

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{ConfigLoader, SwitchyardConfig, validate_config};
use crate::error::RuntimeResult;
use crate::logging;
use crate::registry::HandlerRegistry;
use crate::router::InputRouter;
use switchyard_core::HandlerId;

/// Owns the worker pool that runs dispatch cycles.
///
/// The blocking helpers must not be called from inside an async context.
pub struct SwitchyardRuntime {
    config: SwitchyardConfig,
    runtime: Runtime,
}

impl SwitchyardRuntime {
    /// Creates a runtime from the configuration found in the current
    /// directory, falling back to defaults when there is none.
    pub fn new() -> RuntimeResult<Self> {
        let config = ConfigLoader::new().with_current_dir().load()?;
        Self::from_config(&config)
    }

    /// Creates a runtime builder for custom configuration.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Validates `config`, initialises logging and starts the worker pool.
    pub fn from_config(config: &SwitchyardConfig) -> RuntimeResult<Self> {
        validate_config(config)?;
        logging::init_from_config(&config.logging);

        let runtime = Builder::new_multi_thread()
            .worker_threads(config.runtime.worker_threads)
            .max_blocking_threads(config.runtime.max_blocking_threads)
            .thread_name(config.runtime.thread_name.clone())
            .enable_all()
            .build()?;

        info!(
            worker_threads = config.runtime.worker_threads,
            log_level = %config.logging.level,
            log_format = ?config.logging.format,
            "Runtime initialized from configuration"
        );

        Ok(Self {
            config: config.clone(),
            runtime,
        })
    }

    /// Returns a reference to the configuration.
    pub fn config(&self) -> &SwitchyardConfig {
        &self.config
    }

    /// Handle for spawning onto the worker pool from other threads.
    pub fn handle(&self) -> &Handle {
        self.runtime.handle()
    }

    /// Runs `future` to completion on the worker pool.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.runtime.spawn(future)
    }

    /// Routes one event through `router` and waits for the answer.
    pub fn route_input<E>(&self, router: &InputRouter<E>, event: E) -> bool
    where
        E: Clone + Send + 'static,
    {
        self.block_on(router.route(event))
    }

    /// Invokes a registered handler by id and waits for the answer.
    pub fn invoke<P>(
        &self,
        registry: &HandlerRegistry<P>,
        id: &HandlerId,
        params: P,
    ) -> RuntimeResult<bool>
    where
        P: Send + Sync + 'static,
    {
        self.block_on(registry.invoke(id, params))
    }

    /// Advances every routed handler by `delta`.
    pub fn tick<E>(&self, router: &InputRouter<E>, delta: Duration)
    where
        E: Clone + Send + 'static,
    {
        // Tick handlers may spawn; run them inside the runtime context.
        let _guard = self.runtime.enter();
        router.tick(delta);
    }

    /// Shuts the worker pool down, waiting at most `timeout` for tasks.
    pub fn shutdown_timeout(self, timeout: Duration) {
        info!("Shutting down runtime");
        self.runtime.shutdown_timeout(timeout);
    }
}

/// Builder for creating a `SwitchyardRuntime` with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    /// Enables loading environment variables (enabled by default).
    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    /// Disables loading environment variables.
    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: SwitchyardConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> RuntimeResult<SwitchyardRuntime> {
        let config = self.config_loader.load()?;
        SwitchyardRuntime::from_config(&config)
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::error::RuntimeError;
    use switchyard_core::Routine;
    use switchyard_input::{ButtonState, KeyCode, KeyEvent, KeyHandler, KeyInput};

    fn small_config() -> SwitchyardConfig {
        let mut config = SwitchyardConfig::default();
        config.runtime.worker_threads = 2;
        config.runtime.thread_name = "switchyard-test".into();
        config
    }

    struct Jumper {
        jumps: AtomicUsize,
    }

    impl Jumper {
        fn on_key(&self, input: &KeyInput) -> bool {
            let fresh_press = input.state == ButtonState::Pressed && !input.repeat;
            if input.key == KeyCode::Space && fresh_press {
                self.jumps.fetch_add(1, Ordering::SeqCst);
                return true;
            }
            false
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config();
        config.runtime.worker_threads = 0;
        assert!(matches!(
            SwitchyardRuntime::from_config(&config),
            Err(RuntimeError::Config(_))
        ));
    }

    #[test]
    fn test_builder_merges_config() {
        let runtime = SwitchyardRuntime::builder()
            .search_path(std::env::temp_dir().join("switchyard-runtime-none"))
            .without_env()
            .merge(small_config())
            .build()
            .unwrap();
        assert_eq!(runtime.config().runtime.thread_name, "switchyard-test");
        runtime.shutdown_timeout(Duration::from_secs(1));
    }

    #[test]
    fn test_blocking_route_from_sync_loop() {
        let runtime = SwitchyardRuntime::from_config(&small_config()).unwrap();

        let record = {
            let registry = HandlerRegistry::<KeyInput>::new();
            registry
                .register(
                    HandlerId::of::<Jumper>("on_key"),
                    Routine::method(Jumper::on_key),
                )
                .unwrap()
        };
        let jumper = Arc::new(Jumper {
            jumps: AtomicUsize::new(0),
        });
        let _sub = record.subscribe(&jumper).unwrap();

        let router = InputRouter::<KeyEvent>::new();
        router.add(Arc::new(KeyHandler::new(record)), 0);

        assert!(runtime.route_input(&router, KeyEvent::pressed(KeyCode::Space)));
        // Held key repeats are ignored by the routine.
        assert!(!runtime.route_input(&router, KeyEvent::pressed(KeyCode::Space)));
        runtime.tick(&router, Duration::from_millis(16));
        assert!(!runtime.route_input(&router, KeyEvent::released(KeyCode::Space)));

        assert_eq!(jumper.jumps.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_blocking_invoke_by_id() {
        let runtime = SwitchyardRuntime::from_config(&small_config()).unwrap();
        let registry = HandlerRegistry::<u32>::new();
        registry
            .register("even", Routine::function(|n: &u32| n % 2 == 0))
            .unwrap();

        let id = HandlerId::from("even");
        assert!(runtime.invoke(&registry, &id, 4).unwrap());
        assert!(!runtime.invoke(&registry, &id, 5).unwrap());
        assert!(runtime.invoke(&registry, &HandlerId::from("odd"), 1).is_err());
    }
}
