//! Switchyard Runtime - hosting layer for Switchyard handlers.
//!
//! This crate provides:
//! - Layered configuration (`ConfigLoader`, `SwitchyardConfig`)
//! - Logging setup driven by that configuration
//! - An identity-keyed handler collection (`HandlerRegistry`)
//! - Priority routing across handler variants (`InputRouter`)
//! - A worker pool owner with blocking helpers for synchronous drivers
//!   (`SwitchyardRuntime`)
//!
//! ```rust,ignore
//! use switchyard_runtime::{InputRouter, SwitchyardRuntime};
//!
//! fn main() -> switchyard_runtime::RuntimeResult<()> {
//!     let runtime = SwitchyardRuntime::new()?;
//!     let router = InputRouter::new();
//!     router.add(menu_handler, 10);
//!     router.add(world_handler, 0);
//!
//!     for event in window.poll_events() {
//!         runtime.route_input(&router, event);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod registry;
pub mod router;
pub mod runtime;

// Re-exports
pub use config::{
    ConfigError, ConfigLoader, ConfigResult, LoggingConfig, RuntimeConfig, SwitchyardConfig,
};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use registry::{HandlerRegistry, RegistryStats};
pub use router::InputRouter;
pub use runtime::{RuntimeBuilder, SwitchyardRuntime};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// Provides the commonly used logging macros alongside the runtime types.
pub mod prelude {
    pub use super::{HandlerRegistry, InputRouter, SwitchyardRuntime};
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
