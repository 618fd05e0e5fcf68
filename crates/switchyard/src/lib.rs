//! # Switchyard
//!
//! Declare an input routine once, register any number of objects against
//! it, and let one call fan out to every live object concurrently.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐     ┌─────────────┐     ┌──────────────────────────────────────┐
//! │   Driver   │────▶│ InputRouter │────▶│ KeyHandler / PointerHandler / record │
//! │ (your loop)│     │ (priority)  │     └──────────────────┬───────────────────┘
//! └────────────┘     └─────────────┘                        │ invoke
//!                                              ┌────────────▼────────────┐
//!                                              │ HandlerRecord           │
//!                                              │  ├─ instance A (task) ──┤
//!                                              │  ├─ instance B (task) ──┼──▶ OR ──▶ consumed
//!                                              │  └─ dead ref (pruned)   │
//!                                              └─────────────────────────┘
//! ```
//!
//! - **Core**: identities, weak instance registry, dispatch engine,
//!   capability trait
//! - **Input**: keyboard and pointer variants with hold and drag tracking
//! - **Runtime**: configuration, logging, handler registry, router and a
//!   worker pool for synchronous drivers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchyard::prelude::*;
//!
//! struct Player;
//!
//! impl Player {
//!     fn on_key(&self, input: &KeyInput) -> bool {
//!         input.key == KeyCode::Space
//!     }
//! }
//!
//! fn main() -> RuntimeResult<()> {
//!     let runtime = SwitchyardRuntime::new()?;
//!     let registry = HandlerRegistry::new();
//!     let record = registry.register(
//!         HandlerId::of::<Player>("on_key"),
//!         Routine::method(Player::on_key),
//!     )?;
//!
//!     let player = Arc::new(Player);
//!     let _sub = record.subscribe(&player)?;
//!
//!     let router = InputRouter::new();
//!     router.add(Arc::new(KeyHandler::new(record)), 0);
//!     assert!(runtime.route_input(&router, KeyEvent::pressed(KeyCode::Space)));
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: load `switchyard.toml` files (default)
//! - `json-log`: JSON log output

pub use switchyard_core as core;
pub use switchyard_input as input;
pub use switchyard_runtime as runtime;

pub use switchyard_core::*;

/// Prelude module for convenient imports.
pub mod prelude {
    // Core
    pub use switchyard_core::{
        BoxedInputHandler, DispatchMode, ErrorSink, HandlerId, HandlerRecord, InputHandler,
        InvocationError, IntoConsumed, RegistrationError, Routine, Subscription,
    };

    // Handler variants
    pub use switchyard_input::{
        ButtonState, KeyCode, KeyEvent, KeyHandler, KeyInput, MouseButton, PointerEvent,
        PointerHandler, PointerInput,
    };

    // Runtime
    pub use switchyard_runtime::{
        HandlerRegistry, InputRouter, RuntimeError, RuntimeResult, SwitchyardConfig,
        SwitchyardRuntime,
    };

    // Logging
    pub use switchyard_runtime::prelude::{debug, error, info, trace, warn};
}
