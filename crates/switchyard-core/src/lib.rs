//! # Switchyard Core
//!
//! Handler-dispatch registry: one declared routine, a changing set of live
//! instances, concurrent fan-out across them.
//!
//! ## Building Blocks
//!
//! - **Identity**: [`HandlerId`] names a routine; records with equal
//!   identities are equal and hash identically.
//! - **Instances**: [`InstanceRef`] observes an object without owning it;
//!   [`InstanceRegistry`] collects them per handler.
//! - **Records**: [`HandlerRecord`] binds an identity to a [`Routine`] once
//!   and tracks the registered instances.
//! - **Dispatch**: [`HandlerRecord::invoke`] calls the routine once (static)
//!   or once per live instance on the tokio worker pool, ORs the results and
//!   prunes dead references.
//! - **Capability**: [`InputHandler`] is the three-operation surface drivers
//!   call (`handle_input`, `handle_tick`, `handle_focus_lost`).
//!
//! ## Flow
//!
//! ```text
//! ┌───────────┐ bind  ┌───────────────┐ register ┌────────────┐
//! │ Registrar │──────▶│ HandlerRecord │◀─────────│ Instances  │
//! └───────────┘       └───────────────┘  (weak)  └────────────┘
//!                             ▲ │ fan-out
//!       handle_input ────────┘ └──────▶ task per live instance ──▶ OR ──▶ consumed
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use switchyard_core::{HandlerId, HandlerRecord, InputHandler, Routine};
//!
//! struct Button { label: String }
//!
//! impl Button {
//!     fn on_click(&self, pos: &(f32, f32)) -> bool {
//!         println!("{} clicked at {pos:?}", self.label);
//!         true
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let record = Arc::new(HandlerRecord::bound(
//!         HandlerId::of::<Button>("on_click"),
//!         Routine::method(Button::on_click),
//!     ));
//!
//!     let ok = Arc::new(Button { label: "OK".into() });
//!     let _guard = record.subscribe(&ok).unwrap();
//!
//!     assert!(record.handle_input((10.0, 4.0)).await);
//! }
//! ```

pub mod capability;
pub mod dispatch;
pub mod error;
pub mod identity;
pub mod instance;
pub mod record;
pub mod routine;
pub mod sink;

pub use capability::{BoxedInputHandler, InputHandler};
pub use error::{BoxError, InvocationError, RegistrationError, RegistrationResult};
pub use identity::HandlerId;
pub use instance::{InstanceRef, InstanceRegistry, Target};
pub use record::{HandlerRecord, Subscription};
pub use routine::{DispatchMode, InstanceRoutine, IntoConsumed, Routine};
pub use sink::{ErrorSink, TracingSink};

/// Prelude for common imports.
pub mod prelude {
    pub use super::capability::{BoxedInputHandler, InputHandler};
    pub use super::identity::HandlerId;
    pub use super::record::{HandlerRecord, Subscription};
    pub use super::routine::{DispatchMode, IntoConsumed, Routine};
}
