//! # Switchyard Input
//!
//! Stateful handler variants built on [`switchyard_core`]. Each variant wraps
//! a [`HandlerRecord`](switchyard_core::HandlerRecord), keeps its own input
//! state, and passes enriched parameters to the bound routine.
//!
//! | Variant            | Event            | Routine parameter |
//! |--------------------|------------------|-------------------|
//! | [`KeyHandler`]     | [`KeyEvent`]     | [`KeyInput`]      |
//! | [`PointerHandler`] | [`PointerEvent`] | [`PointerInput`]  |

pub mod events;
pub mod key;
pub mod pointer;

pub use events::{ButtonState, KeyCode, KeyEvent, MouseButton, PointerEvent};
pub use key::{KeyHandler, KeyInput};
pub use pointer::{Drag, PointerHandler, PointerInput};
