//! Input event payloads understood by the built-in handler variants.

use serde::{Deserialize, Serialize};

/// Whether a key or button went down or up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonState {
    Pressed,
    Released,
}

/// Key code (common keys only, everything else maps to `Other`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    // Common keys
    Space,
    Enter,
    Escape,
    Backspace,
    Tab,
    Shift,
    Control,
    Alt,

    // Letters
    A,
    B,
    C,
    D,
    E,
    F,
    G,
    H,
    I,
    J,
    K,
    L,
    M,
    N,
    O,
    P,
    Q,
    R,
    S,
    T,
    U,
    V,
    W,
    X,
    Y,
    Z,

    // Numbers
    Num0,
    Num1,
    Num2,
    Num3,
    Num4,
    Num5,
    Num6,
    Num7,
    Num8,
    Num9,

    // Arrows
    Left,
    Right,
    Up,
    Down,

    // Other
    Other,
}

/// A key changed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEvent {
    pub key: KeyCode,
    pub state: ButtonState,
}

impl KeyEvent {
    /// Key went down.
    pub fn pressed(key: KeyCode) -> Self {
        Self {
            key,
            state: ButtonState::Pressed,
        }
    }

    /// Key went up.
    pub fn released(key: KeyCode) -> Self {
        Self {
            key,
            state: ButtonState::Released,
        }
    }
}

/// Mouse button identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Pointer activity in logical screen coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PointerEvent {
    /// Pointer moved.
    Moved { position: [f32; 2] },
    /// A button went down.
    Pressed {
        button: MouseButton,
        position: [f32; 2],
    },
    /// A button went up.
    Released {
        button: MouseButton,
        position: [f32; 2],
    },
    /// Wheel or touchpad scroll.
    Scrolled { delta: [f32; 2], position: [f32; 2] },
}

impl PointerEvent {
    /// Position where the event happened.
    pub fn position(&self) -> [f32; 2] {
        match *self {
            Self::Moved { position }
            | Self::Pressed { position, .. }
            | Self::Released { position, .. }
            | Self::Scrolled { position, .. } => position,
        }
    }
}
