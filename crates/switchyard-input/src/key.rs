//! Keyboard handler variant.
//!
//! [`KeyHandler`] remembers which keys are held and for how long. Routines
//! bound to it receive a [`KeyInput`] that carries the hold duration, so a
//! "charge while held" mechanic needs no state of its own.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::events::{ButtonState, KeyCode, KeyEvent};
use switchyard_core::{HandlerRecord, InputHandler};

/// Parameters passed to keyboard routines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyInput {
    pub key: KeyCode,
    pub state: ButtonState,
    /// Time the key has been held, as accumulated by ticks.
    pub held_for: Duration,
    /// `true` for a press of a key that was already held.
    pub repeat: bool,
}

/// Keyboard variant of the capability interface.
pub struct KeyHandler {
    record: Arc<HandlerRecord<KeyInput>>,
    held: Mutex<HashMap<KeyCode, Duration>>,
}

impl KeyHandler {
    /// Wraps a record whose routine takes [`KeyInput`].
    pub fn new(record: Arc<HandlerRecord<KeyInput>>) -> Self {
        Self {
            record,
            held: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the wrapped record, e.g. to register instances.
    pub fn record(&self) -> &Arc<HandlerRecord<KeyInput>> {
        &self.record
    }

    /// Returns `true` while `key` is held.
    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.lock().contains_key(&key)
    }

    /// Returns how long `key` has been held, if it is.
    pub fn held_for(&self, key: KeyCode) -> Option<Duration> {
        self.held.lock().get(&key).copied()
    }

    /// Returns the number of held keys.
    pub fn held_count(&self) -> usize {
        self.held.lock().len()
    }

    fn track(&self, event: KeyEvent) -> KeyInput {
        let mut held = self.held.lock();
        match event.state {
            ButtonState::Pressed => {
                let repeat = held.contains_key(&event.key);
                let held_for = *held.entry(event.key).or_default();
                KeyInput {
                    key: event.key,
                    state: event.state,
                    held_for,
                    repeat,
                }
            }
            ButtonState::Released => KeyInput {
                key: event.key,
                state: event.state,
                held_for: held.remove(&event.key).unwrap_or_default(),
                repeat: false,
            },
        }
    }
}

#[async_trait]
impl InputHandler<KeyEvent> for KeyHandler {
    fn name(&self) -> &str {
        self.record.id().map_or("keyboard", |id| id.as_str())
    }

    async fn handle_input(&self, event: KeyEvent) -> bool {
        let input = self.track(event);
        self.record.invoke(input).await
    }

    fn handle_tick(&self, delta: Duration) {
        for held_for in self.held.lock().values_mut() {
            *held_for += delta;
        }
    }

    fn handle_focus_lost(&self) {
        let released = {
            let mut held = self.held.lock();
            let count = held.len();
            held.clear();
            count
        };
        debug!(handler = %self.name(), released, "Focus lost, released held keys");
    }
}
