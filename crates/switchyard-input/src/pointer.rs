//! Pointer handler variant.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::events::{MouseButton, PointerEvent};
use switchyard_core::{HandlerRecord, InputHandler};

/// An in-progress or just finished drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Drag {
    pub button: MouseButton,
    /// Where the button went down.
    pub origin: [f32; 2],
    /// Offset from `origin` to the current position.
    pub delta: [f32; 2],
}

/// Parameters passed to pointer routines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerInput {
    pub event: PointerEvent,
    /// Set while a button is held, and on the release that ends it.
    pub drag: Option<Drag>,
}

#[derive(Debug, Default)]
struct PointerState {
    /// Held buttons and the position each went down at.
    pressed: BTreeMap<MouseButton, [f32; 2]>,
    position: Option<[f32; 2]>,
    idle: Duration,
}

/// Pointer variant of the capability interface.
///
/// Tracks held buttons and the last known position so routines see drags
/// as a single origin plus delta.
pub struct PointerHandler {
    record: Arc<HandlerRecord<PointerInput>>,
    state: Mutex<PointerState>,
}

impl PointerHandler {
    pub fn new(record: Arc<HandlerRecord<PointerInput>>) -> Self {
        Self {
            record,
            state: Mutex::new(PointerState::default()),
        }
    }

    pub fn record(&self) -> &Arc<HandlerRecord<PointerInput>> {
        &self.record
    }

    /// Returns `true` while `button` is held.
    pub fn is_pressed(&self, button: MouseButton) -> bool {
        self.state.lock().pressed.contains_key(&button)
    }

    /// Last position seen, if any event arrived yet.
    pub fn position(&self) -> Option<[f32; 2]> {
        self.state.lock().position
    }

    /// Time since the last pointer event, as accumulated by ticks.
    pub fn idle_for(&self) -> Duration {
        self.state.lock().idle
    }

    fn track(&self, event: PointerEvent) -> PointerInput {
        let mut state = self.state.lock();
        let position = event.position();
        state.position = Some(position);
        state.idle = Duration::ZERO;

        let drag = match event {
            PointerEvent::Pressed { button, .. } => {
                state.pressed.entry(button).or_insert(position);
                None
            }
            PointerEvent::Released { button, .. } => state
                .pressed
                .remove(&button)
                .map(|origin| drag_of(button, origin, position)),
            PointerEvent::Moved { .. } | PointerEvent::Scrolled { .. } => state
                .pressed
                .iter()
                .next()
                .map(|(&button, &origin)| drag_of(button, origin, position)),
        };

        PointerInput { event, drag }
    }
}

fn drag_of(button: MouseButton, origin: [f32; 2], position: [f32; 2]) -> Drag {
    Drag {
        button,
        origin,
        delta: [position[0] - origin[0], position[1] - origin[1]],
    }
}

#[async_trait]
impl InputHandler<PointerEvent> for PointerHandler {
    fn name(&self) -> &str {
        self.record.id().map_or("pointer", |id| id.as_str())
    }

    async fn handle_input(&self, event: PointerEvent) -> bool {
        let input = self.track(event);
        self.record.invoke(input).await
    }

    fn handle_tick(&self, delta: Duration) {
        self.state.lock().idle += delta;
    }

    fn handle_focus_lost(&self) {
        let released = {
            let mut state = self.state.lock();
            let count = state.pressed.len();
            state.pressed.clear();
            count
        };
        if released > 0 {
            debug!(handler = %self.name(), released, "Focus lost, ended drags");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{HandlerId, Routine};

    #[derive(Default)]
    struct Canvas {
        inputs: Mutex<Vec<PointerInput>>,
    }

    impl Canvas {
        fn on_pointer(&self, input: &PointerInput) -> bool {
            self.inputs.lock().push(*input);
            input.drag.is_some()
        }

        fn last(&self) -> PointerInput {
            *self.inputs.lock().last().expect("no input recorded")
        }
    }

    fn handler_with(canvas: &Arc<Canvas>) -> PointerHandler {
        let record = Arc::new(HandlerRecord::bound(
            HandlerId::of::<Canvas>("on_pointer"),
            Routine::method(Canvas::on_pointer),
        ));
        record.register_instance(canvas).unwrap();
        PointerHandler::new(record)
    }

    #[tokio::test]
    async fn test_drag_reports_origin_and_delta() {
        let canvas = Arc::new(Canvas::default());
        let handler = handler_with(&canvas);

        let pressed = PointerEvent::Pressed {
            button: MouseButton::Left,
            position: [10.0, 10.0],
        };
        assert!(!handler.handle_input(pressed).await);
        assert!(handler.is_pressed(MouseButton::Left));

        assert!(
            handler
                .handle_input(PointerEvent::Moved {
                    position: [15.0, 7.0]
                })
                .await
        );
        let drag = canvas.last().drag.unwrap();
        assert_eq!(drag.origin, [10.0, 10.0]);
        assert_eq!(drag.delta, [5.0, -3.0]);

        let released = PointerEvent::Released {
            button: MouseButton::Left,
            position: [20.0, 10.0],
        };
        assert!(handler.handle_input(released).await);
        assert_eq!(canvas.last().drag.unwrap().delta, [10.0, 0.0]);
        assert!(!handler.is_pressed(MouseButton::Left));
        assert_eq!(handler.position(), Some([20.0, 10.0]));
    }

    #[tokio::test]
    async fn test_plain_move_is_not_a_drag() {
        let canvas = Arc::new(Canvas::default());
        let handler = handler_with(&canvas);

        assert!(
            !handler
                .handle_input(PointerEvent::Moved {
                    position: [1.0, 2.0]
                })
                .await
        );
        assert_eq!(canvas.last().drag, None);
    }

    #[tokio::test]
    async fn test_tick_accumulates_idle_until_next_event() {
        let canvas = Arc::new(Canvas::default());
        let handler = handler_with(&canvas);

        handler.handle_tick(Duration::from_millis(16));
        handler.handle_tick(Duration::from_millis(16));
        assert_eq!(handler.idle_for(), Duration::from_millis(32));

        handler
            .handle_input(PointerEvent::Scrolled {
                delta: [0.0, -1.0],
                position: [0.0, 0.0],
            })
            .await;
        assert_eq!(handler.idle_for(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_focus_lost_ends_drag() {
        let canvas = Arc::new(Canvas::default());
        let handler = handler_with(&canvas);

        handler
            .handle_input(PointerEvent::Pressed {
                button: MouseButton::Right,
                position: [0.0, 0.0],
            })
            .await;
        handler.handle_focus_lost();
        assert!(!handler.is_pressed(MouseButton::Right));

        // Release without a matching press carries no drag.
        let consumed = handler
            .handle_input(PointerEvent::Released {
                button: MouseButton::Right,
                position: [4.0, 4.0],
            })
            .await;
        assert!(!consumed);
        assert_eq!(canvas.last().drag, None);
    }
}
