//! Focus Demo
//!
//! Plays a scripted input session against a few handlers:
//!
//! - two players share one keyboard routine; one of them is dropped midway
//!   and its reference is pruned on the next cycle
//! - a pause menu routine is static and sits above the players in the router
//! - a canvas tracks pointer drags
//! - focus is lost while keys and buttons are held
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=switchyard_core=debug cargo run --package focus-demo
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use switchyard::prelude::*;
use tracing::info;

const FRAME: Duration = Duration::from_millis(16);

struct Player {
    name: &'static str,
    charge: Mutex<Duration>,
}

impl Player {
    fn new(name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            name,
            charge: Mutex::new(Duration::ZERO),
        })
    }

    fn on_key(&self, input: &KeyInput) -> bool {
        match (input.key, input.state) {
            (KeyCode::Space, ButtonState::Released) => {
                info!(
                    player = self.name,
                    charge_ms = input.held_for.as_millis() as u64,
                    "Jump"
                );
                *self.charge.lock() = input.held_for;
                true
            }
            (KeyCode::Space, ButtonState::Pressed) => !input.repeat,
            _ => false,
        }
    }
}

struct Canvas;

impl Canvas {
    fn on_pointer(&self, input: &PointerInput) -> bool {
        let Some(drag) = input.drag else {
            return false;
        };
        if let PointerEvent::Released { .. } = input.event {
            info!(
                button = ?drag.button,
                dx = drag.delta[0],
                dy = drag.delta[1],
                "Stroke finished"
            );
        }
        true
    }
}

/// Shared pause flag toggled by the static menu routine.
static PAUSED: AtomicBool = AtomicBool::new(false);

fn toggle_pause(input: &KeyInput) -> bool {
    if input.key != KeyCode::Escape || input.state != ButtonState::Pressed {
        // While paused the menu swallows every key.
        return PAUSED.load(Ordering::SeqCst);
    }
    let paused = !PAUSED.fetch_xor(true, Ordering::SeqCst);
    info!(paused, "Pause toggled");
    true
}

fn run_frames(runtime: &SwitchyardRuntime, keys: &InputRouter<KeyEvent>, frames: u32) {
    for _ in 0..frames {
        runtime.tick(keys, FRAME);
    }
}

fn main() -> Result<()> {
    let runtime = SwitchyardRuntime::new()?;

    let registry = HandlerRegistry::<KeyInput>::new();
    let player_record = registry.register(
        HandlerId::of::<Player>("on_key"),
        Routine::method(Player::on_key),
    )?;
    let menu_record = registry.register("menu::toggle_pause", Routine::function(toggle_pause))?;

    let alice = Player::new("alice");
    let bob = Player::new("bob");
    // Alice holds a subscription guard; Bob is registered directly.
    let alice_sub = player_record.subscribe(&alice)?;
    player_record.register_instance(&bob)?;

    let keys = InputRouter::<KeyEvent>::new();
    keys.add(Arc::new(KeyHandler::new(menu_record)), 10);
    keys.add(Arc::new(KeyHandler::new(Arc::clone(&player_record))), 0);

    let pointer_record = Arc::new(HandlerRecord::bound(
        HandlerId::of::<Canvas>("on_pointer"),
        Routine::method(Canvas::on_pointer),
    ));
    let canvas = Arc::new(Canvas);
    let _canvas_sub = pointer_record.subscribe(&canvas)?;
    let pointer = InputRouter::<PointerEvent>::new();
    pointer.add(Arc::new(PointerHandler::new(pointer_record)), 0);

    info!("{}", registry.stats());

    // Charged jump: both players see it.
    runtime.route_input(&keys, KeyEvent::pressed(KeyCode::Space));
    run_frames(&runtime, &keys, 30);
    runtime.route_input(&keys, KeyEvent::released(KeyCode::Space));

    // Bob leaves without unregistering; the next cycle prunes him.
    drop(bob);
    runtime.route_input(&keys, KeyEvent::pressed(KeyCode::Space));
    info!("{}", registry.stats());

    // Focus lost mid-hold: the charge is discarded.
    run_frames(&runtime, &keys, 10);
    keys.focus_lost();
    runtime.route_input(&keys, KeyEvent::released(KeyCode::Space));
    info!(charge_ms = alice.charge.lock().as_millis() as u64, "After focus loss");

    // Paused: players never see the jump.
    runtime.route_input(&keys, KeyEvent::pressed(KeyCode::Escape));
    let consumed = runtime.route_input(&keys, KeyEvent::pressed(KeyCode::Space));
    info!(consumed, "Space while paused");
    runtime.route_input(&keys, KeyEvent::pressed(KeyCode::Escape));

    // A drag interrupted by focus loss, then a complete one.
    runtime.route_input(
        &pointer,
        PointerEvent::Pressed {
            button: MouseButton::Left,
            position: [0.0, 0.0],
        },
    );
    pointer.focus_lost();
    runtime.route_input(
        &pointer,
        PointerEvent::Pressed {
            button: MouseButton::Left,
            position: [10.0, 10.0],
        },
    );
    runtime.route_input(
        &pointer,
        PointerEvent::Moved {
            position: [25.0, 18.0],
        },
    );
    runtime.route_input(
        &pointer,
        PointerEvent::Released {
            button: MouseButton::Left,
            position: [40.0, 25.0],
        },
    );

    alice_sub.cancel();
    let consumed = runtime.route_input(&keys, KeyEvent::pressed(KeyCode::Space));
    info!(consumed, "Space with no players left");
    info!("{}", registry.stats());

    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}
