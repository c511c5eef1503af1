//! Keyboard and mouse state between frames.
//!
//! Window events only say when a key goes down or up, so the held set is kept
//! here and sampled once per frame. Raw mouse motion is summed while the cursor
//! is captured and handed to the camera in one piece.

use std::collections::HashSet;

use winit::keyboard::KeyCode;

use crate::camera::Movement;

const SPRINT_MULTIPLIER: f32 = 3.0;

const BINDINGS: [(Movement, [KeyCode; 2]); 4] = [
    (Movement::Forward, [KeyCode::KeyW, KeyCode::ArrowUp]),
    (Movement::Backward, [KeyCode::KeyS, KeyCode::ArrowDown]),
    (Movement::Left, [KeyCode::KeyA, KeyCode::ArrowLeft]),
    (Movement::Right, [KeyCode::KeyD, KeyCode::ArrowRight]),
];

#[derive(Debug, Default)]
pub struct InputState {
    held: HashSet<KeyCode>,
    mouse_delta: (f64, f64),
    captured: bool,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle_key(&mut self, key: KeyCode, pressed: bool) {
        if pressed {
            self.held.insert(key);
        } else {
            self.held.remove(&key);
        }
    }

    pub fn is_held(&self, key: KeyCode) -> bool {
        self.held.contains(&key)
    }

    /// Movement directions whose keys are currently held. Each direction is
    /// reported at most once even if both of its keys are down.
    pub fn movements(&self) -> impl Iterator<Item = Movement> + '_ {
        BINDINGS
            .iter()
            .filter(|(_, keys)| keys.iter().any(|key| self.held.contains(key)))
            .map(|(movement, _)| *movement)
    }

    /// Multiplier applied to the frame time for movement; holding shift sprints.
    pub fn time_scale(&self) -> f32 {
        if self.is_held(KeyCode::ShiftLeft) || self.is_held(KeyCode::ShiftRight) {
            SPRINT_MULTIPLIER
        } else {
            1.0
        }
    }

    pub fn captured(&self) -> bool {
        self.captured
    }

    pub fn set_captured(&mut self, captured: bool) {
        self.captured = captured;
        if !captured {
            self.mouse_delta = (0.0, 0.0);
        }
    }

    /// Adds raw pointer motion. Ignored unless the cursor is captured.
    pub fn accumulate_mouse(&mut self, dx: f64, dy: f64) {
        if self.captured {
            self.mouse_delta.0 += dx;
            self.mouse_delta.1 += dy;
        }
    }

    /// Returns the motion gathered since the last call as camera offsets and
    /// resets it. Screen y grows downwards, so it is flipped: moving the mouse
    /// up pitches the camera up.
    pub fn take_mouse_delta(&mut self) -> (f32, f32) {
        let (dx, dy) = std::mem::take(&mut self.mouse_delta);
        (dx as f32, -dy as f32)
    }

    /// Forgets every held key and pending motion, e.g. when focus is lost.
    pub fn clear(&mut self) {
        self.held.clear();
        self.mouse_delta = (0.0, 0.0);
    }
}
