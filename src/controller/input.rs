/// Platform-agnostic input handling
use std::collections::HashSet;

use glam::Vec2;

/// Keys the application reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Space,
    ShiftLeft,
    ControlLeft,
    Escape,
    P,
    O,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// Platform-independent input events
#[derive(Debug, Clone)]
pub enum InputEvent {
    KeyDown(Key),
    KeyUp(Key),

    MouseMove { dx: f32, dy: f32 },
    MouseButton { button: MouseButton, pressed: bool },

    Resized { width: u32, height: u32 },
    FocusLost,
    PointerLockChanged { locked: bool },
}

/// Input gathered between two frames
#[derive(Debug, Default)]
pub struct InputState {
    pressed_keys: HashSet<Key>,
    just_pressed: Vec<Key>,
    look_delta: Vec2,
    look_button: bool,
    pointer_locked: bool,
    resized: Option<(u32, u32)>,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process an input event and update state
    pub fn process_event(&mut self, event: &InputEvent) {
        match event {
            InputEvent::KeyDown(key) => {
                // key repeat doesn't count as a new press
                if self.pressed_keys.insert(*key) {
                    self.just_pressed.push(*key);
                }
            }
            InputEvent::KeyUp(key) => {
                self.pressed_keys.remove(key);
            }
            InputEvent::MouseMove { dx, dy } => {
                if self.pointer_locked {
                    self.look_delta += Vec2::new(*dx, *dy);
                }
            }
            InputEvent::MouseButton { button, pressed } => {
                if *button == MouseButton::Right {
                    self.look_button = *pressed;
                }
            }
            InputEvent::Resized { width, height } => {
                self.resized = Some((*width, *height));
            }
            InputEvent::FocusLost => {
                self.clear_keys();
                self.look_button = false;
            }
            InputEvent::PointerLockChanged { locked } => {
                self.pointer_locked = *locked;
                if !locked {
                    self.look_delta = Vec2::ZERO;
                }
            }
        }
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed_keys.contains(&key)
    }

    pub fn clear_keys(&mut self) {
        self.pressed_keys.clear();
        self.just_pressed.clear();
    }

    /// Keys pressed since the last call, in press order
    pub fn take_pressed(&mut self) -> Vec<Key> {
        std::mem::take(&mut self.just_pressed)
    }

    pub fn consume_look(&mut self) -> Vec2 {
        std::mem::take(&mut self.look_delta)
    }

    /// Camera look is active while the cursor is grabbed and the look button held
    pub fn look_active(&self) -> bool {
        self.pointer_locked && self.look_button
    }

    pub fn take_resize(&mut self) -> Option<(u32, u32)> {
        self.resized.take()
    }
}
