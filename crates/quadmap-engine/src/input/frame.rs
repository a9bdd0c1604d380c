use std::collections::HashSet;

use super::types::{InputEvent, Key, KeyState, MouseButton};

/// Per-frame input deltas.
///
/// `InputState` holds what is currently down; `InputFrame` holds what changed
/// since the last presented frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Raw events in arrival order (includes key repeats).
    pub events: Vec<InputEvent>,

    pub keys_pressed: HashSet<Key>,
    pub keys_released: HashSet<Key>,

    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,

    /// Accumulated vertical wheel movement in lines; positive = away from the
    /// user.
    pub scroll_lines: f32,
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.keys_pressed.clear();
        self.keys_released.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.scroll_lines = 0.0;
    }

    pub fn push_event(&mut self, ev: InputEvent) {
        self.events.push(ev);
    }

    /// Key presses in arrival order, including auto-repeats when `repeats`.
    pub fn key_presses(&self, repeats: bool) -> impl Iterator<Item = (Key, bool)> + '_ {
        self.events.iter().filter_map(move |ev| match ev {
            InputEvent::Key { key, state: KeyState::Pressed, repeat, .. }
                if repeats || !*repeat =>
            {
                Some((*key, *repeat))
            }
            _ => None,
        })
    }
}
