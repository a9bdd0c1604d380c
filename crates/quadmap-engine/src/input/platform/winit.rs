use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton as WinitMouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key as LogicalKey, KeyCode, ModifiersState, NamedKey, PhysicalKey};
use winit::window::Window;

use crate::input::{
    InputEvent, InputState, Key, KeyState, Modifiers, MouseButton, MouseButtonState,
    MouseWheelDelta, PointerButtonEvent, PointerMoveEvent,
};

/// Translates a winit `WindowEvent` into an engine `InputEvent`.
///
/// Returns `None` for events the input subsystem does not model.
pub(crate) fn translate_window_event(
    window: &Window,
    state: &InputState,
    event: &WindowEvent,
) -> Option<InputEvent> {
    match event {
        WindowEvent::ModifiersChanged(m) => Some(InputEvent::ModifiersChanged(map_modifiers(m.state()))),

        WindowEvent::Focused(f) => Some(InputEvent::Focused(*f)),

        WindowEvent::CursorLeft { .. } => Some(InputEvent::PointerLeft),

        WindowEvent::CursorMoved { position, .. } => {
            let (x, y) = to_logical_f32(window, *position);
            Some(InputEvent::PointerMoved(PointerMoveEvent { x, y }))
        }

        WindowEvent::MouseInput { state: st, button, .. } => {
            let st = match st {
                ElementState::Pressed => MouseButtonState::Pressed,
                ElementState::Released => MouseButtonState::Released,
            };

            // winit 0.30 has no cursor query; use the tracked position.
            let (x, y) = state.pointer_pos.unwrap_or((0.0, 0.0));

            Some(InputEvent::PointerButton(PointerButtonEvent {
                button: map_mouse_button(*button),
                state: st,
                x,
                y,
                modifiers: state.modifiers,
            }))
        }

        WindowEvent::MouseWheel { delta, .. } => {
            let delta = match delta {
                MouseScrollDelta::LineDelta(x, y) => MouseWheelDelta::Line { x: *x, y: *y },
                MouseScrollDelta::PixelDelta(p) => {
                    let (x, y) = to_logical_f32(window, *p);
                    MouseWheelDelta::Pixel { x, y }
                }
            };
            Some(InputEvent::MouseWheel { delta, modifiers: state.modifiers })
        }

        WindowEvent::KeyboardInput { event, .. } => {
            let st = match event.state {
                ElementState::Pressed => KeyState::Pressed,
                ElementState::Released => KeyState::Released,
            };
            let code = match event.physical_key {
                PhysicalKey::Code(c) => c as u32,
                PhysicalKey::Unidentified(_) => 0,
            };

            Some(InputEvent::Key {
                key: map_key(&event.logical_key, event.physical_key),
                state: st,
                modifiers: state.modifiers,
                code,
                repeat: event.repeat,
            })
        }

        _ => None,
    }
}

fn to_logical_f32(window: &Window, pos: PhysicalPosition<f64>) -> (f32, f32) {
    let logical = pos.to_logical::<f64>(window.scale_factor());
    (logical.x as f32, logical.y as f32)
}

fn map_modifiers(m: ModifiersState) -> Modifiers {
    Modifiers {
        shift: m.shift_key(),
        ctrl: m.control_key(),
        alt: m.alt_key(),
        meta: m.super_key(),
    }
}

fn map_mouse_button(b: WinitMouseButton) -> MouseButton {
    match b {
        WinitMouseButton::Left => MouseButton::Left,
        WinitMouseButton::Right => MouseButton::Right,
        WinitMouseButton::Middle => MouseButton::Middle,
        WinitMouseButton::Back => MouseButton::Back,
        WinitMouseButton::Forward => MouseButton::Forward,
        WinitMouseButton::Other(v) => MouseButton::Other(v),
    }
}

/// Characters follow the active keyboard layout so `+` means the key that
/// types `+`; named keys fall back to their physical position.
fn map_key(logical: &LogicalKey, physical: PhysicalKey) -> Key {
    let key = match logical {
        LogicalKey::Character(s) => s.chars().next().and_then(key_from_char),
        LogicalKey::Named(named) => key_from_named(*named),
        _ => None,
    };
    key.or_else(|| key_from_physical(physical))
        .unwrap_or_else(|| match physical {
            PhysicalKey::Code(c) => Key::Unknown(c as u32),
            PhysicalKey::Unidentified(_) => Key::Unknown(0),
        })
}

const LETTERS: [Key; 26] = [
    Key::A, Key::B, Key::C, Key::D, Key::E, Key::F, Key::G, Key::H, Key::I,
    Key::J, Key::K, Key::L, Key::M, Key::N, Key::O, Key::P, Key::Q, Key::R,
    Key::S, Key::T, Key::U, Key::V, Key::W, Key::X, Key::Y, Key::Z,
];

const DIGITS: [Key; 10] = [
    Key::Digit0, Key::Digit1, Key::Digit2, Key::Digit3, Key::Digit4,
    Key::Digit5, Key::Digit6, Key::Digit7, Key::Digit8, Key::Digit9,
];

fn key_from_char(c: char) -> Option<Key> {
    let c = c.to_ascii_lowercase();
    match c {
        'a'..='z' => Some(LETTERS[(c as u8 - b'a') as usize]),
        '0'..='9' => Some(DIGITS[(c as u8 - b'0') as usize]),
        // Unshifted `=` shares the key with `+` on most layouts.
        '+' | '=' => Some(Key::Plus),
        '-' | '_' => Some(Key::Minus),
        ' ' => Some(Key::Space),
        _ => None,
    }
}

fn key_from_named(named: NamedKey) -> Option<Key> {
    Some(match named {
        NamedKey::Escape => Key::Escape,
        NamedKey::Enter => Key::Enter,
        NamedKey::Tab => Key::Tab,
        NamedKey::Backspace => Key::Backspace,
        NamedKey::Space => Key::Space,
        NamedKey::Delete => Key::Delete,
        NamedKey::ArrowUp => Key::ArrowUp,
        NamedKey::ArrowDown => Key::ArrowDown,
        NamedKey::ArrowLeft => Key::ArrowLeft,
        NamedKey::ArrowRight => Key::ArrowRight,
        NamedKey::Shift => Key::Shift,
        NamedKey::Control => Key::Control,
        NamedKey::Alt => Key::Alt,
        NamedKey::Super | NamedKey::Meta => Key::Meta,
        NamedKey::F11 => Key::F11,
        _ => return None,
    })
}

/// Keypad keys report digits or operators depending on num-lock; map them by
/// position instead.
fn key_from_physical(pk: PhysicalKey) -> Option<Key> {
    let PhysicalKey::Code(code) = pk else { return None };
    Some(match code {
        KeyCode::NumpadAdd => Key::Plus,
        KeyCode::NumpadSubtract => Key::Minus,
        KeyCode::NumpadEnter => Key::Enter,
        KeyCode::F11 => Key::F11,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characters_map_case_insensitively() {
        assert_eq!(key_from_char('c'), Some(Key::C));
        assert_eq!(key_from_char('C'), Some(Key::C));
        assert_eq!(key_from_char('z'), Some(Key::Z));
        assert_eq!(key_from_char('7'), Some(Key::Digit7));
        assert_eq!(key_from_char('+'), Some(Key::Plus));
        assert_eq!(key_from_char('='), Some(Key::Plus));
        assert_eq!(key_from_char('_'), Some(Key::Minus));
        assert_eq!(key_from_char('é'), None);
    }

    #[test]
    fn keypad_operators_map_by_position() {
        let key = map_key(&LogicalKey::Character("+".into()), PhysicalKey::Code(KeyCode::NumpadAdd));
        assert_eq!(key, Key::Plus);
        let key = map_key(&LogicalKey::Named(NamedKey::Escape), PhysicalKey::Code(KeyCode::Escape));
        assert_eq!(key, Key::Escape);
        let key = map_key(&LogicalKey::Dead(None), PhysicalKey::Code(KeyCode::NumpadSubtract));
        assert_eq!(key, Key::Minus);
        let key = map_key(&LogicalKey::Dead(None), PhysicalKey::Code(KeyCode::KeyQ));
        assert_eq!(key, Key::Unknown(KeyCode::KeyQ as u32));
    }
}
