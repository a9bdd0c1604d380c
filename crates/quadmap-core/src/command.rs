//! Keyboard actions and surface-list commands.

use quadmap_engine::input::Key;

use crate::interaction::NudgeDirection;

/// Keyboard scale step for `+`.
pub const KEY_SCALE_UP: f32 = 1.05;
/// Keyboard scale step for `-`.
pub const KEY_SCALE_DOWN: f32 = 0.95;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Action {
    ToggleCalibration,
    /// Handled by the host window.
    ToggleFullscreen,
    /// Handled by the host window.
    ToggleKiosk,
    TogglePlayback,
    ResetPlacement,
    ToggleMute,
    ToggleHide,
    MoveForward,
    MoveBackward,
    Scale(f32),
    Nudge(NudgeDirection),
    DeselectPoint,
    DeleteSelected,
}

impl Action {
    pub fn from_key(key: Key) -> Option<Action> {
        let action = match key {
            Key::C => Action::ToggleCalibration,
            Key::F | Key::F11 => Action::ToggleFullscreen,
            Key::K => Action::ToggleKiosk,
            Key::P => Action::TogglePlayback,
            Key::R => Action::ResetPlacement,
            Key::M => Action::ToggleMute,
            Key::H => Action::ToggleHide,
            Key::W => Action::MoveForward,
            Key::S => Action::MoveBackward,
            Key::Plus => Action::Scale(KEY_SCALE_UP),
            Key::Minus => Action::Scale(KEY_SCALE_DOWN),
            Key::ArrowLeft => Action::Nudge(NudgeDirection::Left),
            Key::ArrowRight => Action::Nudge(NudgeDirection::Right),
            Key::ArrowUp => Action::Nudge(NudgeDirection::Up),
            Key::ArrowDown => Action::Nudge(NudgeDirection::Down),
            Key::Escape => Action::DeselectPoint,
            Key::Delete | Key::Backspace => Action::DeleteSelected,
            _ => return None,
        };
        Some(action)
    }

    /// Whether holding the key should keep firing the action.
    pub fn repeats(&self) -> bool {
        matches!(self, Action::Scale(_) | Action::Nudge(_))
    }

    /// Actions the host window handles instead of the composition.
    pub fn is_host(&self) -> bool {
        matches!(self, Action::ToggleFullscreen | Action::ToggleKiosk)
    }
}

/// Issued by the surface list against a row index.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ListCommand {
    Select(usize),
    Delete(usize),
    TogglePlay(usize),
    ToggleMute(usize),
    ToggleHide(usize),
    MoveUp(usize),
    MoveDown(usize),
}

impl ListCommand {
    pub fn index(&self) -> usize {
        match *self {
            ListCommand::Select(i)
            | ListCommand::Delete(i)
            | ListCommand::TogglePlay(i)
            | ListCommand::ToggleMute(i)
            | ListCommand::ToggleHide(i)
            | ListCommand::MoveUp(i)
            | ListCommand::MoveDown(i) => i,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_table() {
        assert_eq!(Action::from_key(Key::C), Some(Action::ToggleCalibration));
        assert_eq!(Action::from_key(Key::W), Some(Action::MoveForward));
        assert_eq!(Action::from_key(Key::Plus), Some(Action::Scale(1.05)));
        assert_eq!(Action::from_key(Key::ArrowUp), Some(Action::Nudge(NudgeDirection::Up)));
        assert_eq!(Action::from_key(Key::Backspace), Some(Action::DeleteSelected));
        assert_eq!(Action::from_key(Key::Q), None);
        assert_eq!(Action::from_key(Key::Unknown(99)), None);
    }

    #[test]
    fn only_continuous_actions_repeat() {
        assert!(Action::Nudge(NudgeDirection::Left).repeats());
        assert!(Action::Scale(0.95).repeats());
        assert!(!Action::ToggleMute.repeats());
        assert!(Action::ToggleKiosk.is_host());
        assert!(!Action::ToggleHide.is_host());
    }
}
