#![forbid(unsafe_code)]

//! Input events delivered to form controls.

/// A key as seen by input listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
    /// Any key without a dedicated variant (arrows, modifiers, ...).
    Other,
}

/// An event targeted at a single control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputEvent {
    /// A key went down. Fires for every keystroke, including repeats.
    KeyDown(Key),
    /// A character-producing key was pressed.
    KeyPress(Key),
    /// The control's value was committed (blur, selection change, ...).
    Change,
}

impl InputEvent {
    /// Whether this is an Enter key press.
    #[must_use]
    pub const fn is_enter_press(&self) -> bool {
        matches!(self, Self::KeyPress(Key::Enter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_press_detection() {
        assert!(InputEvent::KeyPress(Key::Enter).is_enter_press());
        assert!(!InputEvent::KeyDown(Key::Enter).is_enter_press());
        assert!(!InputEvent::KeyPress(Key::Char('a')).is_enter_press());
        assert!(!InputEvent::KeyPress(Key::Other).is_enter_press());
        assert!(!InputEvent::Change.is_enter_press());
    }
}
