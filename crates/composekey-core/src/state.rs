// Composekey Key State Tracking
// Pressed keys and lock toggles, physical and synthesized

use indexmap::IndexSet;

use crate::layout::KeyboardLayout;
use crate::normalize::ModifierSnapshot;
use crate::{Action, KeyCode};

/// Pressed keys in press order
#[derive(Debug, Clone, Default)]
pub struct PressedKeys {
    pressed: IndexSet<KeyCode>,
}

impl PressedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, code: KeyCode) {
        self.pressed.insert(code);
    }

    pub fn remove(&mut self, code: KeyCode) {
        self.pressed.shift_remove(&code);
    }

    /// Track one transition; autorepeat leaves the set unchanged
    pub fn apply(&mut self, code: KeyCode, action: Action) {
        match action {
            Action::Press => self.add(code),
            Action::Release => self.remove(code),
            Action::Repeat => {}
        }
    }

    pub fn is_pressed(&self, code: KeyCode) -> bool {
        self.pressed.contains(&code)
    }

    /// Pressed keys, oldest first
    pub fn all(&self) -> Vec<KeyCode> {
        self.pressed.iter().copied().collect()
    }

    pub fn clear(&mut self) {
        self.pressed.clear();
    }

    pub fn len(&self) -> usize {
        self.pressed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pressed.is_empty()
    }
}

/// Toggle state of the three lock keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct LockState {
    pub caps: bool,
    pub num: bool,
    pub scroll: bool,
}

impl LockState {
    /// Flip the lock toggled by `code`; other keys are ignored
    pub fn toggle(&mut self, code: KeyCode) {
        match code {
            KeyCode::CAPSLOCK => self.caps = !self.caps,
            KeyCode::NUMLOCK => self.num = !self.num,
            KeyCode::SCROLLLOCK => self.scroll = !self.scroll,
            _ => {}
        }
    }

    pub fn is_on(&self, code: KeyCode) -> bool {
        match code {
            KeyCode::CAPSLOCK => self.caps,
            KeyCode::NUMLOCK => self.num,
            KeyCode::SCROLLLOCK => self.scroll,
            _ => false,
        }
    }
}

/// Physical keyboard state as seen by the composer.
///
/// Tracks every physical transition, including swallowed ones, since
/// modifier detection is about what the user is holding.
#[derive(Debug, Clone, Default)]
pub struct KeyboardState {
    physical: PressedKeys,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, code: KeyCode, action: Action) {
        self.physical.apply(code, action);
    }

    pub fn is_down(&self, code: KeyCode) -> bool {
        self.physical.is_pressed(code)
    }

    /// Modifier state before the event being processed is applied
    pub fn snapshot(&self, layout: &dyn KeyboardLayout, caps_lock: bool) -> ModifierSnapshot {
        let left = self.is_down(KeyCode::LEFT_SHIFT);
        let right = self.is_down(KeyCode::RIGHT_SHIFT);
        let chord = layout.altgr_chord();
        let altgr = layout.has_altgr()
            && !chord.is_empty()
            && chord.iter().all(|code| self.is_down(*code));
        ModifierSnapshot {
            shift: left || right,
            altgr,
            both_shifts: left && right,
            caps_lock,
        }
    }

    pub fn clear(&mut self) {
        self.physical.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TableLayout;

    #[test]
    fn test_pressed_keys_keep_order() {
        let mut keys = PressedKeys::new();
        keys.apply(KeyCode::LEFT_SHIFT, Action::Press);
        keys.apply(KeyCode::A, Action::Press);
        keys.apply(KeyCode::A, Action::Repeat);
        assert_eq!(keys.all(), vec![KeyCode::LEFT_SHIFT, KeyCode::A]);

        keys.apply(KeyCode::LEFT_SHIFT, Action::Release);
        assert_eq!(keys.all(), vec![KeyCode::A]);
    }

    #[test]
    fn test_lock_toggle() {
        let mut locks = LockState::default();
        locks.toggle(KeyCode::CAPSLOCK);
        locks.toggle(KeyCode::A);
        assert!(locks.is_on(KeyCode::CAPSLOCK));
        assert!(!locks.num);
        locks.toggle(KeyCode::CAPSLOCK);
        assert!(!locks.caps);
    }

    #[test]
    fn test_snapshot_shifts() {
        let layout = TableLayout::us();
        let mut state = KeyboardState::new();
        state.observe(KeyCode::LEFT_SHIFT, Action::Press);
        let mods = state.snapshot(&layout, false);
        assert!(mods.shift);
        assert!(!mods.both_shifts);

        state.observe(KeyCode::RIGHT_SHIFT, Action::Press);
        assert!(state.snapshot(&layout, true).both_shifts);
        assert!(state.snapshot(&layout, true).caps_lock);
    }

    #[test]
    fn test_altgr_requires_layout_support() {
        let mut state = KeyboardState::new();
        state.observe(KeyCode::RIGHT_ALT, Action::Press);

        assert!(!state.snapshot(&TableLayout::us(), false).altgr);
        let altgr_layout = TableLayout::us().with_has_altgr(true);
        assert!(state.snapshot(&altgr_layout, false).altgr);
    }
}
