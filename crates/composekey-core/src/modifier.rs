// Composekey Modifier Classification
// Which physical keys are modifiers, and their left/right counterparts

use crate::KeyCode;

/// Modifier key codes, checked on every keystroke
const MODIFIER_KEY_CODES: &[u16] = &[
    29, 97, // LEFT_CTRL, RIGHT_CTRL
    56, 100, // LEFT_ALT, RIGHT_ALT
    42, 54, // LEFT_SHIFT, RIGHT_SHIFT
    125, 126, // LEFT_META, RIGHT_META
];

/// Modifiers released before typing text into quirky applications.
/// Caps Lock is included so a held Caps Lock does not shift the output.
pub const TYPING_MODIFIERS: &[KeyCode] = &[
    KeyCode::LEFT_SHIFT,
    KeyCode::RIGHT_SHIFT,
    KeyCode::LEFT_CTRL,
    KeyCode::RIGHT_CTRL,
    KeyCode::LEFT_ALT,
    KeyCode::RIGHT_ALT,
    KeyCode::CAPSLOCK,
];

#[inline]
pub const fn is_modifier_code(code: u16) -> bool {
    let mut i = 0;
    while i < MODIFIER_KEY_CODES.len() {
        if MODIFIER_KEY_CODES[i] == code {
            return true;
        }
        i += 1;
    }
    false
}

pub fn is_modifier(code: KeyCode) -> bool {
    is_modifier_code(code.0)
}

pub fn is_shift(code: KeyCode) -> bool {
    matches!(code, KeyCode::LEFT_SHIFT | KeyCode::RIGHT_SHIFT)
}

/// The same modifier on the other side of the keyboard
pub fn paired_key(code: KeyCode) -> Option<KeyCode> {
    match code {
        KeyCode::LEFT_ALT => Some(KeyCode::RIGHT_ALT),
        KeyCode::RIGHT_ALT => Some(KeyCode::LEFT_ALT),
        KeyCode::LEFT_SHIFT => Some(KeyCode::RIGHT_SHIFT),
        KeyCode::RIGHT_SHIFT => Some(KeyCode::LEFT_SHIFT),
        KeyCode::LEFT_CTRL => Some(KeyCode::RIGHT_CTRL),
        KeyCode::RIGHT_CTRL => Some(KeyCode::LEFT_CTRL),
        KeyCode::LEFT_META => Some(KeyCode::RIGHT_META),
        KeyCode::RIGHT_META => Some(KeyCode::LEFT_META),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_modifier_code_static() {
        assert!(is_modifier_code(29)); // LEFT_CTRL
        assert!(is_modifier_code(100)); // RIGHT_ALT
        assert!(is_modifier_code(54)); // RIGHT_SHIFT
        assert!(!is_modifier_code(30)); // A
        assert!(!is_modifier_code(58)); // CAPSLOCK
    }

    #[test]
    fn test_paired_keys() {
        assert_eq!(paired_key(KeyCode::RIGHT_ALT), Some(KeyCode::LEFT_ALT));
        assert_eq!(paired_key(KeyCode::LEFT_SHIFT), Some(KeyCode::RIGHT_SHIFT));
        assert_eq!(paired_key(KeyCode::RIGHT_CTRL), Some(KeyCode::LEFT_CTRL));
        assert_eq!(paired_key(KeyCode::CAPSLOCK), None);
    }
}
