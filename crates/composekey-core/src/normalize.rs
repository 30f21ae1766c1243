// Composekey Event Normalizer
// Raw key transitions to semantic keys

use crate::layout::{KeyboardLayout, LayoutInput};
use crate::{Action, Key, KeyCode};

/// A key transition as read from the input device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawKeyEvent {
    pub code: KeyCode,
    pub scan: Option<u32>,
    pub action: Action,
    /// Extended-key flag, set for keys on the right side of some keyboards
    pub extended: bool,
}

impl RawKeyEvent {
    pub fn new(code: KeyCode, action: Action) -> Self {
        Self {
            code,
            scan: None,
            action,
            extended: false,
        }
    }

    pub fn press(code: KeyCode) -> Self {
        Self::new(code, Action::Press)
    }

    pub fn release(code: KeyCode) -> Self {
        Self::new(code, Action::Release)
    }

    pub fn repeat(code: KeyCode) -> Self {
        Self::new(code, Action::Repeat)
    }

    pub fn with_scan(mut self, scan: u32) -> Self {
        self.scan = Some(scan);
        self
    }

    pub fn with_extended(mut self, extended: bool) -> Self {
        self.extended = extended;
        self
    }

    pub fn is_down(&self) -> bool {
        self.action.is_down()
    }
}

/// Modifier and lock state at the time of an event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModifierSnapshot {
    pub shift: bool,
    pub altgr: bool,
    pub both_shifts: bool,
    pub caps_lock: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedKey {
    pub key: Key,
    /// The key was recased by the Caps Lock capitalization rule and its
    /// key-down must be typed as text
    pub capslock_override: bool,
}

/// Resolve a raw event through the layout.
///
/// With `caps_capitalizes`, Caps Lock also recases non-ASCII letters the
/// layout leaves alone: lowercase when Shift is held, uppercase otherwise.
pub fn normalize(
    layout: &dyn KeyboardLayout,
    event: &RawKeyEvent,
    mods: &ModifierSnapshot,
    caps_capitalizes: bool,
) -> NormalizedKey {
    let input = LayoutInput {
        code: event.code,
        scan: event.scan,
        shift: mods.shift,
        altgr: mods.altgr,
        caps_lock: mods.caps_lock,
    };
    let key = layout.resolve(&input);

    if mods.caps_lock && caps_capitalizes {
        let uncapped = layout.resolve(&LayoutInput {
            caps_lock: false,
            ..input
        });
        if let Some(recased) = uncapped.as_text().and_then(|t| recase(t, mods.shift)) {
            return NormalizedKey {
                key: Key::from_text(key.code(), recased).with_scan(event.scan),
                capslock_override: true,
            };
        }
    }

    NormalizedKey {
        key,
        capslock_override: false,
    }
}

/// Case-flip a single non-ASCII letter that has distinct cases
fn recase(text: &str, shift: bool) -> Option<String> {
    let mut chars = text.chars();
    let (Some(ch), None) = (chars.next(), chars.next()) else {
        return None;
    };
    if ch.is_ascii() {
        return None;
    }

    // The sharp s uppercases to "SS" in Unicode case mapping; keep it one letter
    match ch {
        'ß' | 'ẞ' => return Some(if shift { "ß" } else { "ẞ" }.to_string()),
        _ => {}
    }

    let upper: String = ch.to_uppercase().collect();
    let lower: String = ch.to_lowercase().collect();
    if upper == lower {
        return None;
    }
    Some(if shift { lower } else { upper })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::TableLayout;

    fn layout() -> TableLayout {
        TableLayout::us()
            .with_level(KeyCode::SEMICOLON, "é", "É")
            .with_level(KeyCode::MINUS, "ß", "?")
            .with_level(KeyCode::EQUAL, "€", "+")
    }

    fn mods(shift: bool, caps_lock: bool) -> ModifierSnapshot {
        ModifierSnapshot {
            shift,
            caps_lock,
            ..ModifierSnapshot::default()
        }
    }

    #[test]
    fn test_plain_resolution() {
        let n = normalize(&layout(), &RawKeyEvent::press(KeyCode::A), &mods(false, false), true);
        assert_eq!(n.key, Key::text("a"));
        assert!(!n.capslock_override);
        assert_eq!(n.key.code(), Some(KeyCode::A));
    }

    #[test]
    fn test_caps_capitalizes_non_ascii() {
        let event = RawKeyEvent::press(KeyCode::SEMICOLON);
        let n = normalize(&layout(), &event, &mods(false, true), true);
        assert_eq!(n.key, Key::text("É"));
        assert!(n.capslock_override);

        let n = normalize(&layout(), &event, &mods(true, true), true);
        assert_eq!(n.key, Key::text("é"));
        assert!(n.capslock_override);
    }

    #[test]
    fn test_caps_rule_disabled_or_not_applicable() {
        let event = RawKeyEvent::press(KeyCode::SEMICOLON);
        let n = normalize(&layout(), &event, &mods(false, true), false);
        assert_eq!(n.key, Key::text("é"));
        assert!(!n.capslock_override);

        // ASCII letters are the layout's business
        let n = normalize(&layout(), &RawKeyEvent::press(KeyCode::A), &mods(false, true), true);
        assert_eq!(n.key, Key::text("A"));
        assert!(!n.capslock_override);

        // No case distinction
        let n = normalize(&layout(), &RawKeyEvent::press(KeyCode::EQUAL), &mods(false, true), true);
        assert_eq!(n.key, Key::text("€"));
        assert!(!n.capslock_override);
    }

    #[test]
    fn test_sharp_s() {
        let event = RawKeyEvent::press(KeyCode::MINUS);
        let n = normalize(&layout(), &event, &mods(false, true), true);
        assert_eq!(n.key, Key::text("ẞ"));
    }

    #[test]
    fn test_unresolved_key_keeps_code() {
        let n = normalize(
            &layout(),
            &RawKeyEvent::press(KeyCode::TAB).with_scan(0x0f),
            &mods(false, false),
            false,
        );
        assert_eq!(n.key, Key::from_code(KeyCode::TAB));
        assert_eq!(n.key.scan(), Some(0x0f));
    }
}
