// Composekey Keyboard Layout
// Resolves physical key codes and modifier state to semantic keys

use std::collections::HashMap;

use crate::{Key, KeyCode};

/// Everything the layout needs to resolve one key transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutInput {
    pub code: KeyCode,
    pub scan: Option<u32>,
    pub shift: bool,
    pub altgr: bool,
    pub caps_lock: bool,
}

impl LayoutInput {
    /// The key with no modifiers or locks active
    pub fn plain(code: KeyCode) -> Self {
        Self {
            code,
            scan: None,
            shift: false,
            altgr: false,
            caps_lock: false,
        }
    }
}

/// Keyboard layout collaborator.
///
/// Implementations must not block; `resolve` runs once per key event.
pub trait KeyboardLayout: Send {
    /// Resolve a key; keys with no text resolve to their code
    fn resolve(&self, input: &LayoutInput) -> Key;

    /// Whether right Alt acts as AltGr on this layout
    fn has_altgr(&self) -> bool;

    /// What `key` types when AltGr is held, if anything
    fn altgr_variant(&self, key: &Key) -> Option<Key>;

    /// Keys that together make up a held AltGr
    fn altgr_chord(&self) -> &[KeyCode] {
        &[KeyCode::RIGHT_ALT]
    }

    /// Stash a pending dead key so processing does not consume it
    fn save_dead_key(&mut self) {}

    /// Put back the dead key stashed by `save_dead_key`
    fn restore_dead_key(&mut self) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Levels {
    base: String,
    shifted: String,
}

impl Levels {
    fn new(base: &str, shifted: &str) -> Self {
        Self {
            base: base.to_string(),
            shifted: shifted.to_string(),
        }
    }

    /// Caps Lock inverts Shift for ASCII letters only
    fn select(&self, shift: bool, caps_lock: bool) -> &str {
        let letter = self.base.len() == 1 && self.base.chars().all(|c| c.is_ascii_alphabetic());
        if shift ^ (caps_lock && letter) {
            &self.shifted
        } else {
            &self.base
        }
    }
}

/// Table-driven layout: a US base with configurable overrides
#[derive(Debug, Clone)]
pub struct TableLayout {
    levels: HashMap<KeyCode, Levels>,
    altgr: HashMap<KeyCode, Levels>,
    has_altgr: bool,
    altgr_chord: Vec<KeyCode>,
}

const US_LEVELS: &[(KeyCode, &str, &str)] = &[
    (KeyCode::GRAVE, "`", "~"),
    (KeyCode::KEY_1, "1", "!"),
    (KeyCode::KEY_2, "2", "@"),
    (KeyCode::KEY_3, "3", "#"),
    (KeyCode::KEY_4, "4", "$"),
    (KeyCode::KEY_5, "5", "%"),
    (KeyCode::KEY_6, "6", "^"),
    (KeyCode::KEY_7, "7", "&"),
    (KeyCode::KEY_8, "8", "*"),
    (KeyCode::KEY_9, "9", "("),
    (KeyCode::KEY_0, "0", ")"),
    (KeyCode::MINUS, "-", "_"),
    (KeyCode::EQUAL, "=", "+"),
    (KeyCode::Q, "q", "Q"),
    (KeyCode::W, "w", "W"),
    (KeyCode::E, "e", "E"),
    (KeyCode::R, "r", "R"),
    (KeyCode::T, "t", "T"),
    (KeyCode::Y, "y", "Y"),
    (KeyCode::U, "u", "U"),
    (KeyCode::I, "i", "I"),
    (KeyCode::O, "o", "O"),
    (KeyCode::P, "p", "P"),
    (KeyCode::LEFT_BRACE, "[", "{"),
    (KeyCode::RIGHT_BRACE, "]", "}"),
    (KeyCode::BACKSLASH, "\\", "|"),
    (KeyCode::A, "a", "A"),
    (KeyCode::S, "s", "S"),
    (KeyCode::D, "d", "D"),
    (KeyCode::F, "f", "F"),
    (KeyCode::G, "g", "G"),
    (KeyCode::H, "h", "H"),
    (KeyCode::J, "j", "J"),
    (KeyCode::K, "k", "K"),
    (KeyCode::L, "l", "L"),
    (KeyCode::SEMICOLON, ";", ":"),
    (KeyCode::APOSTROPHE, "'", "\""),
    (KeyCode::Z, "z", "Z"),
    (KeyCode::X, "x", "X"),
    (KeyCode::C, "c", "C"),
    (KeyCode::V, "v", "V"),
    (KeyCode::B, "b", "B"),
    (KeyCode::N, "n", "N"),
    (KeyCode::M, "m", "M"),
    (KeyCode::COMMA, ",", "<"),
    (KeyCode::DOT, ".", ">"),
    (KeyCode::SLASH, "/", "?"),
    (KeyCode::SPACE, " ", " "),
];

impl Default for TableLayout {
    fn default() -> Self {
        Self::us()
    }
}

impl TableLayout {
    /// US QWERTY without AltGr
    pub fn us() -> Self {
        let levels = US_LEVELS
            .iter()
            .map(|(code, base, shifted)| (*code, Levels::new(base, shifted)))
            .collect();
        Self {
            levels,
            altgr: HashMap::new(),
            has_altgr: false,
            altgr_chord: vec![KeyCode::RIGHT_ALT],
        }
    }

    /// Replace what a key types at the base and shifted levels
    pub fn with_level(mut self, code: KeyCode, base: &str, shifted: &str) -> Self {
        self.levels.insert(code, Levels::new(base, shifted));
        self
    }

    /// Add an AltGr level for a key; this also marks the layout as having AltGr
    pub fn with_altgr(mut self, code: KeyCode, base: &str, shifted: &str) -> Self {
        self.altgr.insert(code, Levels::new(base, shifted));
        self.has_altgr = true;
        self
    }

    pub fn with_has_altgr(mut self, has_altgr: bool) -> Self {
        self.has_altgr = has_altgr;
        self
    }

    pub fn with_altgr_chord(mut self, chord: Vec<KeyCode>) -> Self {
        if !chord.is_empty() {
            self.altgr_chord = chord;
        }
        self
    }

    fn resolve_levels(levels: &Levels, code: KeyCode, input: &LayoutInput) -> Key {
        Key::from_text(Some(code), levels.select(input.shift, input.caps_lock))
            .with_scan(input.scan)
    }
}

impl KeyboardLayout for TableLayout {
    fn resolve(&self, input: &LayoutInput) -> Key {
        if input.altgr && self.has_altgr {
            if let Some(levels) = self.altgr.get(&input.code) {
                return Self::resolve_levels(levels, input.code, input);
            }
        }
        match self.levels.get(&input.code) {
            Some(levels) => Self::resolve_levels(levels, input.code, input),
            None => Key::from_code(input.code).with_scan(input.scan),
        }
    }

    fn has_altgr(&self) -> bool {
        self.has_altgr
    }

    fn altgr_variant(&self, key: &Key) -> Option<Key> {
        if !self.has_altgr {
            return None;
        }
        let code = key.code()?;
        let altgr = self.altgr.get(&code)?;
        let shifted = self.levels.get(&code).is_some_and(|levels| {
            levels.base != levels.shifted && key.as_text() == Some(levels.shifted.as_str())
        });
        let text = if shifted { &altgr.shifted } else { &altgr.base };
        Some(Key::from_text(Some(code), text.as_str()).with_scan(key.scan()))
    }

    fn altgr_chord(&self) -> &[KeyCode] {
        &self.altgr_chord
    }
}
