// Composekey Key Type
// Semantic key identity: what a physical key means under the current layout

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::modifier;
use crate::KeyCode;

/// What a key stands for once the layout has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeySym {
    /// The key types this text (`"e"`, `"€"`, `" "`)
    Text(String),
    /// The key has no printable form and is known only by its code
    Code(KeyCode),
    /// The synthetic compose symbol, produced by pressing the compose
    /// key again inside a sequence
    Compose,
}

/// A normalized key.
///
/// Equality and hashing use the symbol only: two physical keys producing
/// the same text are the same key for sequence matching.
#[derive(Debug, Clone)]
pub struct Key {
    code: Option<KeyCode>,
    scan: Option<u32>,
    sym: KeySym,
}

/// Non-printable keys allowed inside a sequence
const USABLE_CODES: &[KeyCode] = &[
    KeyCode::ENTER,
    KeyCode::KPENTER,
    KeyCode::UP,
    KeyCode::DOWN,
    KeyCode::LEFT,
    KeyCode::RIGHT,
];

impl Key {
    /// A key known only by its code
    pub fn from_code(code: KeyCode) -> Self {
        Self {
            code: Some(code),
            scan: None,
            sym: KeySym::Code(code),
        }
    }

    /// A key typing `text`, optionally tied to the physical key that produced it
    pub fn from_text(code: Option<KeyCode>, text: impl Into<String>) -> Self {
        Self {
            code,
            scan: None,
            sym: KeySym::Text(text.into()),
        }
    }

    /// Shorthand for a text key with no physical origin
    pub fn text(text: impl Into<String>) -> Self {
        Self::from_text(None, text)
    }

    pub fn compose() -> Self {
        Self {
            code: None,
            scan: None,
            sym: KeySym::Compose,
        }
    }

    pub fn with_scan(mut self, scan: Option<u32>) -> Self {
        self.scan = scan;
        self
    }

    pub fn code(&self) -> Option<KeyCode> {
        self.code
    }

    pub fn scan(&self) -> Option<u32> {
        self.scan
    }

    pub fn sym(&self) -> &KeySym {
        &self.sym
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.sym {
            KeySym::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_compose(&self) -> bool {
        matches!(self.sym, KeySym::Compose)
    }

    /// Produces visible text: non-empty and free of control characters
    pub fn is_printable(&self) -> bool {
        match &self.sym {
            KeySym::Text(text) => !text.is_empty() && !text.chars().any(char::is_control),
            _ => false,
        }
    }

    pub fn is_modifier(&self) -> bool {
        match &self.sym {
            KeySym::Code(code) => modifier::is_modifier(*code),
            _ => false,
        }
    }

    /// Whether the key may be appended to a compose sequence
    pub fn is_usable(&self) -> bool {
        match &self.sym {
            KeySym::Compose => true,
            KeySym::Text(_) => self.is_printable(),
            KeySym::Code(code) => USABLE_CODES.contains(code),
        }
    }

    /// Lowercase form for case-insensitive matching; non-text keys are unchanged
    pub fn to_lowercase(&self) -> Key {
        match &self.sym {
            KeySym::Text(text) => Key {
                code: self.code,
                scan: self.scan,
                sym: KeySym::Text(text.to_lowercase()),
            },
            _ => self.clone(),
        }
    }

    /// Human readable name, as shown in sequence listings
    pub fn friendly_name(&self) -> String {
        match &self.sym {
            KeySym::Compose => "♦".to_string(),
            KeySym::Text(text) if text == " " => "Space".to_string(),
            KeySym::Text(text) => text.clone(),
            KeySym::Code(code) => code.name().to_string(),
        }
    }
}

impl PartialEq for Key {
    fn eq(&self, other: &Self) -> bool {
        self.sym == other.sym
    }
}

impl Eq for Key {}

impl Hash for Key {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.sym.hash(state);
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.friendly_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_ignores_physical_origin() {
        let typed = Key::from_text(Some(KeyCode::E), "e").with_scan(Some(0x12));
        assert_eq!(typed, Key::text("e"));
        assert_ne!(Key::text("e"), Key::text("E"));
        assert_ne!(Key::from_code(KeyCode::ENTER), Key::from_code(KeyCode::KPENTER));
    }

    #[test]
    fn test_printable_and_usable() {
        assert!(Key::text("é").is_printable());
        assert!(!Key::text("\t").is_printable());
        assert!(Key::compose().is_usable());
        assert!(Key::from_code(KeyCode::ENTER).is_usable());
        assert!(Key::from_code(KeyCode::LEFT).is_usable());
        assert!(!Key::from_code(KeyCode::TAB).is_usable());
        assert!(!Key::from_code(KeyCode::LEFT_SHIFT).is_usable());
    }

    #[test]
    fn test_modifier_detection() {
        assert!(Key::from_code(KeyCode::RIGHT_ALT).is_modifier());
        assert!(!Key::from_code(KeyCode::CAPSLOCK).is_modifier());
        assert!(!Key::from_text(Some(KeyCode::A), "a").is_modifier());
    }

    #[test]
    fn test_lowercase_keeps_non_text() {
        assert_eq!(Key::text("É").to_lowercase(), Key::text("é"));
        assert_eq!(Key::compose().to_lowercase(), Key::compose());
    }

    #[test]
    fn test_friendly_names() {
        assert_eq!(Key::text(" ").friendly_name(), "Space");
        assert_eq!(Key::from_code(KeyCode::ENTER).to_string(), "ENTER");
        assert_eq!(Key::compose().to_string(), "♦");
    }
}
