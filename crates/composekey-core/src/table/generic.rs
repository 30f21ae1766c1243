// Composekey Generic Sequences
// Unicode code point entry: a prefix key, hex digits, then Space or Enter

use crate::{Key, KeyCode, KeySequence};

const MAX_HEX_DIGITS: usize = 6;

/// Sequences computed from their keys instead of looked up in a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericSequences {
    prefix_keys: Vec<Key>,
}

impl Default for GenericSequences {
    fn default() -> Self {
        Self::new(["u", "U"])
    }
}

impl GenericSequences {
    pub fn new<I, S>(prefix_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            prefix_keys: prefix_keys.into_iter().map(Key::text).collect(),
        }
    }

    pub fn prefix_keys(&self) -> &[Key] {
        &self.prefix_keys
    }

    /// A prefix key followed by at most six hex digits
    pub fn is_prefix(&self, sequence: &KeySequence) -> bool {
        let Some((first, digits)) = sequence.keys().split_first() else {
            return false;
        };
        self.prefix_keys.contains(first)
            && digits.len() <= MAX_HEX_DIGITS
            && digits.iter().all(|key| hex_digit(key).is_some())
    }

    /// Result of a complete code point sequence, or `None` when `sequence`
    /// is not one or names no valid character
    pub fn resolve(&self, sequence: &KeySequence) -> Option<String> {
        let keys = sequence.keys();
        let (first, rest) = keys.split_first()?;
        let (last, digits) = rest.split_last()?;
        if !self.prefix_keys.contains(first) || !is_terminator(last) {
            return None;
        }
        if digits.is_empty() || digits.len() > MAX_HEX_DIGITS {
            return None;
        }

        let hex: String = digits.iter().map(hex_digit).collect::<Option<String>>()?;
        let codepoint = u32::from_str_radix(&hex, 16).ok()?;
        char::from_u32(codepoint).map(|ch| ch.to_string())
    }
}

fn hex_digit(key: &Key) -> Option<char> {
    let text = key.as_text()?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii_hexdigit() => Some(ch),
        _ => None,
    }
}

fn is_terminator(key: &Key) -> bool {
    key.as_text() == Some(" ")
        || *key == Key::from_code(KeyCode::ENTER)
        || *key == Key::from_code(KeyCode::KPENTER)
}
