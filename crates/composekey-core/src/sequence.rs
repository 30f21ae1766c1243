// Composekey Key Sequences
// Ordered keys typed after the compose key

use smallvec::SmallVec;
use std::fmt;

use crate::Key;

/// Keys typed after the compose key. Most sequences are two or three keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct KeySequence(SmallVec<[Key; 4]>);

impl KeySequence {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub fn push(&mut self, key: Key) {
        self.0.push(key);
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[Key] {
        &self.0
    }

    pub fn first(&self) -> Option<&Key> {
        self.0.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Key> {
        self.0.iter()
    }

    /// The first `len` keys
    pub fn prefix(&self, len: usize) -> KeySequence {
        self.0.iter().take(len).cloned().collect()
    }

    /// Every key lowercased
    pub fn folded(&self) -> KeySequence {
        self.0.iter().map(Key::to_lowercase).collect()
    }

    /// The reversed pair, for two-key sequences only
    pub fn swapped(&self) -> Option<KeySequence> {
        match self.0.as_slice() {
            [a, b] => Some([b.clone(), a.clone()].into_iter().collect()),
            _ => None,
        }
    }

    /// Concatenated text of the printable keys, non-printable keys dropped
    pub fn printable_text(&self) -> String {
        self.0
            .iter()
            .filter(|key| key.is_printable())
            .filter_map(Key::as_text)
            .collect()
    }
}

impl FromIterator<Key> for KeySequence {
    fn from_iter<I: IntoIterator<Item = Key>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a KeySequence {
    type Item = &'a Key;
    type IntoIter = std::slice::Iter<'a, Key>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for KeySequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, key) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KeyCode;

    fn seq(texts: &[&str]) -> KeySequence {
        texts.iter().map(|t| Key::text(*t)).collect()
    }

    #[test]
    fn test_swapped_only_for_pairs() {
        assert_eq!(seq(&["e", "'"]).swapped(), Some(seq(&["'", "e"])));
        assert_eq!(seq(&["a"]).swapped(), None);
        assert_eq!(seq(&["-", "-", "."]).swapped(), None);
    }

    #[test]
    fn test_printable_text_drops_codes() {
        let mut keys = seq(&["a", "b"]);
        keys.push(Key::from_code(KeyCode::ENTER));
        keys.push(Key::compose());
        assert_eq!(keys.printable_text(), "ab");
    }

    #[test]
    fn test_display() {
        let mut keys = seq(&["o", " "]);
        keys.push(Key::compose());
        assert_eq!(keys.to_string(), "o Space ♦");
    }
}
