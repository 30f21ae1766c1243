// Composekey Sequence Table
// Compose sequences and their results, with prefix tracking

pub mod generic;
pub mod xcompose;

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use crate::KeySequence;

pub use generic::GenericSequences;
pub use xcompose::{parse_xcompose, XComposeEntry};

/// Built-in sequences shipped with the crate
const BUILTIN_XCOMPOSE: &str = include_str!("../../data/basic.XCompose");

/// Errors raised while loading sequence files
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
}

/// Result of a sequence, with its optional description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceEntry {
    pub result: String,
    pub description: Option<String>,
}

/// All known compose sequences.
///
/// Redefining a sequence replaces its result. Case-folded lookups resolve to
/// the first sequence inserted under that folded form.
#[derive(Debug, Clone, Default)]
pub struct SequenceTable {
    exact: IndexMap<KeySequence, SequenceEntry>,
    prefixes: HashSet<KeySequence>,
    folded_exact: HashMap<KeySequence, KeySequence>,
    folded_prefixes: HashSet<KeySequence>,
}

impl SequenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// The table compiled into the crate
    pub fn builtin() -> Result<Self, TableError> {
        Self::from_xcompose(BUILTIN_XCOMPOSE)
    }

    /// Parse XCompose-format text into a fresh table
    pub fn from_xcompose(content: &str) -> Result<Self, TableError> {
        let mut table = Self::new();
        table.load_xcompose(content)?;
        Ok(table)
    }

    /// Add every entry of XCompose-format text, returning how many were added
    pub fn load_xcompose(&mut self, content: &str) -> Result<usize, TableError> {
        let entries = parse_xcompose(content)?;
        let count = entries.len();
        for entry in entries {
            self.insert(entry.sequence, entry.result, entry.description);
        }
        Ok(count)
    }

    /// Add every entry of an XCompose file
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize, TableError> {
        let content = std::fs::read_to_string(&path)?;
        let count = self.load_xcompose(&content)?;
        log::info!(
            "Loaded {} sequences from {}",
            count,
            path.as_ref().display()
        );
        Ok(count)
    }

    pub fn insert(
        &mut self,
        sequence: KeySequence,
        result: impl Into<String>,
        description: Option<String>,
    ) {
        if sequence.is_empty() {
            return;
        }

        for len in 1..sequence.len() {
            let prefix = sequence.prefix(len);
            self.folded_prefixes.insert(prefix.folded());
            self.prefixes.insert(prefix);
        }

        self.folded_exact
            .entry(sequence.folded())
            .or_insert_with(|| sequence.clone());
        self.exact.insert(
            sequence,
            SequenceEntry {
                result: result.into(),
                description,
            },
        );
    }

    /// Add all entries of `other`, overriding existing ones
    pub fn merge(&mut self, other: SequenceTable) {
        for (sequence, entry) in other.exact {
            self.insert(sequence, entry.result, entry.description);
        }
    }

    pub fn is_valid_sequence(&self, sequence: &KeySequence, ignore_case: bool) -> bool {
        self.lookup(sequence, ignore_case).is_some()
    }

    /// True when some longer sequence starts with `sequence`
    pub fn is_valid_prefix(&self, sequence: &KeySequence, ignore_case: bool) -> bool {
        if ignore_case {
            self.folded_prefixes.contains(&sequence.folded())
        } else {
            self.prefixes.contains(sequence)
        }
    }

    pub fn result(&self, sequence: &KeySequence, ignore_case: bool) -> Option<&str> {
        self.lookup(sequence, ignore_case)
            .map(|entry| entry.result.as_str())
    }

    pub fn entry(&self, sequence: &KeySequence) -> Option<&SequenceEntry> {
        self.exact.get(sequence)
    }

    fn lookup(&self, sequence: &KeySequence, ignore_case: bool) -> Option<&SequenceEntry> {
        if !ignore_case {
            return self.exact.get(sequence);
        }
        self.folded_exact
            .get(&sequence.folded())
            .and_then(|original| self.exact.get(original))
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&KeySequence, &SequenceEntry)> {
        self.exact.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Key;

    fn seq(texts: &[&str]) -> KeySequence {
        texts.iter().map(|t| Key::text(*t)).collect()
    }

    #[test]
    fn test_exact_and_prefix() {
        let mut table = SequenceTable::new();
        table.insert(seq(&["-", "-", "."]), "–", None);

        assert!(table.is_valid_prefix(&seq(&["-"]), false));
        assert!(table.is_valid_prefix(&seq(&["-", "-"]), false));
        assert!(!table.is_valid_prefix(&seq(&["-", "-", "."]), false));
        assert_eq!(table.result(&seq(&["-", "-", "."]), false), Some("–"));
        assert_eq!(table.result(&seq(&["-", "-"]), false), None);
    }

    #[test]
    fn test_case_folded_lookup() {
        let mut table = SequenceTable::new();
        table.insert(seq(&["s", "s"]), "ß", None);

        assert_eq!(table.result(&seq(&["S", "S"]), false), None);
        assert_eq!(table.result(&seq(&["S", "S"]), true), Some("ß"));
        assert!(table.is_valid_prefix(&seq(&["S"]), true));
    }

    #[test]
    fn test_first_folded_entry_wins() {
        let mut table = SequenceTable::new();
        table.insert(seq(&["o", "e"]), "œ", None);
        table.insert(seq(&["O", "E"]), "Œ", None);

        assert_eq!(table.result(&seq(&["O", "e"]), true), Some("œ"));
        assert_eq!(table.result(&seq(&["O", "E"]), false), Some("Œ"));
    }

    #[test]
    fn test_redefinition_replaces_result() {
        let mut table = SequenceTable::new();
        table.insert(seq(&["=", "e"]), "€", None);
        table.insert(seq(&["=", "e"]), "ε", Some("epsilon".to_string()));

        assert_eq!(table.len(), 1);
        assert_eq!(table.result(&seq(&["=", "e"]), false), Some("ε"));
    }

    #[test]
    fn test_builtin_table_loads() {
        let table = SequenceTable::builtin().unwrap();
        assert!(table.len() > 30);
        assert_eq!(table.result(&seq(&["o", "e"]), false), Some("œ"));
    }
}
