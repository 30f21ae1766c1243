// Composekey Usage Statistics
// Key, key pair and sequence counters fed by the composer

use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

use crate::{Key, KeySequence};

/// Statistics collaborator
pub trait StatsSink: Send {
    fn add_key(&mut self, key: &Key);

    /// Two keys pressed within the pair window, in order
    fn add_pair(&mut self, first: &Key, second: &Key);

    fn add_sequence(&mut self, sequence: &KeySequence);
}

/// Discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStats;

impl StatsSink for NoStats {
    fn add_key(&mut self, _key: &Key) {}

    fn add_pair(&mut self, _first: &Key, _second: &Key) {}

    fn add_sequence(&mut self, _sequence: &KeySequence) {}
}

/// In-memory counters, reported in first-seen order
#[derive(Debug, Clone, Default)]
pub struct UsageStats {
    keys: IndexMap<Key, u64>,
    pairs: IndexMap<(Key, Key), u64>,
    sequences: IndexMap<KeySequence, u64>,
}

impl UsageStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_count(&self, key: &Key) -> u64 {
        self.keys.get(key).copied().unwrap_or(0)
    }

    pub fn pair_count(&self, first: &Key, second: &Key) -> u64 {
        self.pairs
            .get(&(first.clone(), second.clone()))
            .copied()
            .unwrap_or(0)
    }

    pub fn sequence_count(&self, sequence: &KeySequence) -> u64 {
        self.sequences.get(sequence).copied().unwrap_or(0)
    }

    pub fn total_sequences(&self) -> u64 {
        self.sequences.values().sum()
    }

    /// Most used sequences; ties keep first-seen order
    pub fn top_sequences(&self, limit: usize) -> Vec<(KeySequence, u64)> {
        let mut ranked: Vec<(KeySequence, u64)> = self
            .sequences
            .iter()
            .map(|(sequence, count)| (sequence.clone(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        ranked.truncate(limit);
        ranked
    }
}

impl StatsSink for UsageStats {
    fn add_key(&mut self, key: &Key) {
        *self.keys.entry(key.clone()).or_insert(0) += 1;
    }

    fn add_pair(&mut self, first: &Key, second: &Key) {
        *self
            .pairs
            .entry((first.clone(), second.clone()))
            .or_insert(0) += 1;
    }

    fn add_sequence(&mut self, sequence: &KeySequence) {
        *self.sequences.entry(sequence.clone()).or_insert(0) += 1;
    }
}

/// Counters shared with the host, which reports them on shutdown
impl<T: StatsSink> StatsSink for Arc<Mutex<T>> {
    fn add_key(&mut self, key: &Key) {
        self.lock().add_key(key)
    }

    fn add_pair(&mut self, first: &Key, second: &Key) {
        self.lock().add_pair(first, second)
    }

    fn add_sequence(&mut self, sequence: &KeySequence) {
        self.lock().add_sequence(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seq(keys: &[&str]) -> KeySequence {
        keys.iter().map(|k| Key::text(*k)).collect()
    }

    #[test]
    fn test_counts_accumulate() {
        let mut stats = UsageStats::new();
        let a = Key::text("a");
        let b = Key::text("b");
        stats.add_key(&a);
        stats.add_key(&a);
        stats.add_pair(&a, &b);

        assert_eq!(stats.key_count(&a), 2);
        assert_eq!(stats.key_count(&b), 0);
        assert_eq!(stats.pair_count(&a, &b), 1);
        assert_eq!(stats.pair_count(&b, &a), 0);
    }

    #[test]
    fn test_top_sequences_ranked() {
        let mut stats = UsageStats::new();
        stats.add_sequence(&seq(&["o", "e"]));
        stats.add_sequence(&seq(&["s", "s"]));
        stats.add_sequence(&seq(&["s", "s"]));
        stats.add_sequence(&seq(&["'", "e"]));

        let top = stats.top_sequences(2);
        assert_eq!(top[0], (seq(&["s", "s"]), 2));
        assert_eq!(top[1], (seq(&["o", "e"]), 1));
        assert_eq!(stats.total_sequences(), 4);
    }

    #[test]
    fn test_shared_stats() {
        let shared = Arc::new(Mutex::new(UsageStats::new()));
        let mut sink = shared.clone();
        sink.add_sequence(&seq(&["o", "o"]));
        assert_eq!(shared.lock().sequence_count(&seq(&["o", "o"])), 1);
    }
}
