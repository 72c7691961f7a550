//! Set difference between a stored association and its incoming replacement.

use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<K> {
    /// In stored, not in incoming: detach or delete.
    pub removed: Vec<K>,
    /// In incoming, not in stored: attach or insert.
    pub added: Vec<K>,
    /// In both: left alone.
    pub unchanged: Vec<K>,
}

impl<K> SetDiff<K> {
    pub fn is_noop(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty()
    }
}

/// Diff two key lists. Output preserves the order of the input it came from;
/// duplicate keys are collapsed.
pub fn diff_keys<K>(stored: &[K], incoming: &[K]) -> SetDiff<K>
where
    K: Eq + Hash + Clone,
{
    let stored_set: HashSet<&K> = stored.iter().collect();
    let incoming_set: HashSet<&K> = incoming.iter().collect();

    let mut seen = HashSet::new();
    let removed = stored
        .iter()
        .filter(|k| !incoming_set.contains(k) && seen.insert(*k))
        .cloned()
        .collect();

    let mut seen = HashSet::new();
    let mut added = Vec::new();
    let mut unchanged = Vec::new();
    for k in incoming {
        if !seen.insert(k) {
            continue;
        }
        if stored_set.contains(k) {
            unchanged.push(k.clone());
        } else {
            added.push(k.clone());
        }
    }

    SetDiff {
        removed,
        added,
        unchanged,
    }
}
