//! Debounced owner lookup sequencing
//!
//! Owner-ledger lookups fire as the operator types a national id. Responses
//! arrive out of order, so each form entry carries a monotonically increasing
//! request sequence number and only the highest-numbered response is applied
//! (last writer wins by sequence, not by arrival time).

use std::collections::HashMap;

use crate::validation::normalize_national_id;

/// Minimum normalized digits before a lookup fires
pub const MIN_LOOKUP_DIGITS: usize = 8;

/// Per-entry request sequencer with last-writer-wins application
#[derive(Debug, Default)]
pub struct LookupSequencer {
    issued: HashMap<usize, u64>,
    applied: HashMap<usize, u64>,
}

impl LookupSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Normalize the typed value and decide whether a lookup should fire
    pub fn lookup_key(input: &str) -> Option<String> {
        let digits = normalize_national_id(input);
        (digits.len() >= MIN_LOOKUP_DIGITS).then_some(digits)
    }

    /// Issue the next sequence number for a form entry
    pub fn begin(&mut self, entry_index: usize) -> u64 {
        let seq = self.issued.entry(entry_index).or_insert(0);
        *seq += 1;
        *seq
    }

    /// Apply a response for `(entry_index, seq)`. Returns true when the
    /// response may be applied; stale in-flight responses are discarded and
    /// must not clobber a newer keystroke's result.
    pub fn try_apply(&mut self, entry_index: usize, seq: u64) -> bool {
        let latest = self.issued.get(&entry_index).copied().unwrap_or(0);
        let last_applied = self.applied.get(&entry_index).copied().unwrap_or(0);
        if seq == latest && seq > last_applied {
            self.applied.insert(entry_index, seq);
            true
        } else {
            false
        }
    }

    /// Forget an entry when its form row is removed
    pub fn clear(&mut self, entry_index: usize) {
        self.issued.remove(&entry_index);
        self.applied.remove(&entry_index);
    }
}
