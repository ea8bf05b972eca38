//! The ordered, sequence-indexed log container.
//!
//! A flat `seq -> record` map plus derived scalars. Index entries elsewhere
//! in the store reference records by `seq`, never by direct reference, so
//! staleness after removal is always a simple key-lookup miss — no cyclic
//! graphs to keep consistent.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::message::StoredMessage;

/// The append-only, gap-tolerant message log for one stream.
#[derive(Debug, Default)]
pub struct MessageLog {
    records: BTreeMap<u64, Arc<StoredMessage>>,
    /// Interior sequences (`firstSeq < seq < lastSeq`) with no record,
    /// maintained incrementally rather than derived by walking the range on
    /// every `State()` call, since gap density can be high in a long-lived
    /// stream.
    deleted: BTreeSet<u64>,
    first_seq: u64,
    last_seq: u64,
    bytes: u64,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a log whose first assigned sequence will be `start_seq`.
    pub fn starting_at(start_seq: u64) -> Self {
        Self {
            first_seq: start_seq,
            last_seq: start_seq.saturating_sub(1),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn msgs(&self) -> u64 {
        self.records.len() as u64
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn first_seq(&self) -> u64 {
        self.first_seq
    }

    pub fn last_seq(&self) -> u64 {
        self.last_seq
    }

    pub fn get(&self, seq: u64) -> Option<&Arc<StoredMessage>> {
        self.records.get(&seq)
    }

    pub fn contains(&self, seq: u64) -> bool {
        self.records.contains_key(&seq)
    }

    /// Ordered, contiguous interior gaps between `firstSeq` and `lastSeq`.
    pub fn deleted(&self) -> Vec<u64> {
        self.deleted.iter().copied().collect()
    }

    pub fn num_deleted(&self) -> u64 {
        self.deleted.len() as u64
    }

    /// The sequence that will be assigned to the next stored message.
    pub fn next_seq(&self) -> u64 {
        if self.is_empty() {
            self.first_seq
        } else {
            self.last_seq + 1
        }
    }

    /// Appends a record at `next_seq()`. Callers are responsible for
    /// assigning `seq`/`ts` consistently with that value.
    pub fn append(&mut self, record: StoredMessage) -> u64 {
        let seq = record.seq;
        let was_empty = self.is_empty();
        self.bytes += record.stored_size();
        self.records.insert(seq, Arc::new(record));
        if was_empty {
            self.first_seq = seq;
        }
        self.last_seq = seq;
        seq
    }

    /// Removes a record by sequence, without scrubbing. Returns the removed
    /// record, if any, and updates `firstSeq`/`lastSeq`/gap bookkeeping.
    ///
    /// Does not distinguish between interior removal (which creates a gap)
    /// and endpoint removal (which advances `firstSeq`/retreats `lastSeq`);
    /// callers needing retention's "always remove at the head" behavior call
    /// [`MessageLog::remove_head`] instead.
    pub fn remove(&mut self, seq: u64) -> Option<Arc<StoredMessage>> {
        let removed = self.records.remove(&seq)?;
        self.bytes -= removed.stored_size();

        if self.records.is_empty() {
            // Removing the last remaining message: firstSeq = lastSeq + 1.
            self.first_seq = self.last_seq + 1;
            self.deleted.clear();
            return Some(removed);
        }

        if seq == self.first_seq {
            self.first_seq = self
                .records
                .range(seq + 1..)
                .next()
                .map(|(&s, _)| s)
                .unwrap_or(self.last_seq + 1);
            // Any interior gaps below the new firstSeq are no longer interior.
            self.deleted = self.deleted.split_off(&self.first_seq);
        } else if seq == self.last_seq {
            self.last_seq = self
                .records
                .range(..seq)
                .next_back()
                .map(|(&s, _)| s)
                .unwrap_or(self.first_seq.saturating_sub(1));
            self.deleted.retain(|&s| s < self.last_seq);
        } else if seq > self.first_seq && seq < self.last_seq {
            self.deleted.insert(seq);
        }

        Some(removed)
    }

    /// Like [`MessageLog::remove`], but used by the retention engine: the
    /// removed sequence is always at `firstSeq`, so it never creates an
    /// interior gap.
    pub fn remove_head(&mut self) -> Option<Arc<StoredMessage>> {
        debug_assert!(self.deleted.first().map(|&d| d != self.first_seq).unwrap_or(true));
        self.remove(self.first_seq)
    }

    /// Removes every record, applying the `Purge()` empty-state rule:
    /// `firstSeq = lastSeq + 1`, `lastSeq` unchanged.
    pub fn purge(&mut self) -> u64 {
        let count = self.records.len() as u64;
        self.records.clear();
        self.deleted.clear();
        self.bytes = 0;
        self.first_seq = self.last_seq + 1;
        count
    }

    /// Removes all records with `seq < floor`. If `floor > lastSeq`,
    /// removes everything and sets `firstSeq = floor, lastSeq = floor - 1`.
    /// Returns the removed records, oldest first.
    pub fn compact(&mut self, floor: u64) -> Vec<Arc<StoredMessage>> {
        if floor > self.last_seq {
            let removed: Vec<_> = self.records.values().cloned().collect();
            self.records.clear();
            self.deleted.clear();
            self.bytes = 0;
            self.first_seq = floor;
            self.last_seq = floor - 1;
            return removed;
        }

        let remaining = self.records.split_off(&floor);
        let removed: Vec<_> = std::mem::replace(&mut self.records, remaining)
            .into_values()
            .collect();
        for r in &removed {
            self.bytes -= r.stored_size();
        }
        // Split at the new `first_seq`, not `floor` itself: if `floor` names
        // a gap that was already removed (it has no record), `first_seq`
        // advances past it to the next present record, and that stale gap
        // must not survive in `deleted` alongside it. Same rule `remove()`
        // follows when advancing `first_seq` past a removed head.
        self.first_seq = self
            .records
            .keys()
            .next()
            .copied()
            .unwrap_or(self.last_seq + 1);
        self.deleted = self.deleted.split_off(&self.first_seq);
        removed
    }

    /// Removes all records with `seq > ceiling`, preserving interior gaps
    /// below the new `lastSeq`.
    ///
    /// `ceiling` may itself name a previously-removed gap rather than a
    /// present record (e.g. store 1..3, remove 2, `truncate(2)`). `lastSeq`
    /// must always name a present record, so in that case `lastSeq` walks
    /// back to the nearest still-present sequence at or below `ceiling`
    /// instead of landing on the gap; any gap sequences above that point
    /// (including `ceiling` itself) are no longer interior and are dropped
    /// from `deleted` rather than retained.
    pub fn truncate(&mut self, ceiling: u64) -> Vec<Arc<StoredMessage>> {
        let tail = self.records.split_off(&(ceiling + 1));
        let removed: Vec<_> = tail.into_values().collect();
        for r in &removed {
            self.bytes -= r.stored_size();
        }
        self.last_seq = self
            .records
            .keys()
            .next_back()
            .copied()
            .unwrap_or(self.first_seq.saturating_sub(1));
        self.deleted.retain(|&s| s < self.last_seq);
        if self.records.is_empty() {
            self.first_seq = self.last_seq + 1;
            self.deleted.clear();
        }
        removed
    }

    /// Full reset to the empty state with `firstSeq = lastSeq = 0`.
    pub fn reset(&mut self) {
        self.records.clear();
        self.deleted.clear();
        self.bytes = 0;
        self.first_seq = 0;
        self.last_seq = 0;
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&u64, &Arc<StoredMessage>)> {
        self.records.iter()
    }
}
