//! Atomic stream state snapshots.

use std::collections::HashMap;

use crate::log::MessageLog;
use crate::subject::{SubjectIndex, SubjectState};

/// Full snapshot of a stream's state, as returned by `State()`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    pub msgs: u64,
    pub bytes: u64,
    pub first_seq: u64,
    pub first_ts: i64,
    pub last_seq: u64,
    pub last_ts: i64,
    pub num_subjects: u64,
    pub num_deleted: u64,
    pub deleted: Vec<u64>,
}

impl StreamState {
    pub fn from_log(log: &MessageLog, index: &SubjectIndex) -> Self {
        let first_ts = log.get(log.first_seq()).map(|r| r.ts).unwrap_or(0);
        let last_ts = log.get(log.last_seq()).map(|r| r.ts).unwrap_or(0);
        Self {
            msgs: log.msgs(),
            bytes: log.bytes(),
            first_seq: log.first_seq(),
            first_ts,
            last_seq: log.last_seq(),
            last_ts,
            num_subjects: index.num_subjects(),
            num_deleted: log.num_deleted(),
            deleted: log.deleted(),
        }
    }
}

/// Lightweight counters-only snapshot, for callers that don't need the
/// materialized `Deleted` list.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FastState {
    pub msgs: u64,
    pub bytes: u64,
    pub first_seq: u64,
    pub last_seq: u64,
    pub num_subjects: u64,
    pub num_deleted: u64,
}

impl FastState {
    pub fn from_log(log: &MessageLog, index: &SubjectIndex) -> Self {
        Self {
            msgs: log.msgs(),
            bytes: log.bytes(),
            first_seq: log.first_seq(),
            last_seq: log.last_seq(),
            num_subjects: index.num_subjects(),
            num_deleted: log.num_deleted(),
        }
    }
}

/// Builds the `SubjectsState` map for a (possibly wildcard) pattern.
pub fn subjects_state(index: &SubjectIndex, pattern: &str) -> HashMap<String, SubjectState> {
    index.subjects_state(pattern)
}
