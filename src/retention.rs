//! The retention engine: applies configured limits after every store and on
//! the age timer, always in the fixed order per-subject -> count -> bytes ->
//! age so results are deterministic regardless of which limit triggers.

use crate::config::{DiscardPolicy, StreamConfig};
use crate::log::MessageLog;
use crate::message::StoredMessage;
use crate::subject::SubjectIndex;

/// Outcome of a single retention pass: what was dropped, and when the age
/// timer should next be checked.
#[derive(Debug, Default)]
pub struct RetentionOutcome {
    pub dropped: Vec<std::sync::Arc<StoredMessage>>,
    /// Nanosecond wall-clock deadline the age timer should next fire at, if
    /// `MaxAge` is configured and at least one message remains.
    pub next_age_deadline: Option<i64>,
}

/// Whether a prospective store should be rejected outright under
/// `DiscardPolicy::New`, before it ever reaches the log.
pub fn precheck_discard_new(
    cfg: &StreamConfig,
    current_msgs: u64,
    current_bytes: u64,
    incoming_size: u64,
) -> crate::error::Result<()> {
    if cfg.discard != DiscardPolicy::New {
        return Ok(());
    }
    if cfg.max_msgs > 0 && current_msgs + 1 > cfg.max_msgs as u64 {
        return Err(crate::error::StoreError::MaxMsgs);
    }
    if cfg.max_bytes > 0 && current_bytes + incoming_size > cfg.max_bytes as u64 {
        return Err(crate::error::StoreError::MaxBytes);
    }
    Ok(())
}

/// Applies the four retention steps in order, mutating `log` and `index` in
/// place. `just_stored_subject` is the subject of the message that triggered
/// this pass, if any. When absent (age timer, or a config update that may
/// have tightened `MaxMsgsPer` for every subject at once) the per-subject
/// step enumerates the whole index instead of a single subject.
pub fn apply(
    cfg: &StreamConfig,
    log: &mut MessageLog,
    index: &mut SubjectIndex,
    now: i64,
    just_stored_subject: Option<&str>,
) -> RetentionOutcome {
    let mut dropped = Vec::new();

    // 1. Per-subject limit.
    if cfg.max_msgs_per_subject > 0 {
        match just_stored_subject {
            Some(subject) => trim_subject(cfg, log, index, subject, &mut dropped),
            None => {
                for subject in index.subjects() {
                    trim_subject(cfg, log, index, &subject, &mut dropped);
                }
            }
        }
    }

    // 2. Count limit.
    if cfg.max_msgs > 0 {
        while log.msgs() > cfg.max_msgs as u64 {
            match drop_head(log, index) {
                Some(r) => {
                    tracing::debug!(seq = r.seq, "retention: count limit dropped message");
                    dropped.push(r);
                }
                None => break,
            }
        }
    }

    // 3. Byte limit.
    if cfg.max_bytes > 0 {
        while log.bytes() > cfg.max_bytes as u64 {
            match drop_head(log, index) {
                Some(r) => {
                    tracing::debug!(seq = r.seq, "retention: byte limit dropped message");
                    dropped.push(r);
                }
                None => break,
            }
        }
    }

    // 4. Age limit.
    let mut next_age_deadline = None;
    if cfg.max_age > 0 {
        let cutoff = now.saturating_sub(cfg.max_age);
        while let Some(first_seq) = first_existing_seq(log) {
            let ts = log.get(first_seq).map(|r| r.ts).unwrap_or(i64::MAX);
            if ts >= cutoff {
                break;
            }
            if let Some(r) = drop_head(log, index) {
                tracing::debug!(seq = r.seq, "retention: age limit dropped message");
                dropped.push(r);
            } else {
                break;
            }
        }
        next_age_deadline = first_existing_seq(log)
            .and_then(|seq| log.get(seq))
            .map(|r| r.ts + cfg.max_age)
            .or(Some(now + cfg.max_age));
    }

    RetentionOutcome {
        dropped,
        next_age_deadline,
    }
}

/// Drops the oldest messages carrying `subject` until its count is at or
/// below `cfg.max_msgs_per_subject`.
fn trim_subject(
    cfg: &StreamConfig,
    log: &mut MessageLog,
    index: &mut SubjectIndex,
    subject: &str,
    dropped: &mut Vec<std::sync::Arc<StoredMessage>>,
) {
    let limit = cfg.max_msgs_per_subject as u64;
    while index.count(subject) > limit {
        let Some(oldest) = index.oldest_seq(subject) else {
            break;
        };
        // Drop via `remove_head` when the oldest record for this subject
        // happens to be the log head (the common case, since subjects are
        // usually interleaved in store order); otherwise remove it directly,
        // which leaves an interior gap rather than advancing `firstSeq`.
        let removed = if oldest == log.first_seq() {
            log.remove_head()
        } else {
            log.remove(oldest)
        };
        match removed {
            Some(removed) => {
                index.record_remove(&removed.subject, removed.seq);
                tracing::debug!(
                    seq = removed.seq,
                    subject,
                    "retention: per-subject limit dropped message"
                );
                dropped.push(removed);
            }
            None => break,
        }
    }
}

/// Removes the log head and updates the subject index accordingly. Retention
/// drops always happen at the head, so they never leave an interior gap.
fn drop_head(log: &mut MessageLog, index: &mut SubjectIndex) -> Option<std::sync::Arc<StoredMessage>> {
    let removed = log.remove_head()?;
    index.record_remove(&removed.subject, removed.seq);
    Some(removed)
}

fn first_existing_seq(log: &MessageLog) -> Option<u64> {
    if log.is_empty() {
        None
    } else {
        Some(log.first_seq())
    }
}
