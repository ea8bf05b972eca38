//! `MemStore`: the in-memory, append-only message stream store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::config::{StorageType, StreamConfig};
use crate::error::{Result, StoreError};
use crate::log::MessageLog;
use crate::message::StoredMessage;
use crate::retention::{self, RetentionOutcome};
use crate::state::{FastState, StreamState};
use crate::subject::{self, SubjectIndex, SubjectState};

/// The mutable guts of a store, guarded by a single store-wide lock.
struct Inner {
    cfg: StreamConfig,
    log: MessageLog,
    index: SubjectIndex,
}

/// Clock used to assign message timestamps. Split out from `Inner` so it can
/// be advanced without taking the write lock on the hot path, and so tests
/// can drive it deterministically without sleeping.
struct Clock {
    last_ts: AtomicI64,
}

impl Clock {
    fn new(start: i64) -> Self {
        Self {
            last_ts: AtomicI64::new(start),
        }
    }

    /// Returns a timestamp strictly greater than every previously assigned
    /// one, using `wall_clock_now` unless the clock would not advance.
    fn next(&self, wall_clock_now: i64) -> i64 {
        let mut prev = self.last_ts.load(Ordering::Relaxed);
        loop {
            let candidate = if wall_clock_now > prev { wall_clock_now } else { prev + 1 };
            match self.last_ts.compare_exchange_weak(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

/// An in-memory, append-only message stream store.
///
/// Cheap to clone: internally an `Arc` around the shared state, so every
/// clone operates on the same underlying log. See the crate docs for the
/// concurrency model.
///
/// The age-timer task holds its own `Arc` clone of the shared state to keep
/// itself alive across await points, so the store's resources are only
/// released by an explicit [`MemStore::stop`] call, not by dropping the last
/// `MemStore` handle.
#[derive(Clone)]
pub struct MemStore {
    shared: Arc<Shared>,
}

struct Shared {
    inner: RwLock<Inner>,
    clock: Clock,
    closed: AtomicBool,
    age_timer_notify: Notify,
    age_timer: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl MemStore {
    /// Creates a new store from the given configuration. Fails if the
    /// configuration is invalid or names a non-memory storage type.
    pub fn new(cfg: StreamConfig) -> Result<Self> {
        cfg.validate()?;

        let shared = Arc::new(Shared {
            inner: RwLock::new(Inner {
                cfg,
                log: MessageLog::new(),
                index: SubjectIndex::new(),
            }),
            clock: Clock::new(now_nanos()),
            closed: AtomicBool::new(false),
            age_timer_notify: Notify::new(),
            age_timer: parking_lot::Mutex::new(None),
        });

        let store = Self { shared };
        store.spawn_age_timer();
        tracing::info!(name = %store.shared.inner.read().cfg.name, "memstore created");
        Ok(store)
    }

    fn spawn_age_timer(&self) {
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            loop {
                let deadline = {
                    let inner = shared.inner.read();
                    next_age_deadline(&inner)
                };

                match deadline {
                    Some(ts) => {
                        let wait = Instant::now() + nanos_from_now(ts);
                        tokio::select! {
                            _ = tokio::time::sleep_until(wait) => {}
                            _ = shared.age_timer_notify.notified() => {}
                        }
                    }
                    None => {
                        shared.age_timer_notify.notified().await;
                    }
                }

                if shared.closed.load(Ordering::Acquire) {
                    return;
                }

                let mut inner = shared.inner.write();
                if shared.closed.load(Ordering::Acquire) {
                    return;
                }
                let now = now_nanos();
                let outcome = run_retention(&mut inner, now, None);
                if !outcome.dropped.is_empty() {
                    tracing::debug!(
                        count = outcome.dropped.len(),
                        "memstore: age timer dropped expired messages"
                    );
                }
            }
        });
        *self.shared.age_timer.lock() = Some(handle);
    }

    fn ensure_open(&self) -> Result<()> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Appends a message, returning its assigned sequence and timestamp.
    pub fn store_msg(&self, subject: &str, headers: Option<Bytes>, payload: Bytes) -> Result<(u64, i64)> {
        self.ensure_open()?;

        let mut inner = self.shared.inner.write();
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }

        if let Some(filters) = &inner.cfg.subjects {
            if !filters.iter().any(|f| subject::matches(f, subject)) {
                return Err(StoreError::SubjectNotMatched {
                    subject: subject.to_string(),
                });
            }
        }

        let incoming_size = crate::message::stored_size(
            subject.len(),
            headers.as_ref().map(Bytes::len).unwrap_or(0),
            payload.len(),
        );
        retention::precheck_discard_new(&inner.cfg, inner.log.msgs(), inner.log.bytes(), incoming_size)?;

        let seq = inner.log.next_seq();
        let ts = self.shared.clock.next(now_nanos());
        let record = StoredMessage::new(seq, ts, subject.to_string(), headers, payload);
        inner.log.append(record);
        inner.index.record_store(subject, seq);

        tracing::debug!(seq, subject, ts, "memstore: stored message");

        let outcome = run_retention(&mut inner, now_nanos(), Some(subject));
        if !outcome.dropped.is_empty() {
            tracing::debug!(seq, count = outcome.dropped.len(), "memstore: retention trimmed after store");
        }
        self.shared.age_timer_notify.notify_one();

        Ok((seq, ts))
    }

    /// Random access by sequence. `scratch`, if supplied, receives a copy of
    /// the payload bytes instead of a cheap `Bytes` clone, letting callers
    /// reuse one buffer across repeated calls.
    pub fn load_msg(&self, seq: u64, scratch: Option<&mut Vec<u8>>) -> Result<StoredMessage> {
        self.ensure_open()?;
        let inner = self.shared.inner.read();

        if seq > inner.log.last_seq() {
            return Err(StoreError::Eof);
        }
        let record = inner.log.get(seq).ok_or(StoreError::MsgNotFound)?;

        if let Some(buf) = scratch {
            buf.clear();
            buf.extend_from_slice(&record.payload);
        }

        Ok((**record).clone())
    }

    /// Removes a message without scrubbing its bytes. Returns whether a
    /// record existed at that sequence.
    pub fn remove_msg(&self, seq: u64) -> Result<bool> {
        self.ensure_open()?;
        let mut inner = self.shared.inner.write();
        match inner.log.remove(seq) {
            Some(removed) => {
                inner.index.record_remove(&removed.subject, removed.seq);
                tracing::debug!(seq, "memstore: removed message");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes a message and overwrites its payload/header bytes with zeros
    /// before release. Best-effort: clones taken by a prior `load_msg` are
    /// unaffected.
    pub fn erase_msg(&self, seq: u64) -> Result<bool> {
        self.ensure_open()?;
        let mut inner = self.shared.inner.write();
        match inner.log.remove(seq) {
            Some(removed) => {
                inner.index.record_remove(&removed.subject, removed.seq);
                if let Ok(mut owned) = Arc::try_unwrap(removed) {
                    owned.scrub();
                }
                tracing::debug!(seq, "memstore: erased message");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Removes every message. Returns the number removed.
    pub fn purge(&self) -> Result<u64> {
        self.ensure_open()?;
        let mut inner = self.shared.inner.write();
        let count = inner.log.purge();
        inner.index.clear();
        tracing::info!(count, "memstore: purged");
        Ok(count)
    }

    /// Removes messages matching `pattern` with `seq >= start_seq`,
    /// retaining the most recent `keep` matches if `keep > 0`.
    pub fn purge_ex(&self, pattern: &str, start_seq: u64, keep: u64) -> Result<u64> {
        self.ensure_open()?;
        let mut inner = self.shared.inner.write();

        let mut candidates: Vec<u64> = inner
            .log
            .iter()
            .filter(|(seq, r)| **seq >= start_seq && subject::matches(pattern, &r.subject))
            .map(|(seq, _)| *seq)
            .collect();
        candidates.sort_unstable();

        if keep > 0 {
            let cut = candidates.len().saturating_sub(keep as usize);
            candidates.truncate(cut);
        }

        let mut removed_count = 0;
        for seq in candidates {
            if let Some(removed) = inner.log.remove(seq) {
                inner.index.record_remove(&removed.subject, removed.seq);
                removed_count += 1;
            }
        }
        tracing::info!(pattern, removed_count, "memstore: purge_ex");
        Ok(removed_count)
    }

    /// Removes all messages with `seq < floor`, advancing past any gaps.
    pub fn compact(&self, floor: u64) -> Result<u64> {
        self.ensure_open()?;
        let mut inner = self.shared.inner.write();
        let removed = inner.log.compact(floor);
        for r in &removed {
            inner.index.record_remove(&r.subject, r.seq);
        }
        tracing::info!(floor, count = removed.len(), "memstore: compacted");
        Ok(removed.len() as u64)
    }

    /// Removes all messages with `seq > ceiling`. `ceiling == 0` performs a
    /// full reset of the stream identity. If `ceiling` itself names a
    /// previously-removed gap rather than a present record, the resulting
    /// `lastSeq` walks back to the nearest present sequence at or below it;
    /// see [`crate::log::MessageLog::truncate`].
    pub fn truncate(&self, ceiling: u64) -> Result<()> {
        self.ensure_open()?;
        let mut inner = self.shared.inner.write();

        if ceiling == 0 {
            inner.log.reset();
            inner.index.clear();
            tracing::info!("memstore: truncated to full reset");
            return Ok(());
        }

        if ceiling > inner.log.last_seq() {
            return Err(StoreError::InvalidSequence(ceiling));
        }

        let removed = inner.log.truncate(ceiling);
        for r in &removed {
            inner.index.record_remove(&r.subject, r.seq);
        }
        tracing::info!(ceiling, count = removed.len(), "memstore: truncated");
        Ok(())
    }

    /// Atomic snapshot of the stream's full state, including interior gaps.
    pub fn state(&self) -> Result<StreamState> {
        self.ensure_open()?;
        let inner = self.shared.inner.read();
        Ok(StreamState::from_log(&inner.log, &inner.index))
    }

    /// Counters-only snapshot, cheaper than [`MemStore::state`] when the
    /// caller does not need the materialized `Deleted` list.
    pub fn fast_state(&self) -> Result<FastState> {
        self.ensure_open()?;
        let inner = self.shared.inner.read();
        Ok(FastState::from_log(&inner.log, &inner.index))
    }

    /// Per-subject summaries, filtered by a (possibly wildcard) pattern.
    /// An empty pattern matches every subject.
    pub fn subjects_state(&self, pattern: &str) -> Result<HashMap<String, SubjectState>> {
        self.ensure_open()?;
        let inner = self.shared.inner.read();
        Ok(crate::state::subjects_state(&inner.index, pattern))
    }

    pub fn num_subjects(&self) -> Result<u64> {
        self.ensure_open()?;
        Ok(self.shared.inner.read().index.num_subjects())
    }

    /// Validates and swaps the configuration. If any limit tightened,
    /// retention runs immediately to bring state back within the new limits.
    pub fn update_config(&self, cfg: StreamConfig) -> Result<()> {
        self.ensure_open()?;
        cfg.validate()?;

        let mut inner = self.shared.inner.write();
        inner.cfg = cfg;
        let now = now_nanos();
        let outcome = run_retention(&mut inner, now, None);
        tracing::info!(count = outcome.dropped.len(), "memstore: config updated, retention re-applied");
        self.shared.age_timer_notify.notify_one();
        Ok(())
    }

    /// Marks the store closed, stops the age timer, and releases retained
    /// records. Subsequent operations return [`StoreError::Closed`].
    pub fn stop(&self) {
        if self.shared.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        {
            let mut inner = self.shared.inner.write();
            inner.log.reset();
            inner.index.clear();
        }
        self.shared.age_timer_notify.notify_one();
        if let Some(handle) = self.shared.age_timer.lock().take() {
            handle.abort();
        }
        tracing::info!("memstore: stopped");
    }

    pub fn storage_type(&self) -> StorageType {
        StorageType::Memory
    }
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(handle) = self.age_timer.lock().take() {
            handle.abort();
        }
    }
}

fn run_retention(inner: &mut Inner, now: i64, just_stored_subject: Option<&str>) -> RetentionOutcome {
    retention::apply(&inner.cfg, &mut inner.log, &mut inner.index, now, just_stored_subject)
}

fn next_age_deadline(inner: &Inner) -> Option<i64> {
    if inner.cfg.max_age <= 0 || inner.log.is_empty() {
        return None;
    }
    inner
        .log
        .get(inner.log.first_seq())
        .map(|r| r.ts + inner.cfg.max_age)
}

fn nanos_from_now(deadline_nanos: i64) -> std::time::Duration {
    let now = now_nanos();
    let delta = deadline_nanos.saturating_sub(now).max(0);
    std::time::Duration::from_nanos(delta as u64)
}

fn now_nanos() -> i64 {
    chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0)
}
