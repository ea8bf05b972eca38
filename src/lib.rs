//! # MemStore
//!
//! An in-memory, append-only message stream store for a pub/sub streaming
//! broker's storage tier. Holds an ordered log of messages for a single
//! named stream, enforces count/byte/age/per-subject retention limits,
//! supports random access by monotonic sequence number, interior deletion,
//! and maintains per-subject indexes for subject-filtered queries.
//!
//! Out of scope: the stream manager (ownership, naming, replication,
//! subscription dispatch), wire protocol/client framing/authentication, and
//! other storage backends beyond the contract they share ([`MessageStore`]).

pub mod config;
pub mod error;
pub mod log;
pub mod message;
pub mod retention;
pub mod state;
pub mod store;
pub mod subject;

pub use config::{DiscardPolicy, RetentionPolicy, StorageType, StreamConfig};
pub use error::{Result, StoreError};
pub use message::StoredMessage;
pub use state::{FastState, StreamState};
pub use store::MemStore;
pub use subject::SubjectState;

use std::collections::HashMap;

use bytes::Bytes;

/// The polymorphic storage contract shared by the memory and file backends.
/// Expressed as a trait rather than an inheritance hierarchy so other
/// backends can implement the same surface independently.
pub trait MessageStore {
    fn store_msg(&self, subject: &str, headers: Option<Bytes>, payload: Bytes) -> Result<(u64, i64)>;
    fn load_msg(&self, seq: u64, scratch: Option<&mut Vec<u8>>) -> Result<StoredMessage>;
    fn remove_msg(&self, seq: u64) -> Result<bool>;
    fn erase_msg(&self, seq: u64) -> Result<bool>;
    fn purge(&self) -> Result<u64>;
    fn purge_ex(&self, pattern: &str, start_seq: u64, keep: u64) -> Result<u64>;
    fn compact(&self, floor: u64) -> Result<u64>;
    fn truncate(&self, ceiling: u64) -> Result<()>;
    fn state(&self) -> Result<StreamState>;
    fn fast_state(&self) -> Result<FastState>;
    fn subjects_state(&self, pattern: &str) -> Result<HashMap<String, SubjectState>>;
    fn num_subjects(&self) -> Result<u64>;
    fn update_config(&self, cfg: StreamConfig) -> Result<()>;
    fn stop(&self);
    fn storage_type(&self) -> StorageType;
}

impl MessageStore for MemStore {
    fn store_msg(&self, subject: &str, headers: Option<Bytes>, payload: Bytes) -> Result<(u64, i64)> {
        MemStore::store_msg(self, subject, headers, payload)
    }

    fn load_msg(&self, seq: u64, scratch: Option<&mut Vec<u8>>) -> Result<StoredMessage> {
        MemStore::load_msg(self, seq, scratch)
    }

    fn remove_msg(&self, seq: u64) -> Result<bool> {
        MemStore::remove_msg(self, seq)
    }

    fn erase_msg(&self, seq: u64) -> Result<bool> {
        MemStore::erase_msg(self, seq)
    }

    fn purge(&self) -> Result<u64> {
        MemStore::purge(self)
    }

    fn purge_ex(&self, pattern: &str, start_seq: u64, keep: u64) -> Result<u64> {
        MemStore::purge_ex(self, pattern, start_seq, keep)
    }

    fn compact(&self, floor: u64) -> Result<u64> {
        MemStore::compact(self, floor)
    }

    fn truncate(&self, ceiling: u64) -> Result<()> {
        MemStore::truncate(self, ceiling)
    }

    fn state(&self) -> Result<StreamState> {
        MemStore::state(self)
    }

    fn fast_state(&self) -> Result<FastState> {
        MemStore::fast_state(self)
    }

    fn subjects_state(&self, pattern: &str) -> Result<HashMap<String, SubjectState>> {
        MemStore::subjects_state(self, pattern)
    }

    fn num_subjects(&self) -> Result<u64> {
        MemStore::num_subjects(self)
    }

    fn update_config(&self, cfg: StreamConfig) -> Result<()> {
        MemStore::update_config(self, cfg)
    }

    fn stop(&self) {
        MemStore::stop(self)
    }

    fn storage_type(&self) -> StorageType {
        MemStore::storage_type(self)
    }
}
