//! Error types for the in-memory stream store, using thiserror.

use thiserror::Error;

use crate::config::StorageType;

/// Errors returned by [`crate::MemStore`] operations.
///
/// These identities are stable across storage backends (file, memory) that
/// implement the same [`crate::MessageStore`] contract.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store has been stopped via `Stop()`.
    #[error("store is closed")]
    Closed,

    /// The requested sequence was removed, or never existed but falls
    /// within the current `[firstSeq, lastSeq]` range.
    #[error("message not found")]
    MsgNotFound,

    /// The requested sequence is past `lastSeq`.
    #[error("sequence past end of stream")]
    Eof,

    /// `Truncate` was given a sequence greater than `lastSeq`.
    #[error("invalid sequence {0}")]
    InvalidSequence(u64),

    /// A non-memory `Storage` setting was handed to the memory constructor.
    #[error("wrong storage type: expected Memory, got {0:?}")]
    WrongStorageType(StorageType),

    /// The subject does not match any of the stream's configured subject filters.
    #[error("subject {subject:?} does not match any configured stream subject")]
    SubjectNotMatched { subject: String },

    /// `MaxMsgs` would be exceeded and `Discard` is `New`.
    #[error("maximum message count exceeded")]
    MaxMsgs,

    /// `MaxBytes` would be exceeded and `Discard` is `New`.
    #[error("maximum byte size exceeded")]
    MaxBytes,

    /// The stream configuration itself is invalid.
    #[error("invalid stream configuration: {0}")]
    Configuration(String),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
