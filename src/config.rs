//! Stream configuration types.
//!
//! `StreamConfig` and its enums mirror the shape of the broker's own
//! client-facing stream configuration (name, subjects, retention knobs,
//! storage kind) so that a `StreamInfo` built from this backend can be
//! serialized identically to one built from any other backend.

use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// Configuration for a single stream backed by a [`crate::MemStore`].
///
/// Sensible defaults are provided for everything except `name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Name of the stream.
    pub name: String,
    /// Subject filters accepted by this stream. `None`/empty means "accept everything".
    pub subjects: Option<Vec<String>>,
    /// Retention policy, carried for parity with the broker's stream config type.
    /// This backend implements `Limits` semantics only; see the crate docs.
    #[serde(default)]
    pub retention: RetentionPolicy,
    /// Maximum number of messages retained. 0 means unlimited.
    #[serde(default)]
    pub max_msgs: i64,
    /// Maximum number of bytes retained (see [`crate::message::stored_size`]). 0 means unlimited.
    #[serde(default)]
    pub max_bytes: i64,
    /// Maximum messages retained per subject. 0 means unlimited.
    #[serde(default)]
    pub max_msgs_per_subject: i64,
    /// Maximum age of a message in nanoseconds before it is dropped. 0 means unlimited.
    #[serde(default)]
    pub max_age: i64,
    /// What happens when a limit would be exceeded by an incoming store.
    #[serde(default)]
    pub discard: DiscardPolicy,
    /// Storage kind. Must be `Memory` for [`crate::MemStore`].
    #[serde(default)]
    pub storage: StorageType,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            subjects: None,
            retention: RetentionPolicy::default(),
            max_msgs: 0,
            max_bytes: 0,
            max_msgs_per_subject: 0,
            max_age: 0,
            discard: DiscardPolicy::default(),
            storage: StorageType::Memory,
        }
    }
}

impl StreamConfig {
    /// Builds a config for the given stream name with otherwise default limits.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_msgs(mut self, max_msgs: i64) -> Self {
        self.max_msgs = max_msgs;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: i64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn with_max_age(mut self, max_age: i64) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn with_max_msgs_per_subject(mut self, max_msgs_per_subject: i64) -> Self {
        self.max_msgs_per_subject = max_msgs_per_subject;
        self
    }

    pub fn with_discard(mut self, discard: DiscardPolicy) -> Self {
        self.discard = discard;
        self
    }

    pub fn with_subjects(mut self, subjects: Vec<String>) -> Self {
        self.subjects = Some(subjects);
        self
    }

    /// Validates the configuration, independent of any previously-installed config.
    pub fn validate(&self) -> Result<()> {
        if self.storage != StorageType::Memory {
            return Err(StoreError::WrongStorageType(self.storage));
        }
        if self.max_msgs < 0 || self.max_bytes < 0 || self.max_age < 0 || self.max_msgs_per_subject < 0
        {
            return Err(StoreError::Configuration(
                "limits must be non-negative".to_string(),
            ));
        }
        if let Some(subjects) = &self.subjects {
            if subjects.iter().any(|s| s.is_empty()) {
                return Err(StoreError::Configuration(
                    "subject filters must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// How messages in a stream are retained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetentionPolicy {
    /// Messages are retained until a configured limit (MaxMsgs/MaxBytes/MaxAge) is hit.
    #[default]
    Limits,
    /// Messages are removed once all known consumers have acknowledged them.
    /// Not implemented by this backend; owned by the stream manager.
    Interest,
    /// Messages are removed once the first worker acknowledges them.
    /// Not implemented by this backend; owned by the stream manager.
    WorkQueue,
}

/// What to do when an incoming store would exceed `MaxMsgs`/`MaxBytes`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscardPolicy {
    /// Evict the oldest messages to make room for the new one.
    #[default]
    Old,
    /// Reject the new store instead of evicting.
    New,
}

/// Backing storage kind for a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// On-disk storage. Not implemented here; a different backend handles it.
    File,
    /// In-memory-only storage, implemented by [`crate::MemStore`].
    Memory,
}

impl Default for StorageType {
    fn default() -> Self {
        StorageType::Memory
    }
}
