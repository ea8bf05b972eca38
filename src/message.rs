//! The message record: the store's leaf data type.

use bytes::Bytes;

/// Fixed per-record overhead (seq + ts + length fields) added to every
/// message's stored size. Must be applied exactly so `MaxBytes` accounting
/// is deterministic and reproducible across implementations.
pub const RECORD_OVERHEAD: u64 = 16;

/// An immutable message record, as returned by `LoadMsg` and as stored
/// internally by the log container.
///
/// Constructed once on `StoreMsg` and never mutated afterwards; `RemoveMsg`
/// and `EraseMsg` drop the whole record rather than editing it in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Monotonically increasing sequence number, assigned on store.
    pub seq: u64,
    /// Nanosecond wall-clock timestamp, strictly increasing within a store.
    pub ts: i64,
    /// Subject this message was published on.
    pub subject: String,
    /// Optional opaque header bytes.
    pub headers: Option<Bytes>,
    /// Opaque payload bytes.
    pub payload: Bytes,
}

impl StoredMessage {
    pub fn new(seq: u64, ts: i64, subject: String, headers: Option<Bytes>, payload: Bytes) -> Self {
        Self {
            seq,
            ts,
            subject,
            headers,
            payload,
        }
    }

    /// The number of bytes this record counts against `MaxBytes`.
    pub fn stored_size(&self) -> u64 {
        stored_size(
            self.subject.len(),
            self.headers.as_ref().map(Bytes::len).unwrap_or(0),
            self.payload.len(),
        )
    }

    /// Best-effort in-memory scrub: overwrites header/payload bytes with
    /// zeros before the record is dropped. Not a cryptographic guarantee —
    /// any clone taken via `LoadMsg` before this call still holds the
    /// original bytes, since `Bytes` handles are ref-counted, not
    /// copy-on-write.
    pub(crate) fn scrub(&mut self) {
        if let Some(hdr) = self.headers.as_mut() {
            zero(hdr);
        }
        zero(&mut self.payload);
    }
}

fn zero(buf: &mut Bytes) {
    let len = buf.len();
    if len == 0 {
        return;
    }
    // Zero the existing allocation in place when we hold the only handle to
    // it (the common case, since `erase_msg` only calls this after
    // `Arc::try_unwrap` on the record itself succeeds). If some earlier
    // `LoadMsg` clone still holds a reference, `try_into_mut` fails and we
    // fall back to swapping in a fresh zeroed buffer — the old bytes are
    // left alone for that caller, per the doc comment above.
    let taken = std::mem::take(buf);
    *buf = match taken.try_into_mut() {
        Ok(mut mutable) => {
            mutable.fill(0);
            mutable.freeze()
        }
        Err(_original) => Bytes::from(vec![0u8; len]),
    };
}

/// Computes the accounted size of a message with the given field lengths,
/// per the `len(subj) + len(hdr) + len(msg) + 16` formula.
pub fn stored_size(subject_len: usize, headers_len: usize, payload_len: usize) -> u64 {
    subject_len as u64 + headers_len as u64 + payload_len as u64 + RECORD_OVERHEAD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_size_matches_formula() {
        assert_eq!(stored_size(3, 0, 11), 3 + 0 + 11 + 16);
    }

    #[test]
    fn scrub_zeros_payload_and_headers() {
        let mut msg = StoredMessage::new(
            1,
            0,
            "foo".to_string(),
            Some(Bytes::from_static(b"hdr")),
            Bytes::from_static(b"payload"),
        );
        msg.scrub();
        assert_eq!(msg.payload.as_ref(), &[0u8; 7][..]);
        assert_eq!(msg.headers.unwrap().as_ref(), &[0u8; 3][..]);
    }

    #[test]
    fn scrub_on_empty_buffers_is_a_noop() {
        let mut msg = StoredMessage::new(1, 0, "foo".to_string(), None, Bytes::new());
        msg.scrub();
        assert!(msg.payload.is_empty());
        assert!(msg.headers.is_none());
    }
}
