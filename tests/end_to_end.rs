//! Integration tests for the nine literal store scenarios the memory store
//! must satisfy end to end: basic store/load, each retention limit acting
//! alone, interior delete interactions with compact/truncate, wildcard purge,
//! a live config tightening, and a full-reset restart.

use bytes::Bytes;
use memstore::{DiscardPolicy, MemStore, MessageStore, StoreError, StreamConfig};

fn cfg(name: &str) -> StreamConfig {
    StreamConfig::new(name)
}

#[tokio::test]
async fn basic_store_and_state() {
    let store = MemStore::new(cfg("basic")).unwrap();

    let before = chrono::Utc::now().timestamp_nanos_opt().unwrap();
    let (seq, ts) = store
        .store_msg("foo", None, Bytes::from_static(b"Hello World"))
        .unwrap();
    let after = chrono::Utc::now().timestamp_nanos_opt().unwrap();

    assert_eq!(seq, 1);
    assert!(ts >= before && ts <= after + 1_000_000);

    let state = store.state().unwrap();
    assert_eq!(state.msgs, 1);
    assert_eq!(state.bytes, "foo".len() as u64 + 0 + "Hello World".len() as u64 + 16);
    assert_eq!(state.first_seq, 1);
    assert_eq!(state.last_seq, 1);
}

#[tokio::test]
async fn message_count_trim_drops_from_head() {
    let mut config = cfg("count_trim");
    config.max_msgs = 10;
    let store = MemStore::new(config).unwrap();

    for _ in 0..11 {
        store
            .store_msg("foo", None, Bytes::from_static(b"Hello World"))
            .unwrap();
    }

    let state = store.state().unwrap();
    assert_eq!(state.msgs, 10);
    assert_eq!(state.first_seq, 2);
    assert_eq!(state.last_seq, 11);
    assert!(matches!(store.load_msg(1, None), Err(StoreError::MsgNotFound)));
}

#[tokio::test]
async fn byte_trim_drops_from_head() {
    let mut config = cfg("byte_trim");
    // storedSize("foo", none, 512 bytes) = 3 + 0 + 512 + 16 = 531
    config.max_bytes = 531 * 1024;
    let store = MemStore::new(config).unwrap();

    let payload = Bytes::from(vec![0u8; 512]);
    for _ in 0..1034 {
        store.store_msg("foo", None, payload.clone()).unwrap();
    }

    let state = store.state().unwrap();
    assert_eq!(state.msgs, 1024);
    assert_eq!(state.bytes, 531 * 1024);
    assert_eq!(state.first_seq, 11);
    assert_eq!(state.last_seq, 1034);
}

#[tokio::test]
async fn interior_delete_then_compact() {
    let store = MemStore::new(cfg("interior_compact")).unwrap();
    for _ in 0..10 {
        store.store_msg("foo", None, Bytes::from_static(b"x")).unwrap();
    }
    for seq in [2, 4, 6, 8] {
        store.remove_msg(seq).unwrap();
    }

    let before = store.state().unwrap();
    assert_eq!(before.deleted, vec![2, 4, 6, 8]);

    let removed = store.compact(6).unwrap();
    assert_eq!(removed, 3); // seqs 1, 3, 5; 2 and 4 were already gone

    let after = store.state().unwrap();
    assert_eq!(after.first_seq, 7); // seq 6 itself was already removed
    assert_eq!(after.msgs, 3); // 7, 9, 10
    assert_eq!(after.deleted, vec![8]);
}

#[tokio::test]
async fn truncate_with_gaps_preserves_interior_deletes() {
    let store = MemStore::new(cfg("truncate_gaps")).unwrap();
    for _ in 0..99 {
        store.store_msg("foo", None, Bytes::from_static(b"x")).unwrap();
    }
    store.store_msg("bar", None, Bytes::from_static(b"x")).unwrap();

    for seq in [10, 20, 30, 40] {
        store.remove_msg(seq).unwrap();
    }

    store.truncate(25).unwrap();

    let state = store.state().unwrap();
    assert_eq!(state.last_seq, 25);
    assert_eq!(state.deleted, vec![10, 20]);
    assert_eq!(state.msgs, 23);
    assert_eq!(state.num_subjects, 1); // "bar" at seq 100 is gone
}

#[tokio::test]
async fn purge_ex_wildcard_clears_matching_subject() {
    let store = MemStore::new(cfg("purge_ex")).unwrap();
    for _ in 0..100 {
        store.store_msg("foo", None, Bytes::from_static(b"x")).unwrap();
    }

    let removed = store.purge_ex("foo", 1, 0).unwrap();
    assert_eq!(removed, 100);
    assert_eq!(store.state().unwrap().msgs, 0);
}

#[tokio::test]
async fn tightening_max_msgs_per_subject_trims_immediately() {
    let mut config = cfg("per_subject_update");
    config.max_msgs_per_subject = 50;
    let store = MemStore::new(config).unwrap();

    for _ in 0..22 {
        store.store_msg("foo", None, Bytes::from_static(b"x")).unwrap();
    }

    let mut tightened = cfg("per_subject_update");
    tightened.max_msgs_per_subject = 10;
    store.update_config(tightened).unwrap();

    let states = store.subjects_state("foo").unwrap();
    assert_eq!(states["foo"].msgs, 10);
}

#[tokio::test]
async fn truncate_zero_then_restore_restarts_sequence_at_one() {
    let store = MemStore::new(cfg("full_reset")).unwrap();
    for _ in 0..1000 {
        store.store_msg("foo", None, Bytes::from_static(b"x")).unwrap();
    }
    store.truncate(0).unwrap();

    for _ in 0..1000 {
        store.store_msg("foo", None, Bytes::from_static(b"x")).unwrap();
    }

    let state = store.state().unwrap();
    assert_eq!(state.first_seq, 1);
    assert_eq!(state.last_seq, 1000);
}

#[tokio::test]
async fn multi_subject_compact_drops_exactly_the_floor_range() {
    let store = MemStore::new(cfg("multi_subject")).unwrap();
    for i in 0..1000 {
        store
            .store_msg(&format!("foo.{i}"), None, Bytes::from_static(b"x"))
            .unwrap();
    }

    let removed = store.compact(501).unwrap();
    assert_eq!(removed, 500);
    assert_eq!(store.num_subjects().unwrap(), 500);
}

#[tokio::test]
async fn discard_new_surfaces_capacity_errors_instead_of_evicting() {
    let mut config = cfg("discard_new");
    config.max_msgs = 1;
    config.discard = DiscardPolicy::New;
    let store = MemStore::new(config).unwrap();

    store.store_msg("foo", None, Bytes::from_static(b"x")).unwrap();
    let err = store
        .store_msg("foo", None, Bytes::from_static(b"x"))
        .unwrap_err();

    assert_eq!(err, StoreError::MaxMsgs);
    assert_eq!(store.state().unwrap().msgs, 1);
}

#[tokio::test]
async fn satisfies_the_message_store_trait_as_a_trait_object() {
    let store = MemStore::new(cfg("trait_object")).unwrap();
    let dyn_store: &dyn MessageStore = &store;

    let (seq, _) = dyn_store
        .store_msg("foo", None, Bytes::from_static(b"x"))
        .unwrap();
    assert_eq!(seq, 1);
    assert_eq!(dyn_store.storage_type(), memstore::StorageType::Memory);
}

#[tokio::test]
async fn stop_closes_the_store_to_further_operations() {
    let store = MemStore::new(cfg("stop")).unwrap();
    store.store_msg("foo", None, Bytes::from_static(b"x")).unwrap();

    store.stop();

    assert!(matches!(store.state(), Err(StoreError::Closed)));
    assert!(matches!(
        store.store_msg("foo", None, Bytes::from_static(b"x")),
        Err(StoreError::Closed)
    ));
}
