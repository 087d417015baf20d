//! Contract Test: Push Semantics
//!
//! Constraints verified:
//! - Absent record → exactly one private record is created
//! - Same IP pushed twice → no write request
//! - Updating one hostname preserves every other entry
//! - Write failures surface as RemoteRejected
//! - Failing to persist the record id does not fail the push
//! - Dry-run leaves both the tender and the record id store untouched
//!
//! If this test fails, pushes may clobber or duplicate data.

mod common;

use common::*;
use piphos_core::error::ErrorKind;
use piphos_core::record::RecordLayout;
use piphos_core::state::MemoryRecordIdStore;
use piphos_core::traits::RecordIdStore;
use piphos_core::{PushResult, RecordId, Synchronizer};
use std::sync::Arc;

fn synchronizer(tender: &MockTender, store: Arc<dyn RecordIdStore>) -> Synchronizer {
    Synchronizer::new(
        Box::new(MockTender::sharing_counters_with(tender)),
        store,
        RecordLayout::default(),
    )
}

#[tokio::test]
async fn push_without_record_creates_private_record() {
    let tender = MockTender::new();
    tender.insert(foreign_record("other"));
    let store = Arc::new(MemoryRecordIdStore::new());

    let result = synchronizer(&tender, store.clone())
        .push("laptop", "203.0.113.7")
        .await
        .unwrap();

    let PushResult::Created { record_id } = result else {
        panic!("expected Created, got {:?}", result);
    };
    assert_eq!(tender.create_calls(), 1);
    assert_eq!(tender.update_calls(), 0);

    let created = tender.record(record_id.as_str()).unwrap();
    assert!(!created.public, "new records must be private");
    assert_eq!(
        created.hosts(&RecordLayout::default()).unwrap(),
        hosts(&[("laptop", "203.0.113.7")])
    );

    assert_eq!(
        store.get_record_id("mock").await.unwrap(),
        Some(record_id),
        "created id should be persisted"
    );
}

#[tokio::test]
async fn same_ip_twice_sends_no_write() {
    let tender = MockTender::new();
    tender.insert(piphos_record("g1", &[("laptop", "203.0.113.7")]));
    let store = Arc::new(MemoryRecordIdStore::new());

    for _ in 0..3 {
        let result = synchronizer(&tender, store.clone())
            .push("laptop", "203.0.113.7")
            .await
            .unwrap();
        assert_eq!(
            result,
            PushResult::Unchanged {
                record_id: RecordId::new("g1")
            }
        );
    }

    assert_eq!(tender.write_calls(), 0, "idempotent push must not write");
}

#[tokio::test]
async fn second_identical_push_after_create_is_unchanged() {
    let tender = MockTender::new();
    let store = Arc::new(MemoryRecordIdStore::new());

    let first = synchronizer(&tender, store.clone())
        .push("laptop", "198.51.100.4")
        .await
        .unwrap();
    assert!(matches!(first, PushResult::Created { .. }));

    let cached = store.get_record_id("mock").await.unwrap();
    let second = synchronizer(&tender, store.clone())
        .with_record_hint(cached)
        .push("laptop", "198.51.100.4")
        .await
        .unwrap();

    assert!(matches!(second, PushResult::Unchanged { .. }));
    assert_eq!(tender.write_calls(), 1);
    assert_eq!(tender.record_count(), 1);
}

#[tokio::test]
async fn update_preserves_other_hosts() {
    let tender = MockTender::new();
    tender.insert(piphos_record(
        "g1",
        &[("laptop", "203.0.113.7"), ("nas", "2001:db8::10")],
    ));
    let store = Arc::new(MemoryRecordIdStore::new());

    let result = synchronizer(&tender, store)
        .push("laptop", "203.0.113.99")
        .await
        .unwrap();

    assert_eq!(
        result,
        PushResult::Updated {
            record_id: RecordId::new("g1"),
            previous_ip: Some("203.0.113.7".to_string()),
        }
    );
    assert_eq!(tender.update_calls(), 1);

    let stored = tender.record("g1").unwrap();
    assert_eq!(
        stored.hosts(&RecordLayout::default()).unwrap(),
        hosts(&[("laptop", "203.0.113.99"), ("nas", "2001:db8::10")])
    );
}

#[tokio::test]
async fn new_hostname_is_added_alongside_existing() {
    let tender = MockTender::new();
    tender.insert(piphos_record("g1", &[("nas", "192.0.2.1")]));

    let result = synchronizer(&tender, Arc::new(MemoryRecordIdStore::new()))
        .push("laptop", "192.0.2.2")
        .await
        .unwrap();

    assert!(matches!(
        result,
        PushResult::Updated {
            previous_ip: None,
            ..
        }
    ));
    assert_eq!(
        tender
            .record("g1")
            .unwrap()
            .hosts(&RecordLayout::default())
            .unwrap(),
        hosts(&[("laptop", "192.0.2.2"), ("nas", "192.0.2.1")])
    );
}

#[tokio::test]
async fn invalid_input_fails_before_any_request() {
    let tender = MockTender::new();
    let sync = synchronizer(&tender, Arc::new(MemoryRecordIdStore::new()));

    let err = sync.push("laptop", "999.1.1.1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidIp);

    let err = sync.push("  ", "192.0.2.1").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Config);

    assert_eq!(tender.list_calls() + tender.get_calls() + tender.write_calls(), 0);
}

#[tokio::test]
async fn rejected_update_is_remote_rejected() {
    let tender = MockTender::new();
    tender.insert(piphos_record("g1", &[("laptop", "192.0.2.1")]));
    tender.reject_writes_with(422);

    let err = synchronizer(&tender, Arc::new(MemoryRecordIdStore::new()))
        .push("laptop", "192.0.2.2")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteRejected);
    assert_eq!(err.status(), Some(422));
}

#[tokio::test]
async fn rejected_create_is_remote_rejected() {
    let tender = MockTender::new();
    tender.reject_writes_with(403);
    let store = Arc::new(MemoryRecordIdStore::new());

    let err = synchronizer(&tender, store.clone())
        .push("laptop", "192.0.2.2")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteRejected);
    assert_eq!(store.get_record_id("mock").await.unwrap(), None);
}

#[tokio::test]
async fn persist_failure_does_not_fail_push() {
    let tender = MockTender::new();
    let store = Arc::new(FailingRecordIdStore::default());

    let result = synchronizer(&tender, store.clone())
        .push("laptop", "192.0.2.2")
        .await
        .unwrap();

    assert!(matches!(result, PushResult::Created { .. }));
    assert_eq!(
        store
            .write_attempts
            .load(std::sync::atomic::Ordering::SeqCst),
        1
    );
}

#[tokio::test]
async fn dry_run_never_writes() {
    let tender = MockTender::new();
    tender.insert(piphos_record("g1", &[("laptop", "192.0.2.1")]));

    let result = synchronizer(&tender, Arc::new(MemoryRecordIdStore::new()))
        .with_dry_run(true)
        .push("laptop", "192.0.2.2")
        .await
        .unwrap();

    assert_eq!(
        result,
        PushResult::DryRun {
            record_id: Some(RecordId::new("g1")),
            hosts: hosts(&[("laptop", "192.0.2.2")]),
        }
    );
    assert_eq!(tender.write_calls(), 0);

    let empty = MockTender::new();
    let result = synchronizer(&empty, Arc::new(MemoryRecordIdStore::new()))
        .with_dry_run(true)
        .push("laptop", "192.0.2.2")
        .await
        .unwrap();
    assert_eq!(result.record_id(), None);
    assert_eq!(empty.write_calls(), 0);
}

#[tokio::test]
async fn dry_run_does_not_touch_store() {
    let tender = MockTender::new();
    tender.insert(piphos_record("g1", &[("laptop", "192.0.2.1")]));
    let store = Arc::new(MemoryRecordIdStore::new());

    synchronizer(&tender, store.clone())
        .with_dry_run(true)
        .push("laptop", "192.0.2.2")
        .await
        .unwrap();
    assert_eq!(tender.list_calls(), 1);
    assert_eq!(store.get_record_id("mock").await.unwrap(), None);

    store
        .set_record_id("mock", &RecordId::new("deleted"))
        .await
        .unwrap();
    synchronizer(&tender, store.clone())
        .with_dry_run(true)
        .push("laptop", "192.0.2.2")
        .await
        .unwrap();
    assert_eq!(
        store.get_record_id("mock").await.unwrap(),
        Some(RecordId::new("deleted")),
        "dry-run must not clear a stale id either"
    );
}

#[tokio::test]
async fn push_then_pull_round_trips() {
    let tender = MockTender::new();
    let store = Arc::new(MemoryRecordIdStore::new());

    synchronizer(&tender, store.clone())
        .push("laptop", "203.0.113.7")
        .await
        .unwrap();
    synchronizer(&tender, store.clone())
        .push("nas", "2001:db8::1")
        .await
        .unwrap();

    let pulled = synchronizer(&tender, store).pull().await.unwrap();
    assert_eq!(
        pulled,
        hosts(&[("laptop", "203.0.113.7"), ("nas", "2001:db8::1")])
    );
    assert_eq!(tender.record_count(), 1);
}
