//! End-to-end synchronizer flows against a fake GitHub API

use piphos_core::record::{RecordId, RecordLayout, SENTINEL};
use piphos_core::state::MemoryRecordIdStore;
use piphos_core::traits::RecordIdStore;
use piphos_core::{ErrorKind, PushResult, Synchronizer};
use piphos_tender_github::GithubTender;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gist(id: &str, content: &str) -> serde_json::Value {
    json!({
        "id": id,
        "description": SENTINEL,
        "public": false,
        "files": {
            SENTINEL: { "filename": SENTINEL, "content": content, "truncated": false }
        }
    })
}

fn synchronizer(server: &MockServer, store: Arc<MemoryRecordIdStore>) -> Synchronizer {
    let tender =
        GithubTender::with_base_url(&server.uri(), "token", Duration::from_secs(5)).unwrap();
    Synchronizer::new(Box::new(tender), store, RecordLayout::default())
}

#[tokio::test]
async fn push_to_empty_account_creates_gist() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gists"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(gist("fresh", r#"{"laptop":"192.0.2.1"}"#)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryRecordIdStore::new());
    let result = synchronizer(&server, store.clone())
        .push("laptop", "192.0.2.1")
        .await
        .unwrap();

    assert_eq!(
        result,
        PushResult::Created {
            record_id: RecordId::new("fresh")
        }
    );
    assert_eq!(
        store.get_record_id("github").await.unwrap(),
        Some(RecordId::new("fresh"))
    );
}

#[tokio::test]
async fn unchanged_ip_sends_no_patch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "mine", "description": SENTINEL, "files": {} }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gists/mine"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gist("mine", r#"{"laptop":"192.0.2.1"}"#)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let result = synchronizer(&server, Arc::new(MemoryRecordIdStore::new()))
        .push("laptop", "192.0.2.1")
        .await
        .unwrap();
    assert!(matches!(result, PushResult::Unchanged { .. }));
}

#[tokio::test]
async fn stale_id_rediscovers_and_patches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gists/deleted"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "mine", "description": SENTINEL, "files": {} }
        ])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/gists/mine"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gist("mine", r#"{"nas":"192.0.2.9"}"#)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/gists/mine"))
        .respond_with(ResponseTemplate::new(200).set_body_json(gist(
            "mine",
            r#"{"laptop":"192.0.2.1","nas":"192.0.2.9"}"#,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = synchronizer(&server, Arc::new(MemoryRecordIdStore::new()))
        .with_record_hint(Some(RecordId::new("deleted")))
        .push("laptop", "192.0.2.1")
        .await
        .unwrap();

    assert_eq!(
        result,
        PushResult::Updated {
            record_id: RecordId::new("mine"),
            previous_ip: None,
        }
    );

    let patch = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.method.as_str() == "PATCH")
        .unwrap();
    let body: serde_json::Value = serde_json::from_slice(&patch.body).unwrap();
    assert_eq!(
        body["files"][SENTINEL]["content"],
        r#"{"laptop":"192.0.2.1","nas":"192.0.2.9"}"#
    );
}

#[tokio::test]
async fn rejected_patch_is_remote_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gists/mine"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(gist("mine", r#"{"laptop":"192.0.2.1"}"#)),
        )
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = synchronizer(&server, Arc::new(MemoryRecordIdStore::new()))
        .with_record_hint(Some(RecordId::new("mine")))
        .push("laptop", "192.0.2.2")
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::RemoteRejected);
    assert_eq!(err.status(), Some(403));
}

#[tokio::test]
async fn pull_with_no_sentinel_gist_is_no_record() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gists"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "x", "description": "dotfiles", "files": {} }
        ])))
        .mount(&server)
        .await;

    let err = synchronizer(&server, Arc::new(MemoryRecordIdStore::new()))
        .pull()
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NoRecord);
}
