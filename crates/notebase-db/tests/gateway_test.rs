//! Wire-level tests for the database gateway and the note repository.
//!
//! A wiremock server stands in for the database endpoint; each mock pins the
//! exact query body the gateway is expected to send.

use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

use notebase_core::{Error, ListNotesRequest, Note, NoteRepository, Ref};
use notebase_db::{fql, FaunaClient, FaunaConfig, FaunaNoteRepository, Gateway};

const SECRET: &str = "test-secret";

fn client_for(server: &MockServer) -> FaunaClient {
    let config = FaunaConfig::new(SECRET)
        .with_endpoint(server.uri())
        .with_timeout(Duration::from_secs(5));
    FaunaClient::new(config).expect("client")
}

fn note_ref(id: &str) -> Value {
    json!({ "@ref": {
        "id": id,
        "collection": { "@ref": {
            "id": "notes",
            "collection": { "@ref": { "id": "collections" } }
        } }
    } })
}

fn note_doc(id: &str, text: &str) -> Value {
    json!({ "ref": note_ref(id), "ts": 1_700_000_000_000_000i64, "data": { "note": text } })
}

fn ok(resource: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "resource": resource }))
}

fn fauna_error(status: u16, code: &str, description: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "errors": [{ "position": [], "code": code, "description": description }]
    }))
}

#[tokio::test]
async fn test_execute_sends_auth_and_version_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(header("authorization", "Bearer test-secret"))
        .and(header("x-faunadb-api-version", "4"))
        .and(body_json(json!({ "exists": { "database": "notes" } })))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.execute(&fql::exists(fql::database("notes"))).await.unwrap();
    assert_eq!(result, json!(true));
}

#[tokio::test]
async fn test_session_uses_scoped_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("authorization", "Bearer scoped-secret"))
        .respond_with(ok(json!(false)))
        .expect(1)
        .mount(&server)
        .await;

    let session = client_for(&server).scoped("scoped-secret");
    let result = session.execute(&fql::exists(fql::collection("notes"))).await.unwrap();
    assert_eq!(result, json!(false));
}

#[tokio::test]
async fn test_fetch_note() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({ "get": { "ref": { "collection": "notes" }, "id": "101" } })))
        .respond_with(ok(note_doc("101", "buy milk")))
        .expect(1)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    let doc = repo.fetch("101").await.unwrap();
    assert_eq!(doc.reference, Ref::document("notes", "101"));
    assert_eq!(doc.data, Note::new("buy milk"));
}

#[tokio::test]
async fn test_fetch_missing_note_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(fauna_error(404, "instance not found", "Document not found."))
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    let err = repo.fetch("999").await.unwrap_err();
    assert!(err.is_not_found(), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_non_numeric_id_never_reaches_database() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok(json!(null)))
        .expect(0)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    assert!(repo.fetch("abc").await.unwrap_err().is_not_found());
    assert!(repo.delete("../1").await.unwrap_err().is_not_found());
    assert!(repo.update("", Note::new("x")).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_list_notes_maps_over_index_page() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "map": { "lambda": "X", "expr": { "get": { "var": "X" } } },
            "collection": { "paginate": { "match": { "index": "note" } }, "size": 2 }
        })))
        .respond_with(ok(json!({
            "data": [note_doc("1", "one"), note_doc("2", "two")],
            "after": [note_ref("3")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    let request = ListNotesRequest {
        size: Some(2),
        ..Default::default()
    };
    let notes = repo.list(request).await.unwrap();
    let texts: Vec<&str> = notes.iter().map(|d| d.data.note.as_str()).collect();
    assert_eq!(texts, vec!["one", "two"]);
}

#[tokio::test]
async fn test_list_notes_resumes_after_cursor() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "map": { "lambda": "X", "expr": { "get": { "var": "X" } } },
            "collection": {
                "paginate": { "match": { "index": "note" } },
                "size": 65,
                "after": [{ "ref": { "collection": "notes" }, "id": "3" }]
            }
        })))
        .respond_with(ok(json!({ "data": [note_doc("3", "three"), note_doc("4", "four")] })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    let request = ListNotesRequest {
        size: None,
        after: Some("3".to_string()),
    };
    let notes = repo.list(request).await.unwrap();
    let ids: Vec<&str> = notes.iter().map(|d| d.id()).collect();
    assert_eq!(ids, vec!["4"]);
}

/// Serves notes 1..=7 from the `note` index with the database's inclusive
/// `after` semantics.
struct SevenNotes;

impl Respond for SevenNotes {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = serde_json::from_slice(&request.body).unwrap();
        let page = &body["collection"];
        let size = page["size"].as_u64().unwrap_or(64) as usize;
        let start: u64 = page["after"][0]["id"]
            .as_str()
            .map(|id| id.parse().unwrap())
            .unwrap_or(1);
        let data: Vec<Value> = (start..=7)
            .take(size)
            .map(|id| note_doc(&id.to_string(), &format!("note {}", id)))
            .collect();
        ok(json!({ "data": data }))
    }
}

#[tokio::test]
async fn test_paging_with_last_id_visits_every_note_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(SevenNotes)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    let mut seen = Vec::new();
    let mut after = None;
    loop {
        let request = ListNotesRequest {
            size: Some(3),
            after: after.clone(),
        };
        let page = repo.list(request).await.unwrap();
        assert!(page.len() <= 3);
        let Some(last) = page.last() else { break };
        after = Some(last.id().to_string());
        seen.extend(page.iter().map(|d| d.id().to_string()));
    }

    let expected: Vec<String> = (1..=7).map(|id: u32| id.to_string()).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn test_insert_note_wraps_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "create": { "collection": "notes" },
            "params": { "object": { "data": { "object": { "note": "buy milk" } } } }
        })))
        .respond_with(ok(note_doc("77", "buy milk")))
        .expect(1)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    let doc = repo.insert(Note::new("buy milk")).await.unwrap();
    assert_eq!(doc.id(), "77");
}

#[tokio::test]
async fn test_update_note_replaces_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_json(json!({
            "update": { "ref": { "collection": "notes" }, "id": "77" },
            "params": { "object": { "data": { "object": { "note": "buy bread" } } } }
        })))
        .respond_with(ok(note_doc("77", "buy bread")))
        .expect(1)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    let doc = repo.update("77", Note::new("buy bread")).await.unwrap();
    assert_eq!(doc.data.note, "buy bread");
}

#[tokio::test]
async fn test_delete_note_returns_deleted_document() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "delete": { "id": "77" } })))
        .respond_with(ok(note_doc("77", "buy bread")))
        .expect(1)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::new(client_for(&server));
    let doc = repo.delete("77").await.unwrap();
    assert_eq!(doc.id(), "77");
}

#[tokio::test]
async fn test_custom_collection_and_index_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "collection": { "paginate": { "match": { "index": "all_memos" } } }
        })))
        .respond_with(ok(json!({ "data": [] })))
        .expect(1)
        .mount(&server)
        .await;

    let repo = FaunaNoteRepository::with_names(client_for(&server), "memos", "all_memos");
    assert!(repo.list(ListNotesRequest::default()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unauthorized_secret() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(fauna_error(401, "unauthorized", "Unauthorized"))
        .mount(&server)
        .await;

    let err = FaunaNoteRepository::new(client_for(&server))
        .fetch("1")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Unauthorized(_)), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_slow_database_hits_per_call_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ok(json!(true)).set_delay(Duration::from_secs(2)))
        .mount(&server)
        .await;

    let config = FaunaConfig::new(SECRET)
        .with_endpoint(server.uri())
        .with_timeout(Duration::from_millis(100));
    let client = FaunaClient::new(config).unwrap();

    let err = client.execute(&fql::exists(fql::database("notes"))).await.unwrap_err();
    assert!(matches!(err, Error::Timeout(_)), "unexpected error: {}", err);
}

#[tokio::test]
async fn test_query_timeout_header_matches_client_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("x-query-timeout", "5000"))
        .respond_with(ok(json!(true)))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server)
        .execute(&fql::exists(fql::database("notes")))
        .await
        .unwrap();
}
