//! Integration tests for the targets crate
//!
//! These tests drive the client and sync engine end-to-end against a local
//! canned-response HTTP stub standing in for the remote service.

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;

use base64::prelude::*;

use targets::{
    MutationOutcome, RecordState, SyncEngine, TargetCache, TargetChanges, TargetId, TargetSummary,
    UNRESOLVED_NAME, VwsClient, VwsCredentials, VwsError, sign_request,
};

/// One request observed by the stub (header names lowercased)
struct SeenRequest {
    method: String,
    path: String,
    headers: HashMap<String, String>,
    body: String,
}

/// Minimal HTTP stub serving a fixed script of responses, one connection
/// per response in order.
struct StubServer {
    addr: String,
    seen: Arc<Mutex<Vec<SeenRequest>>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StubServer {
    fn start(script: Vec<(u16, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = format!("http://{}", listener.local_addr().unwrap());
        let seen: Arc<Mutex<Vec<SeenRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_in_thread = seen.clone();

        let handle = thread::spawn(move || {
            for (status, body) in script {
                let (stream, _) = match listener.accept() {
                    Ok(conn) => conn,
                    Err(_) => return,
                };
                if let Some(request) = read_request(&stream) {
                    seen_in_thread.lock().unwrap().push(request);
                }
                write_response(&stream, status, &body);
            }
        });

        Self {
            addr,
            seen,
            handle: Some(handle),
        }
    }

    /// Wait for the script to be consumed and hand back what was observed.
    fn finish(mut self) -> Vec<SeenRequest> {
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap();
        }
        std::mem::take(&mut *self.seen.lock().unwrap())
    }
}

fn read_request(stream: &TcpStream) -> Option<SeenRequest> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).ok()?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next()?.to_string();
    let path = parts.next()?.to_string();

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).ok()?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; length];
    if length > 0 {
        reader.read_exact(&mut body).ok()?;
    }

    Some(SeenRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_response(mut stream: &TcpStream, status: u16, body: &str) {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).ok();
    stream.flush().ok();
}

fn test_credentials(addr: &str) -> VwsCredentials {
    VwsCredentials::new("test-access", "test-secret").with_base_url(addr)
}

fn engine_for(addr: &str, cache: Arc<TargetCache>) -> SyncEngine {
    SyncEngine::new(VwsClient::new(test_credentials(addr)).unwrap(), cache)
}

fn confirmed(id: &str, name: &str) -> TargetSummary {
    TargetSummary {
        target_id: TargetId::new(id),
        target_name: name.to_string(),
        width: 10.0,
        active: true,
        status: "success".to_string(),
        upload_date: "05/07/2023".to_string(),
        metadata: Vec::new(),
        state: RecordState::Confirmed,
    }
}

fn list_body(ids: &[&str]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("\"{}\"", id)).collect();
    format!(
        r#"{{"result_code":"Success","transaction_id":"tx","results":[{}]}}"#,
        quoted.join(",")
    )
}

fn summary_body(name: &str, date: &str) -> String {
    format!(
        r#"{{"result_code":"Success","transaction_id":"tx","database_name":"testdb","target_name":"{}","upload_date":"{}","active_flag":true,"status":"success","tracking_rating":4}}"#,
        name, date
    )
}

fn create_body(id: &str) -> String {
    format!(
        r#"{{"result_code":"TargetCreated","transaction_id":"tx","target_id":"{}"}}"#,
        id
    )
}

#[test]
fn test_requests_are_signed_with_the_sent_date() {
    let stub = StubServer::start(vec![(200, list_body(&[]))]);
    let client = VwsClient::new(test_credentials(&stub.addr)).unwrap();

    let ids = client.list_targets().unwrap();
    assert!(ids.is_empty());

    let seen = stub.finish();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, "GET");
    assert_eq!(seen[0].path, "/targets");

    let date = &seen[0].headers["date"];
    assert!(date.ends_with("GMT"), "date header not RFC1123: {}", date);

    // The authorization header must be the signature over the very date
    // header that was sent.
    let expected = sign_request("GET", "/targets", "", b"", &test_credentials("http://x"), date);
    assert_eq!(seen[0].headers["authorization"], expected);
    assert!(expected.starts_with("VWS test-access:"));
}

#[test]
fn test_upload_creates_and_refreshes_cache_entry() {
    let stub = StubServer::start(vec![
        (200, create_body("abc123")),
        (200, summary_body("NewTarget", "2023-05-07")),
    ]);
    let cache = Arc::new(TargetCache::new());
    let engine = engine_for(&stub.addr, cache.clone());

    let outcome = engine.upload_target("NewTarget", 10.0, b"imagebytes", true, b"");
    match outcome {
        MutationOutcome::Applied { response } => assert!(response.contains("abc123")),
        other => panic!("expected Applied, got {:?}", other),
    }

    assert_eq!(cache.len(), 1);
    let record = cache.get(&TargetId::new("abc123")).unwrap();
    assert_eq!(record.target_name, "NewTarget");
    assert_eq!(record.upload_date, "05/07/2023");
    assert_eq!(record.state, RecordState::Confirmed);

    let seen = stub.finish();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].method, "POST");
    assert_eq!(seen[0].path, "/targets");
    assert_eq!(seen[0].headers["content-type"], "application/json");
    assert_eq!(seen[1].method, "GET");
    assert_eq!(seen[1].path, "/summary/abc123");

    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body["name"], "NewTarget");
    assert_eq!(body["active_flag"], true);
    assert_eq!(body["image"], BASE64_STANDARD.encode(b"imagebytes"));
    assert!((body["width"].as_f64().unwrap() - 10.0).abs() < 1e-6);
}

#[test]
fn test_upload_name_conflict_issues_no_network_calls() {
    let stub = StubServer::start(vec![]);
    let cache = Arc::new(TargetCache::new());
    cache.load(vec![confirmed("a", "Logo"), confirmed("b", "Card")]);
    let engine = engine_for(&stub.addr, cache.clone());

    let outcome = engine.upload_target("logo", 10.0, b"img", true, b"");
    assert!(matches!(outcome, MutationOutcome::NameConflict));
    assert_eq!(cache.len(), 2);

    let seen = stub.finish();
    assert!(seen.is_empty());
}

#[test]
fn test_update_applies_and_refreshes_in_place() {
    let update_response = r#"{"result_code":"Success","transaction_id":"tx"}"#.to_string();
    let stub = StubServer::start(vec![
        (200, update_response.clone()),
        (200, summary_body("CardRenamed", "2024-01-15")),
    ]);
    let cache = Arc::new(TargetCache::new());
    cache.load(vec![
        confirmed("a", "Logo"),
        confirmed("b", "Card"),
        confirmed("c", "Poster"),
    ]);
    let engine = engine_for(&stub.addr, cache.clone());

    let changes = TargetChanges {
        name: Some("CardRenamed".to_string()),
        width: 12.0,
        active: true,
        ..Default::default()
    };
    let outcome = engine.update_target(&TargetId::new("b"), &changes);
    match outcome {
        MutationOutcome::Applied { response } => assert_eq!(response, update_response),
        other => panic!("expected Applied, got {:?}", other),
    }

    // Refreshed record keeps its slot.
    assert_eq!(cache.position(&TargetId::new("b")), Some(1));
    let record = cache.get(&TargetId::new("b")).unwrap();
    assert_eq!(record.target_name, "CardRenamed");
    assert_eq!(record.upload_date, "01/15/2024");

    let seen = stub.finish();
    assert_eq!(seen[0].method, "PUT");
    assert_eq!(seen[0].path, "/targets/b");

    // Absent optional fields are omitted, not sent as null.
    let body: serde_json::Value = serde_json::from_str(&seen[0].body).unwrap();
    assert_eq!(body["name"], "CardRenamed");
    assert!(body.get("image").is_none());
    assert!(body.get("application_metadata").is_none());
}

#[test]
fn test_delete_removes_cache_entry() {
    let stub = StubServer::start(vec![(200, String::new())]);
    let cache = Arc::new(TargetCache::new());
    cache.load(vec![
        confirmed("a", "Logo"),
        confirmed("b", "Card"),
        confirmed("c", "Poster"),
    ]);
    let engine = engine_for(&stub.addr, cache.clone());

    let outcome = engine.delete_target(&TargetId::new("b"));
    match outcome {
        MutationOutcome::Applied { response } => assert_eq!(response, "Deleted"),
        other => panic!("expected Applied, got {:?}", other),
    }

    assert_eq!(cache.len(), 2);
    assert!(cache.position(&TargetId::new("b")).is_none());
    assert_eq!(cache.names(), vec!["Logo", "Poster"]);

    let seen = stub.finish();
    assert_eq!(seen[0].method, "DELETE");
    assert_eq!(seen[0].path, "/targets/b");
    assert_eq!(seen[0].headers["content-type"], "");
}

#[test]
fn test_refresh_one_failure_inserts_sentinel_at_same_index() {
    let stub = StubServer::start(vec![(
        404,
        r#"{"result_code":"UnknownTarget","transaction_id":"tx"}"#.to_string(),
    )]);
    let cache = Arc::new(TargetCache::new());
    cache.load(vec![
        confirmed("a", "Logo"),
        confirmed("b", "Card"),
        confirmed("c", "Poster"),
    ]);
    let engine = engine_for(&stub.addr, cache.clone());

    let state = engine.refresh_one(&TargetId::new("b"));
    assert_eq!(state, RecordState::Unresolved);

    assert_eq!(cache.position(&TargetId::new("b")), Some(1));
    let record = cache.get(&TargetId::new("b")).unwrap();
    assert!(record.is_unresolved());
    assert_eq!(record.target_name, UNRESOLVED_NAME);
}

#[test]
fn test_refresh_one_appends_unknown_id() {
    let stub = StubServer::start(vec![(200, summary_body("Fresh", "2023-02-03"))]);
    let cache = Arc::new(TargetCache::new());
    cache.load(vec![confirmed("a", "Logo")]);
    let engine = engine_for(&stub.addr, cache.clone());

    let state = engine.refresh_one(&TargetId::new("zz"));
    assert_eq!(state, RecordState::Confirmed);
    assert_eq!(cache.position(&TargetId::new("zz")), Some(1));
    assert_eq!(cache.get(&TargetId::new("zz")).unwrap().upload_date, "02/03/2023");
}

#[test]
fn test_refresh_all_reports_progress() {
    let stub = StubServer::start(vec![
        (200, list_body(&["a", "b"])),
        (200, summary_body("Logo", "2023-05-07")),
        (200, summary_body("Card", "2023-06-08")),
    ]);
    let cache = Arc::new(TargetCache::new());
    // Stale content is dropped by the rebuild.
    cache.load(vec![confirmed("old", "Stale")]);
    let engine = engine_for(&stub.addr, cache.clone());

    let mut progress: Vec<(usize, usize, String)> = Vec::new();
    let stats = engine
        .refresh_all(|completed, total, name| progress.push((completed, total, name.to_string())))
        .unwrap();

    assert_eq!(stats.targets_listed, 2);
    assert_eq!(stats.targets_refreshed, 2);
    assert_eq!(stats.errors, 0);

    assert_eq!(cache.names(), vec!["Logo", "Card"]);
    assert!(cache.position(&TargetId::new("old")).is_none());
    assert_eq!(
        progress,
        vec![(1, 2, "Logo".to_string()), (2, 2, "Card".to_string())]
    );

    let seen = stub.finish();
    assert_eq!(seen[1].path, "/summary/a");
    assert_eq!(seen[2].path, "/summary/b");
}

#[test]
fn test_refresh_all_counts_failures_and_continues() {
    let stub = StubServer::start(vec![
        (200, list_body(&["a", "b"])),
        (404, r#"{"result_code":"UnknownTarget","transaction_id":"tx"}"#.to_string()),
        (200, summary_body("Card", "2023-06-08")),
    ]);
    let cache = Arc::new(TargetCache::new());
    let engine = engine_for(&stub.addr, cache.clone());

    let stats = engine.refresh_all(|_, _, _| {}).unwrap();
    assert_eq!(stats.targets_refreshed, 1);
    assert_eq!(stats.errors, 1);
    assert_eq!(cache.names(), vec!["Card"]);
}

#[test]
fn test_cancel_is_observed_before_interpretation() {
    let stub = StubServer::start(vec![(200, list_body(&["a"]))]);
    let client = VwsClient::new(test_credentials(&stub.addr)).unwrap();

    let token = client.cancel_token();
    token.cancel();

    let result = client.list_targets();
    assert!(matches!(result, Err(VwsError::Cancelled)));
    stub.finish();
}

#[test]
fn test_service_error_retains_status_and_body() {
    let error_body = r#"{"result_code":"AuthenticationFailure","transaction_id":"tx"}"#;
    let stub = StubServer::start(vec![(403, error_body.to_string())]);
    let client = VwsClient::new(test_credentials(&stub.addr)).unwrap();

    match client.list_targets() {
        Err(VwsError::Service { status, body }) => {
            assert_eq!(status, 403);
            assert_eq!(body, error_body);
        }
        other => panic!("expected Service error, got {:?}", other),
    }
    stub.finish();
}

#[test]
fn test_query_endpoints() {
    let detail = r#"{"result_code":"Success","transaction_id":"tx","target_record":{"target_id":"a","active_flag":true,"name":"Logo","width":32.0,"tracking_rating":5,"reco_rating":""},"status":"success"}"#;
    let duplicates = r#"{"result_code":"Success","transaction_id":"tx","similar_targets":["x","y"]}"#;
    let account = r#"{"result_code":"Success","transaction_id":"tx","name":"testdb","active_images":7,"inactive_images":2,"failed_images":1}"#;
    let stub = StubServer::start(vec![
        (200, detail.to_string()),
        (200, duplicates.to_string()),
        (200, account.to_string()),
    ]);
    let client = VwsClient::new(test_credentials(&stub.addr)).unwrap();

    let record = client.get_target(&TargetId::new("a")).unwrap();
    assert_eq!(record.target_record.name, "Logo");
    assert!((record.target_record.width - 32.0).abs() < 1e-6);

    let similar = client.check_duplicates(&TargetId::new("a")).unwrap();
    assert_eq!(similar, vec![TargetId::new("x"), TargetId::new("y")]);

    let summary = client.get_account_summary().unwrap();
    assert_eq!(summary.active_images, 7);
    assert_eq!(summary.failed_images, 1);

    let seen = stub.finish();
    assert_eq!(seen[0].path, "/targets/a");
    assert_eq!(seen[1].path, "/duplicates/a");
    assert_eq!(seen[2].path, "/summary");
}
