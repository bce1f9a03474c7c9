//! Resumable upload integration tests: session creation, chunked PATCH
//! sequence, session URL caching, cancellation, and failure classification.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stowage::{FailureReason, ProgressCallback, StorageClient, StorageError};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const CHUNK_SIZE: usize = 6 * 1024 * 1024;
const SESSION_PATH: &str = "/upload/resumable/session-abc";

fn create_client(server: &MockServer) -> StorageClient {
    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), "Bearer test-token".to_string());
    StorageClient::new(server.uri(), headers).unwrap()
}

fn progress_recorder() -> (ProgressCallback, Arc<Mutex<Vec<f32>>>) {
    let log: Arc<Mutex<Vec<f32>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let callback: ProgressCallback = Arc::new(move |percent| {
        sink.lock().unwrap().push(percent);
    });
    (callback, log)
}

async fn patch_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.method.as_str() == "PATCH")
        .collect()
}

async fn mount_create(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/upload/resumable"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", SESSION_PATH),
        )
        .mount(server)
        .await;
}

async fn mount_patch(server: &MockServer) {
    Mock::given(method("PATCH"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(204))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_upload_splits_into_sequential_chunks() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_patch(&server).await;

    let client = create_client(&server);
    let (callback, log) = progress_recorder();

    // One full chunk plus a 512-byte tail.
    let payload = vec![9u8; CHUNK_SIZE + 512];
    client
        .from("photos")
        .upload_or_resume_bytes(payload, "albums/cat.png", None, Some(callback), None)
        .await
        .unwrap();

    let patches = patch_requests(&server).await;
    assert_eq!(patches.len(), 2);

    let offset = |r: &Request| {
        r.headers
            .get("upload-offset")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string()
    };
    assert_eq!(offset(&patches[0]), "0");
    assert_eq!(offset(&patches[1]), CHUNK_SIZE.to_string());
    assert_eq!(patches[0].body.len(), CHUNK_SIZE);
    assert_eq!(patches[1].body.len(), 512);

    for patch in &patches {
        assert_eq!(
            patch.headers.get("tus-resumable").unwrap().to_str().unwrap(),
            "1.0.0"
        );
        assert_eq!(
            patch.headers.get("content-type").unwrap().to_str().unwrap(),
            "application/offset+octet-stream"
        );
    }

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(*log.last().unwrap(), 100.0);
}

#[tokio::test]
async fn test_create_sends_length_and_metadata() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/resumable"))
        .and(header("Tus-Resumable", "1.0.0"))
        .and(header("Upload-Length", "5"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", SESSION_PATH),
        )
        .expect(1)
        .mount(&server)
        .await;
    mount_patch(&server).await;

    let client = create_client(&server);
    client
        .from("photos")
        .upload_or_resume_bytes(b"hello".to_vec(), "greeting.txt", None, None, None)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let create = requests
        .iter()
        .find(|r| r.method.as_str() == "POST")
        .unwrap();
    let metadata = create
        .headers
        .get("upload-metadata")
        .unwrap()
        .to_str()
        .unwrap();

    assert!(metadata.contains(&format!("bucketName {}", BASE64.encode("photos"))));
    assert!(metadata.contains(&format!("objectName {}", BASE64.encode("greeting.txt"))));
}

#[tokio::test]
async fn test_zero_length_upload_sends_one_patch() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_patch(&server).await;

    let client = create_client(&server);
    let (callback, log) = progress_recorder();

    client
        .from("photos")
        .upload_or_resume_bytes(Vec::new(), "empty.txt", None, Some(callback), None)
        .await
        .unwrap();

    let patches = patch_requests(&server).await;
    assert_eq!(patches.len(), 1);
    assert!(patches[0].body.is_empty());
    assert_eq!(*log.lock().unwrap(), vec![100.0]);
}

#[tokio::test]
async fn test_cached_session_skips_create() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/resumable"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", SESSION_PATH),
        )
        .expect(0)
        .mount(&server)
        .await;
    mount_patch(&server).await;

    let client = create_client(&server);
    client
        .upload_cache()
        .set(
            "photos/albums/cat.png",
            &format!("{}{}", server.uri(), SESSION_PATH),
            None,
        )
        .unwrap();

    client
        .from("photos")
        .upload_or_resume_bytes(b"data".to_vec(), "albums/cat.png", None, None, None)
        .await
        .unwrap();

    assert_eq!(patch_requests(&server).await.len(), 1);
}

#[tokio::test]
async fn test_cache_entry_dropped_on_success() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_patch(&server).await;

    let client = create_client(&server);
    client
        .from("photos")
        .upload_or_resume_bytes(b"data".to_vec(), "done.txt", None, None, None)
        .await
        .unwrap();

    assert!(client.upload_cache().try_get("photos/done.txt").is_none());
}

#[tokio::test]
async fn test_cache_entry_kept_on_patch_failure() {
    let server = MockServer::start().await;
    mount_create(&server).await;

    Mock::given(method("PATCH"))
        .and(path(SESSION_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk full"))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let err = client
        .from("photos")
        .upload_or_resume_bytes(b"data".to_vec(), "stuck.txt", None, None, None)
        .await
        .unwrap_err();

    assert_eq!(err.reason(), Some(FailureReason::Internal));
    assert_eq!(
        client.upload_cache().try_get("photos/stuck.txt").as_deref(),
        Some(format!("{}{}", server.uri(), SESSION_PATH).as_str())
    );
}

#[tokio::test]
async fn test_create_failure_is_classified_and_not_cached() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/resumable"))
        .respond_with(ResponseTemplate::new(401).set_body_string("token expired"))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let err = client
        .from("photos")
        .upload_or_resume_bytes(b"data".to_vec(), "denied.txt", None, None, None)
        .await
        .unwrap_err();

    assert_eq!(err.reason(), Some(FailureReason::NotAuthorized));
    assert!(client.upload_cache().try_get("photos/denied.txt").is_none());
}

#[tokio::test]
async fn test_cancellation_stops_between_chunks() {
    let server = MockServer::start().await;
    mount_create(&server).await;
    mount_patch(&server).await;

    let client = create_client(&server);
    let cancel = CancellationToken::new();

    // Cancel once the first chunk is acknowledged; the second chunk must
    // never be sent.
    let trigger = cancel.clone();
    let callback: ProgressCallback = Arc::new(move |_| trigger.cancel());

    let payload = vec![1u8; CHUNK_SIZE + 512];
    let err = client
        .from("photos")
        .upload_or_resume_bytes(payload, "big.bin", None, Some(callback), Some(&cancel))
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::Canceled));
    assert_eq!(patch_requests(&server).await.len(), 1);

    // The session survives for a later resume.
    assert!(client.upload_cache().try_get("photos/big.bin").is_some());
}

#[tokio::test]
async fn test_truncated_source_fails_instead_of_looping() {
    let server = MockServer::start().await;

    // Delay the create response to open a window for the truncation below.
    Mock::given(method("POST"))
        .and(path("/upload/resumable"))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", SESSION_PATH)
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&server)
        .await;
    mount_patch(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("shrink.bin");
    std::fs::write(&local, vec![5u8; 4096]).unwrap();

    let client = create_client(&server);
    let bucket = client.from("photos");
    let upload = bucket.upload_or_resume_file(&local, "shrink.bin", None, None, None);

    // The length was measured before the create round-trip; empty the file
    // while that request is still in flight.
    let truncate = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        tokio::fs::File::create(&local).await.unwrap();
    };

    let (result, ()) = tokio::join!(upload, truncate);
    let err = result.unwrap_err();

    assert!(matches!(err, StorageError::Io(_)));
    assert!(patch_requests(&server).await.is_empty());
}

#[tokio::test]
async fn test_upsert_and_extra_headers_reach_both_phases() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload/resumable"))
        .and(header("x-upsert", "true"))
        .and(header("cache-control", "max-age=3600"))
        .respond_with(
            ResponseTemplate::new(201).insert_header("Location", SESSION_PATH),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PATCH"))
        .and(path(SESSION_PATH))
        .and(header("x-upsert", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    let options = stowage::FileOptions {
        upsert: true,
        ..Default::default()
    };
    client
        .from("photos")
        .upload_or_resume_bytes(b"data".to_vec(), "up.txt", Some(options), None, None)
        .await
        .unwrap();
}
