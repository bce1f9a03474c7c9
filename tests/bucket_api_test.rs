//! Bucket API integration tests against a mock storage server.

use std::collections::HashMap;
use stowage::{FailureReason, StorageClient};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_client(server: &MockServer) -> StorageClient {
    let mut headers = HashMap::new();
    headers.insert("Authorization".to_string(), "Bearer test-token".to_string());
    StorageClient::new(server.uri(), headers).unwrap()
}

#[tokio::test]
async fn test_list_buckets() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bucket"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            { "id": "avatars", "name": "avatars", "public": true },
            { "id": "docs", "name": "docs", "public": false }
        ])))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let buckets = client.list_buckets().await.unwrap();

    assert_eq!(buckets.len(), 2);
    assert_eq!(buckets[0].id.as_deref(), Some("avatars"));
    assert!(buckets[0].public);
}

#[tokio::test]
async fn test_get_bucket_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bucket/avatars"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "avatars", "name": "avatars", "public": false
        })))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let bucket = client.get_bucket("avatars").await.unwrap();

    assert!(bucket.is_some());
    assert_eq!(bucket.unwrap().name.as_deref(), Some("avatars"));
}

#[tokio::test]
async fn test_get_bucket_not_found_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bucket/missing"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
            "statusCode": 404, "error": "Not found", "message": "Bucket not found"
        })))
        .mount(&server)
        .await;

    let client = create_client(&server);
    let bucket = client.get_bucket("missing").await.unwrap();

    assert!(bucket.is_none());
}

#[tokio::test]
async fn test_get_bucket_other_error_propagates() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/bucket/forbidden"))
        .respond_with(
            ResponseTemplate::new(401).set_body_string("token expired"),
        )
        .mount(&server)
        .await;

    let client = create_client(&server);
    let err = client.get_bucket("forbidden").await.unwrap_err();

    assert_eq!(err.reason(), Some(FailureReason::NotAuthorized));
}

#[tokio::test]
async fn test_create_bucket_sends_options() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bucket"))
        .and(body_partial_json(serde_json::json!({
            "id": "uploads",
            "name": "uploads",
            "public": true
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "name": "uploads"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_client(&server);
    let options = stowage::BucketUpsertOptions {
        public: true,
        ..Default::default()
    };
    let name = client.create_bucket("uploads", Some(options)).await.unwrap();

    assert_eq!(name, "uploads");
}

#[tokio::test]
async fn test_update_empty_delete_bucket() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/bucket/uploads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "id": "uploads", "name": "uploads", "public": true
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/bucket/uploads/empty"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Successfully emptied"
        })))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path("/bucket/uploads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "message": "Successfully deleted"
        })))
        .mount(&server)
        .await;

    let client = create_client(&server);

    let updated = client.update_bucket("uploads", None).await.unwrap();
    assert!(updated.public);

    let emptied = client.empty_bucket("uploads").await.unwrap();
    assert_eq!(emptied.message.as_deref(), Some("Successfully emptied"));

    let deleted = client.delete_bucket("uploads").await.unwrap();
    assert_eq!(deleted.message.as_deref(), Some("Successfully deleted"));
}

#[tokio::test]
async fn test_conflict_classified_as_already_exists() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/bucket"))
        .respond_with(
            ResponseTemplate::new(409)
                .set_body_string("The resource already exists"),
        )
        .mount(&server)
        .await;

    let client = create_client(&server);
    let err = client.create_bucket("dup", None).await.unwrap_err();

    assert_eq!(err.reason(), Some(FailureReason::AlreadyExists));
}
