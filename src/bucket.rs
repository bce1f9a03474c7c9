//! Bucket management endpoints.

use crate::client::StorageClient;
use crate::constants::endpoints;
use crate::error::StorageError;
use crate::http::make_request;
use crate::models::{Bucket, BucketUpsertOptions, GenericResponse};
use reqwest::Method;
use serde_json::json;

impl StorageClient {
    /// Retrieve the details of all buckets.
    pub async fn list_buckets(&self) -> Result<Vec<Bucket>, StorageError> {
        make_request(
            self.request_client(),
            Method::GET,
            &format!("{}{}", self.base_url(), endpoints::BUCKET),
            None,
            self.headers(),
        )
        .await
    }

    /// Retrieve the details of an existing bucket.
    ///
    /// A failure classified as not-found yields `Ok(None)` instead of an
    /// error; every other failure propagates.
    pub async fn get_bucket(&self, id: &str) -> Result<Option<Bucket>, StorageError> {
        let result: Result<Bucket, StorageError> = make_request(
            self.request_client(),
            Method::GET,
            &format!("{}{}/{}", self.base_url(), endpoints::BUCKET, id),
            None,
            self.headers(),
        )
        .await;

        match result {
            Ok(bucket) => Ok(Some(bucket)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Create a new bucket and return its name.
    pub async fn create_bucket(
        &self,
        id: &str,
        options: Option<BucketUpsertOptions>,
    ) -> Result<String, StorageError> {
        let options = options.unwrap_or_default();

        let body = json!({
            "id": id,
            "name": id,
            "public": options.public,
            "file_size_limit": options.file_size_limit,
            "allowed_mime_types": options.allowed_mime_types,
        });

        let created: Bucket = make_request(
            self.request_client(),
            Method::POST,
            &format!("{}{}", self.base_url(), endpoints::BUCKET),
            Some(body),
            self.headers(),
        )
        .await?;

        created
            .name
            .ok_or_else(|| StorageError::UnexpectedResponse("created bucket has no name".into()))
    }

    /// Update an existing bucket.
    pub async fn update_bucket(
        &self,
        id: &str,
        options: Option<BucketUpsertOptions>,
    ) -> Result<Bucket, StorageError> {
        let options = options.unwrap_or_default();

        let body = json!({
            "id": id,
            "public": options.public,
            "file_size_limit": options.file_size_limit,
            "allowed_mime_types": options.allowed_mime_types,
        });

        make_request(
            self.request_client(),
            Method::PUT,
            &format!("{}{}/{}", self.base_url(), endpoints::BUCKET, id),
            Some(body),
            self.headers(),
        )
        .await
    }

    /// Remove all objects inside a single bucket.
    pub async fn empty_bucket(&self, id: &str) -> Result<GenericResponse, StorageError> {
        make_request(
            self.request_client(),
            Method::POST,
            &format!("{}{}/{}/empty", self.base_url(), endpoints::BUCKET, id),
            None,
            self.headers(),
        )
        .await
    }

    /// Delete an existing bucket. A bucket with objects inside cannot be
    /// deleted; call [`StorageClient::empty_bucket`] first.
    pub async fn delete_bucket(&self, id: &str) -> Result<GenericResponse, StorageError> {
        make_request(
            self.request_client(),
            Method::DELETE,
            &format!("{}{}/{}", self.base_url(), endpoints::BUCKET, id),
            None,
            self.headers(),
        )
        .await
    }
}
