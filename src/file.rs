//! File (object) endpoints, scoped to a single bucket.
//!
//! Obtained from [`StorageClient::from`]. Covers plain and resumable
//! uploads, progress-reporting downloads, signed URLs, listing, and
//! move/copy/remove operations.

use crate::client::StorageClient;
use crate::constants::{endpoints, headers as header_names};
use crate::error::StorageError;
use crate::http::make_request;
use crate::models::{
    CreateSignedUrlResponse, CreatedUploadSignedUrlResponse, DestinationOptions, DownloadOptions,
    FileObject, FileObjectV2, FileOptions, GenericResponse, SearchOptions, SignedUrlEntry,
    TransformOptions, UploadSignedUrl,
};
use crate::progress::{self, ProgressCallback, UploadSource};
use crate::resumable::{self, ResumableSource, ResumableUploadRequest};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Method;
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use tokio_util::sync::CancellationToken;

/// Characters escaped in query parameter values.
const QUERY_ENCODE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'&')
    .add(b'=')
    .add(b'%')
    .add(b'+')
    .add(b'?');

fn encode_query(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| {
            format!(
                "{}={}",
                utf8_percent_encode(key, QUERY_ENCODE),
                utf8_percent_encode(value, QUERY_ENCODE)
            )
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Append a query string to a URL that may already carry one.
fn append_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    if url.contains('?') {
        format!("{url}&{query}")
    } else {
        format!("{url}?{query}")
    }
}

/// File operations within one bucket.
pub struct FileApi<'a> {
    client: &'a StorageClient,
    bucket_id: String,
}

impl<'a> FileApi<'a> {
    pub(crate) fn new(client: &'a StorageClient, bucket_id: String) -> Self {
        Self { client, bucket_id }
    }

    /// `bucket/path`, the form every object endpoint expects.
    fn final_path(&self, path: &str) -> String {
        format!("{}/{}", self.bucket_id, path.trim_start_matches('/'))
    }

    fn cancel_or_default(cancel: Option<&CancellationToken>) -> CancellationToken {
        cancel.cloned().unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // URLs
    // ------------------------------------------------------------------

    /// Convenience URL for an asset in a public bucket.
    ///
    /// Does not verify that the bucket is actually public; a URL built for a
    /// private bucket will not be downloadable.
    pub fn get_public_url(
        &self,
        path: &str,
        transform: Option<&TransformOptions>,
        download: Option<&DownloadOptions>,
    ) -> String {
        let mut pairs = Vec::new();
        if let Some(download) = download {
            pairs.extend(download.to_query_pairs());
        }

        let endpoint = match transform {
            None => endpoints::OBJECT_PUBLIC,
            Some(transform) => {
                pairs.extend(transform.to_query_pairs());
                endpoints::RENDER_IMAGE_PUBLIC
            }
        };

        append_query(
            &format!(
                "{}{}/{}",
                self.client.base_url(),
                endpoint,
                self.final_path(path)
            ),
            &encode_query(&pairs),
        )
    }

    /// Create a time-limited signed URL for downloading an object without
    /// credentials.
    pub async fn create_signed_url(
        &self,
        path: &str,
        expires_in: u32,
        transform: Option<&TransformOptions>,
        download: Option<&DownloadOptions>,
    ) -> Result<String, StorageError> {
        let mut body = json!({ "expiresIn": expires_in });
        if let Some(transform) = transform {
            body["transform"] = serde_json::to_value(transform)?;
        }

        let response: CreateSignedUrlResponse = make_request(
            self.client.request_client(),
            Method::POST,
            &format!(
                "{}{}/{}",
                self.client.base_url(),
                endpoints::OBJECT_SIGN,
                self.final_path(path)
            ),
            Some(body),
            self.client.headers(),
        )
        .await?;

        let signed = response.signed_url.filter(|s| !s.is_empty()).ok_or_else(|| {
            StorageError::UnexpectedResponse(format!(
                "signed url for {path} returned empty, do you have permission?"
            ))
        })?;

        let query = download.map(|d| encode_query(&d.to_query_pairs())).unwrap_or_default();
        Ok(append_query(
            &format!("{}{}", self.client.base_url(), signed),
            &query,
        ))
    }

    /// Create signed URLs for several paths in one call.
    pub async fn create_signed_urls(
        &self,
        paths: &[String],
        expires_in: u32,
        download: Option<&DownloadOptions>,
    ) -> Result<Vec<SignedUrlEntry>, StorageError> {
        let body = json!({ "expiresIn": expires_in, "paths": paths });

        let mut entries: Vec<SignedUrlEntry> = make_request(
            self.client.request_client(),
            Method::POST,
            &format!(
                "{}{}/{}",
                self.client.base_url(),
                endpoints::OBJECT_SIGN,
                self.bucket_id
            ),
            Some(body),
            self.client.headers(),
        )
        .await?;

        let query = download.map(|d| encode_query(&d.to_query_pairs())).unwrap_or_default();

        for entry in &mut entries {
            let Some(signed) = entry.signed_url.take().filter(|s| !s.is_empty()) else {
                let path = entry.path.as_deref().unwrap_or("unknown path");
                return Err(StorageError::UnexpectedResponse(format!(
                    "signed url for {path} returned empty, do you have permission?"
                )));
            };
            entry.signed_url = Some(append_query(
                &format!("{}{}", self.client.base_url(), signed),
                &query,
            ));
        }

        Ok(entries)
    }

    /// Create an upload signed URL: lets a file be uploaded to this path
    /// without the caller's own credentials.
    pub async fn create_upload_signed_url(
        &self,
        path: &str,
    ) -> Result<UploadSignedUrl, StorageError> {
        let response: CreatedUploadSignedUrlResponse = make_request(
            self.client.request_client(),
            Method::POST,
            &format!(
                "{}{}/{}",
                self.client.base_url(),
                endpoints::UPLOAD_SIGN,
                self.final_path(path)
            ),
            None,
            self.client.headers(),
        )
        .await?;

        let url = response
            .url
            .filter(|u| u.contains("token"))
            .ok_or_else(|| {
                StorageError::UnexpectedResponse(
                    "response did not return a signed upload url; does this token have \
                     permission to generate one?"
                        .into(),
                )
            })?;

        let signed_url = format!("{}{}", self.client.base_url(), url);
        let token = signed_url
            .split_once("token=")
            .map(|(_, rest)| rest.split('&').next().unwrap_or(rest).to_string())
            .ok_or_else(|| {
                StorageError::UnexpectedResponse("signed upload url missing token".into())
            })?;

        Ok(UploadSignedUrl {
            signed_url,
            token,
            key: path.to_string(),
        })
    }

    // ------------------------------------------------------------------
    // Listing
    // ------------------------------------------------------------------

    /// List the objects under a prefix within the bucket.
    pub async fn list(
        &self,
        prefix: &str,
        options: Option<SearchOptions>,
    ) -> Result<Vec<FileObject>, StorageError> {
        let options = options.unwrap_or_default();

        let mut body = serde_json::to_value(&options)?;
        body["prefix"] = json!(prefix);

        make_request(
            self.client.request_client(),
            Method::POST,
            &format!(
                "{}{}/{}",
                self.client.base_url(),
                endpoints::OBJECT_LIST,
                self.bucket_id
            ),
            Some(body),
            self.client.headers(),
        )
        .await
    }

    /// Retrieve the details of an existing object.
    pub async fn info(&self, path: &str) -> Result<FileObjectV2, StorageError> {
        make_request(
            self.client.request_client(),
            Method::GET,
            &format!(
                "{}{}/{}",
                self.client.base_url(),
                endpoints::OBJECT_INFO,
                self.final_path(path)
            ),
            None,
            self.client.headers(),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Plain uploads
    // ------------------------------------------------------------------

    /// Upload a local file to the bucket. Returns the final object path.
    pub async fn upload_file(
        &self,
        local_path: impl AsRef<Path>,
        path: &str,
        options: Option<FileOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, StorageError> {
        self.upload_or_update(
            Method::POST,
            UploadSource::File(local_path.as_ref().to_path_buf()),
            path,
            options.unwrap_or_default(),
            progress,
            cancel,
        )
        .await
    }

    /// Upload an in-memory buffer to the bucket. Returns the final object
    /// path.
    pub async fn upload_bytes(
        &self,
        data: impl Into<Bytes>,
        path: &str,
        options: Option<FileOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, StorageError> {
        self.upload_or_update(
            Method::POST,
            UploadSource::Bytes(data.into()),
            path,
            options.unwrap_or_default(),
            progress,
            cancel,
        )
        .await
    }

    /// Replace an existing object with the contents of a local file.
    pub async fn update_file(
        &self,
        local_path: impl AsRef<Path>,
        path: &str,
        options: Option<FileOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, StorageError> {
        self.upload_or_update(
            Method::PUT,
            UploadSource::File(local_path.as_ref().to_path_buf()),
            path,
            options.unwrap_or_default(),
            progress,
            cancel,
        )
        .await
    }

    /// Replace an existing object with an in-memory buffer.
    pub async fn update_bytes(
        &self,
        data: impl Into<Bytes>,
        path: &str,
        options: Option<FileOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, StorageError> {
        self.upload_or_update(
            Method::PUT,
            UploadSource::Bytes(data.into()),
            path,
            options.unwrap_or_default(),
            progress,
            cancel,
        )
        .await
    }

    async fn upload_or_update(
        &self,
        method: Method,
        source: UploadSource,
        path: &str,
        options: FileOptions,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, StorageError> {
        let final_path = self.final_path(path);
        let url = format!(
            "{}{}/{}",
            self.client.base_url(),
            endpoints::OBJECT,
            final_path
        );

        progress::upload_with_progress(
            self.client.upload_client(),
            method,
            &url,
            source,
            &self.build_upload_headers(&options),
            progress,
            &Self::cancel_or_default(cancel),
        )
        .await?;

        Ok(final_path)
    }

    /// Upload a local file through a pre-generated signed upload URL.
    pub async fn upload_file_to_signed_url(
        &self,
        local_path: impl AsRef<Path>,
        signed_url: &UploadSignedUrl,
        options: Option<FileOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, StorageError> {
        self.upload_to_signed_url(
            UploadSource::File(local_path.as_ref().to_path_buf()),
            signed_url,
            options.unwrap_or_default(),
            progress,
            cancel,
        )
        .await
    }

    /// Upload an in-memory buffer through a pre-generated signed upload URL.
    pub async fn upload_bytes_to_signed_url(
        &self,
        data: impl Into<Bytes>,
        signed_url: &UploadSignedUrl,
        options: Option<FileOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, StorageError> {
        self.upload_to_signed_url(
            UploadSource::Bytes(data.into()),
            signed_url,
            options.unwrap_or_default(),
            progress,
            cancel,
        )
        .await
    }

    async fn upload_to_signed_url(
        &self,
        source: UploadSource,
        signed_url: &UploadSignedUrl,
        options: FileOptions,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<String, StorageError> {
        let mut headers = self.build_upload_headers(&options);
        headers.insert(
            header_names::AUTHORIZATION.to_string(),
            format!("Bearer {}", signed_url.token),
        );

        progress::upload_with_progress(
            self.client.upload_client(),
            Method::PUT,
            &signed_url.signed_url,
            source,
            &headers,
            progress,
            &Self::cancel_or_default(cancel),
        )
        .await?;

        Ok(self.final_path(&signed_url.key))
    }

    // ------------------------------------------------------------------
    // Resumable uploads
    // ------------------------------------------------------------------

    /// Upload a local file through the resumable protocol, resuming a prior
    /// interrupted attempt when its session URL is still cached.
    ///
    /// Resumption only skips the create round-trip: the payload is always
    /// retransmitted from the start of the file.
    pub async fn upload_or_resume_file(
        &self,
        local_path: impl AsRef<Path>,
        path: &str,
        options: Option<FileOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), StorageError> {
        let source = ResumableSource::from_path(local_path.as_ref()).await?;
        self.upload_or_resume(source, path, options.unwrap_or_default(), progress, cancel)
            .await
    }

    /// Upload an in-memory buffer through the resumable protocol.
    ///
    /// Resumption only skips the create round-trip: the payload is always
    /// retransmitted from the start of the buffer.
    pub async fn upload_or_resume_bytes(
        &self,
        data: impl Into<Bytes>,
        path: &str,
        options: Option<FileOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), StorageError> {
        self.upload_or_resume(
            ResumableSource::from_bytes(data.into()),
            path,
            options.unwrap_or_default(),
            progress,
            cancel,
        )
        .await
    }

    async fn upload_or_resume(
        &self,
        source: ResumableSource,
        path: &str,
        options: FileOptions,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), StorageError> {
        let mut headers = self.client.headers().clone();
        headers.insert(
            header_names::CACHE_CONTROL.to_string(),
            format!("max-age={}", options.cache_control),
        );
        if options.upsert {
            headers.insert(header_names::UPSERT.to_string(), "true".to_string());
        }
        if let Some(duplex) = &options.duplex {
            headers.insert(header_names::DUPLEX.to_string(), duplex.to_lowercase());
        }
        if let Some(extra) = &options.headers {
            headers.extend(extra.clone());
        }

        let mut metadata = vec![
            ("bucketName".to_string(), self.bucket_id.clone()),
            ("objectName".to_string(), path.to_string()),
            ("contentType".to_string(), options.content_type.clone()),
        ];
        if let Some(custom) = &options.metadata {
            metadata.push(("metadata".to_string(), serde_json::to_string(custom)?));
        }

        let request = ResumableUploadRequest {
            create_url: format!(
                "{}{}",
                self.client.base_url(),
                endpoints::UPLOAD_RESUMABLE
            ),
            cache_key: self.final_path(path),
            headers,
            metadata,
        };

        resumable::upload_or_resume(
            self.client.upload_client(),
            self.client.upload_cache(),
            request,
            source,
            progress,
            &Self::cancel_or_default(cancel),
        )
        .await?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Downloads
    // ------------------------------------------------------------------

    /// Download an object from a private bucket into memory.
    pub async fn download_bytes(
        &self,
        path: &str,
        transform: Option<&TransformOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<u8>, StorageError> {
        progress::download_bytes(
            self.client.download_client(),
            &self.private_download_url(path, transform),
            self.client.headers(),
            progress,
            &Self::cancel_or_default(cancel),
        )
        .await
    }

    /// Download an object from a private bucket onto the local filesystem.
    pub async fn download_to_file(
        &self,
        path: &str,
        local_path: impl AsRef<Path>,
        transform: Option<&TransformOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), StorageError> {
        progress::download_to_file(
            self.client.download_client(),
            &self.private_download_url(path, transform),
            self.client.headers(),
            local_path.as_ref(),
            progress,
            &Self::cancel_or_default(cancel),
        )
        .await
    }

    /// Download a public object into memory. Does not verify that the bucket
    /// is actually public.
    pub async fn download_public_bytes(
        &self,
        path: &str,
        transform: Option<&TransformOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<u8>, StorageError> {
        progress::download_bytes(
            self.client.download_client(),
            &self.get_public_url(path, transform, None),
            self.client.headers(),
            progress,
            &Self::cancel_or_default(cancel),
        )
        .await
    }

    /// Download a public object onto the local filesystem. Does not verify
    /// that the bucket is actually public.
    pub async fn download_public_to_file(
        &self,
        path: &str,
        local_path: impl AsRef<Path>,
        transform: Option<&TransformOptions>,
        progress: Option<ProgressCallback>,
        cancel: Option<&CancellationToken>,
    ) -> Result<(), StorageError> {
        progress::download_to_file(
            self.client.download_client(),
            &self.get_public_url(path, transform, None),
            self.client.headers(),
            local_path.as_ref(),
            progress,
            &Self::cancel_or_default(cancel),
        )
        .await
    }

    fn private_download_url(&self, path: &str, transform: Option<&TransformOptions>) -> String {
        match transform {
            None => format!(
                "{}{}/{}",
                self.client.base_url(),
                endpoints::OBJECT,
                self.final_path(path)
            ),
            Some(transform) => append_query(
                &format!(
                    "{}{}/{}",
                    self.client.base_url(),
                    endpoints::RENDER_IMAGE_AUTHENTICATED,
                    self.final_path(path)
                ),
                &encode_query(&transform.to_query_pairs()),
            ),
        }
    }

    // ------------------------------------------------------------------
    // Move / copy / remove
    // ------------------------------------------------------------------

    /// Move an object to a new key, optionally into another bucket.
    pub async fn move_object(
        &self,
        from_path: &str,
        to_path: &str,
        options: Option<&DestinationOptions>,
    ) -> Result<(), StorageError> {
        self.relocate(endpoints::OBJECT_MOVE, from_path, to_path, options)
            .await
    }

    /// Copy an object to a new key, optionally into another bucket.
    pub async fn copy_object(
        &self,
        from_path: &str,
        to_path: &str,
        options: Option<&DestinationOptions>,
    ) -> Result<(), StorageError> {
        self.relocate(endpoints::OBJECT_COPY, from_path, to_path, options)
            .await
    }

    async fn relocate(
        &self,
        endpoint: &str,
        from_path: &str,
        to_path: &str,
        options: Option<&DestinationOptions>,
    ) -> Result<(), StorageError> {
        let body = json!({
            "bucketId": self.bucket_id,
            "sourceKey": from_path,
            "destinationKey": to_path,
            "destinationBucket": options.and_then(|o| o.destination_bucket.clone()),
        });

        let _: GenericResponse = make_request(
            self.client.request_client(),
            Method::POST,
            &format!("{}{}", self.client.base_url(), endpoint),
            Some(body),
            self.client.headers(),
        )
        .await?;

        Ok(())
    }

    /// Delete a single object. Returns its listing entry when the server
    /// reports one.
    pub async fn remove(&self, path: &str) -> Result<Option<FileObject>, StorageError> {
        let mut removed = self.remove_paths(&[path.to_string()]).await?;
        Ok(if removed.is_empty() {
            None
        } else {
            Some(removed.remove(0))
        })
    }

    /// Delete several objects within the bucket.
    pub async fn remove_paths(&self, paths: &[String]) -> Result<Vec<FileObject>, StorageError> {
        make_request(
            self.client.request_client(),
            Method::DELETE,
            &format!(
                "{}{}/{}",
                self.client.base_url(),
                endpoints::OBJECT,
                self.bucket_id
            ),
            Some(json!({ "prefixes": paths })),
            self.client.headers(),
        )
        .await
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn build_upload_headers(&self, options: &FileOptions) -> HashMap<String, String> {
        let mut headers = self.client.headers().clone();

        headers.insert(
            header_names::CACHE_CONTROL.to_string(),
            format!("max-age={}", options.cache_control),
        );
        headers.insert(
            header_names::CONTENT_TYPE.to_string(),
            options.content_type.clone(),
        );

        if options.upsert {
            headers.insert(header_names::UPSERT.to_string(), "true".to_string());
        }

        if let Some(metadata) = &options.metadata {
            if let Ok(encoded) = serde_json::to_string(metadata).map(|json| BASE64.encode(json)) {
                headers.insert(header_names::METADATA.to_string(), encoded);
            }
        }

        if let Some(extra) = &options.headers {
            headers.extend(extra.clone());
        }

        if let Some(duplex) = &options.duplex {
            headers.insert(header_names::DUPLEX.to_string(), duplex.to_lowercase());
        }

        headers
    }
}
