//! Storage client construction.
//!
//! A [`StorageClient`] owns everything that was process-global in older
//! designs: the three HTTP transports (plain request, upload, download —
//! each with its own timeout ceiling) and the resumable upload URL cache.
//! Lifecycle and test isolation are therefore controlled by whoever owns the
//! client; sharing across call sites is an explicit `Arc`/reference, never an
//! implicit global.

use crate::cache::UploadUrlCache;
use crate::config::ClientOptions;
use crate::error::StorageError;
use crate::file::FileApi;
use std::collections::HashMap;

/// Client for the object-storage HTTP service.
///
/// # Example
///
/// ```no_run
/// use stowage::StorageClient;
/// use std::collections::HashMap;
///
/// # async fn example() -> Result<(), stowage::StorageError> {
/// let mut headers = HashMap::new();
/// headers.insert("Authorization".to_string(), "Bearer token".to_string());
///
/// let client = StorageClient::new("https://storage.example.com/storage/v1", headers)?;
/// let buckets = client.list_buckets().await?;
/// let files = client.from("avatars").list("", None).await?;
/// # Ok(())
/// # }
/// ```
pub struct StorageClient {
    base_url: String,
    headers: HashMap<String, String>,
    request_client: reqwest::Client,
    upload_client: reqwest::Client,
    download_client: reqwest::Client,
    upload_cache: UploadUrlCache,
}

impl StorageClient {
    /// Create a client with default options.
    ///
    /// `headers` are sent with every request; `Authorization` belongs here.
    pub fn new(
        base_url: impl Into<String>,
        headers: HashMap<String, String>,
    ) -> Result<Self, StorageError> {
        Self::with_options(base_url, headers, ClientOptions::default())
    }

    /// Create a client with explicit options.
    ///
    /// The three transports are configured once here and must not be
    /// reconfigured while requests are in flight, so options are fixed for
    /// the client's lifetime.
    pub fn with_options(
        base_url: impl Into<String>,
        headers: HashMap<String, String>,
        options: ClientOptions,
    ) -> Result<Self, StorageError> {
        let base_url = base_url.into();
        let base_url = base_url.trim_end_matches('/').to_string();

        let request_client = reqwest::Client::builder()
            .timeout(options.request_timeout)
            .build()?;
        let upload_client = reqwest::Client::builder()
            .timeout(options.upload_timeout)
            .build()?;
        let download_client = reqwest::Client::builder()
            .timeout(options.download_timeout)
            .build()?;

        let upload_cache = UploadUrlCache::new();
        if let Some(ttl) = options.default_cache_ttl {
            upload_cache.set_default_ttl(ttl);
        }

        Ok(Self {
            base_url,
            headers,
            request_client,
            upload_client,
            download_client,
            upload_cache,
        })
    }

    /// Perform file operations within a bucket.
    pub fn from(&self, bucket_id: impl Into<String>) -> FileApi<'_> {
        FileApi::new(self, bucket_id.into())
    }

    /// The resumable upload URL cache owned by this client.
    pub fn upload_cache(&self) -> &UploadUrlCache {
        &self.upload_cache
    }

    pub(crate) fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub(crate) fn request_client(&self) -> &reqwest::Client {
        &self.request_client
    }

    pub(crate) fn upload_client(&self) -> &reqwest::Client {
        &self.upload_client
    }

    pub(crate) fn download_client(&self) -> &reqwest::Client {
        &self.download_client
    }
}
