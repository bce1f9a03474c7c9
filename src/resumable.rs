//! Resumable upload protocol driver.
//!
//! Implements the storage service's create-then-patch handshake: a create
//! request registers the upload length and metadata and yields a session
//! location URL, then sequential PATCH requests push the payload in 6 MiB
//! chunks against that location. The session URL is cached per upload key so
//! a retried call can skip the create round-trip; the payload itself is
//! always retransmitted from offset zero — this driver does not skip
//! already-acknowledged bytes.

use crate::cache::UploadUrlCache;
use crate::constants::defaults::UPLOAD_CHUNK_SIZE;
use crate::error::StorageError;
use crate::http::{build_header_map, error_from_response};
use crate::progress::ProgressCallback;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::CONTENT_LENGTH;
use reqwest::Response;
use std::collections::HashMap;
use std::io::SeekFrom;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::sync::CancellationToken;

const RESUMABLE_PROTOCOL_VERSION: &str = "1.0.0";
const PATCH_CONTENT_TYPE: &str = "application/offset+octet-stream";

/// Local byte source for a resumable upload.
///
/// Every attempt, fresh or resumed, rewinds to the start of the logical
/// stream before transmitting.
pub(crate) enum ResumableSource {
    File(tokio::fs::File),
    Buffer { data: Bytes, position: usize },
}

impl ResumableSource {
    pub(crate) async fn from_path(path: &std::path::Path) -> Result<Self, StorageError> {
        Ok(ResumableSource::File(tokio::fs::File::open(path).await?))
    }

    pub(crate) fn from_bytes(data: Bytes) -> Self {
        ResumableSource::Buffer { data, position: 0 }
    }

    async fn rewind(&mut self) -> Result<(), StorageError> {
        match self {
            ResumableSource::File(file) => {
                if file.stream_position().await? != 0 {
                    file.seek(SeekFrom::Start(0)).await?;
                }
            }
            ResumableSource::Buffer { position, .. } => *position = 0,
        }
        Ok(())
    }

    async fn total_len(&self) -> Result<u64, StorageError> {
        match self {
            ResumableSource::File(file) => Ok(file.metadata().await?.len()),
            ResumableSource::Buffer { data, .. } => Ok(data.len() as u64),
        }
    }

    /// Read the next chunk of at most `size` bytes. Empty at end of stream.
    async fn read_chunk(&mut self, size: usize) -> Result<Bytes, StorageError> {
        match self {
            ResumableSource::File(file) => {
                let mut buf = vec![0u8; size];
                let mut filled = 0;
                while filled < size {
                    let n = file.read(&mut buf[filled..]).await?;
                    if n == 0 {
                        break;
                    }
                    filled += n;
                }
                buf.truncate(filled);
                Ok(Bytes::from(buf))
            }
            ResumableSource::Buffer { data, position } => {
                let end = (*position + size).min(data.len());
                let chunk = data.slice(*position..end);
                *position = end;
                Ok(chunk)
            }
        }
    }
}

/// Everything the driver needs besides the payload itself.
pub(crate) struct ResumableUploadRequest {
    /// Create endpoint, `{base}/upload/resumable`.
    pub create_url: String,

    /// Cache key for the session URL, typically `bucket/object`.
    pub cache_key: String,

    /// Request headers applied to both phases (authorization, cache-control,
    /// upsert and duplex flags, caller extras).
    pub headers: HashMap<String, String>,

    /// Session metadata pairs: bucket name, object name, content type, plus
    /// caller-supplied custom metadata.
    pub metadata: Vec<(String, String)>,
}

/// Encode metadata pairs for the create request: comma-separated
/// `key base64(value)` entries.
fn encode_metadata(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{} {}", key, BASE64.encode(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Resolve the session location against the create URL when the server
/// returns a relative reference. Covers absolute URLs, root-relative paths,
/// and bare relative paths; unresolvable locations are an error.
fn resolve_location(create_url: &str, location: &str) -> Result<String, StorageError> {
    reqwest::Url::parse(create_url)
        .and_then(|base| base.join(location))
        .map(|url| url.to_string())
        .map_err(|_| {
            StorageError::UnexpectedResponse(format!(
                "unresolvable session location {location:?}"
            ))
        })
}

async fn await_cancellable(
    cancel: &CancellationToken,
    request: reqwest::RequestBuilder,
) -> Result<Response, StorageError> {
    tokio::select! {
        _ = cancel.cancelled() => Err(StorageError::Canceled),
        result = request.send() => Ok(result?),
    }
}

/// Create an upload session and return its location URL.
async fn create_session(
    client: &reqwest::Client,
    request: &ResumableUploadRequest,
    total: u64,
    cancel: &CancellationToken,
) -> Result<String, StorageError> {
    let builder = client
        .post(&request.create_url)
        .headers(build_header_map(&request.headers))
        .header("Tus-Resumable", RESUMABLE_PROTOCOL_VERSION)
        .header("Upload-Length", total)
        .header("Upload-Metadata", encode_metadata(&request.metadata))
        .header(CONTENT_LENGTH, 0u64);

    let response = await_cancellable(cancel, builder).await?;

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
        .ok_or_else(|| {
            StorageError::UnexpectedResponse("create response missing session location".into())
        })?;

    resolve_location(&request.create_url, &location)
}

/// Run the full create-then-patch state machine for one upload attempt.
///
/// On a cache hit for `cache_key` the create phase is skipped and chunks are
/// patched against the cached session URL. The cache entry is dropped on
/// final success and kept on failure or cancellation, so the next attempt
/// resumes against the same session.
#[tracing::instrument(
    skip_all,
    fields(cache_key = %request.cache_key),
    err
)]
pub(crate) async fn upload_or_resume(
    client: &reqwest::Client,
    cache: &UploadUrlCache,
    request: ResumableUploadRequest,
    mut source: ResumableSource,
    progress: Option<ProgressCallback>,
    cancel: &CancellationToken,
) -> Result<Response, StorageError> {
    source.rewind().await?;
    let total = source.total_len().await?;

    let location = match cache.try_get(&request.cache_key) {
        Some(cached) => {
            tracing::debug!("reusing cached upload session");
            cached
        }
        None => {
            let location = create_session(client, &request, total, cancel).await?;
            cache.set(&request.cache_key, &location, None)?;
            location
        }
    };

    let mut uploaded: u64 = 0;
    let response = loop {
        if cancel.is_cancelled() {
            return Err(StorageError::Canceled);
        }

        let chunk = source.read_chunk(UPLOAD_CHUNK_SIZE).await?;
        // An empty chunk before the declared length means the source shrank
        // underneath us; looping would patch empty bodies forever.
        if chunk.is_empty() && total > 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("source ended after {uploaded} of {total} declared bytes"),
            )
            .into());
        }
        let chunk_len = chunk.len() as u64;

        let builder = client
            .patch(&location)
            .headers(build_header_map(&request.headers))
            .header("Tus-Resumable", RESUMABLE_PROTOCOL_VERSION)
            .header("Upload-Offset", uploaded)
            .header("content-type", PATCH_CONTENT_TYPE)
            .header(CONTENT_LENGTH, chunk_len)
            .body(chunk);

        let response = await_cancellable(cancel, builder).await?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        uploaded += chunk_len;
        tracing::debug!(uploaded, total, "patched chunk");

        if let Some(callback) = &progress {
            let percent = if total == 0 {
                100.0
            } else {
                uploaded as f32 / total as f32 * 100.0
            };
            callback(percent);
        }

        if uploaded >= total {
            break response;
        }
    };

    cache.remove(&request.cache_key);
    Ok(response)
}
