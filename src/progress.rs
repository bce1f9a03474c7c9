//! Progress-reporting byte transfer between local sources and the network.
//!
//! Downloads stream the response body in bounded chunks, so memory stays flat
//! regardless of payload size. Uploads wrap the source in a body stream that
//! reads fixed-size chunks and reports a running percentage after each one.
//! Non-success HTTP responses are converted into classified
//! [`StorageError::Server`] values; network-level failures propagate
//! unmodified.

use crate::constants::defaults::UPLOAD_BUFFER_SIZE;
use crate::error::StorageError;
use crate::http::{build_header_map, error_from_response};
use bytes::Bytes;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Method, Response};
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Caller-supplied progress observer, invoked with a percentage in `0..=100`.
///
/// Invoked synchronously at transfer suspension points; it is advisory and
/// must not block.
pub type ProgressCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Local byte source for an upload.
pub(crate) enum UploadSource {
    File(std::path::PathBuf),
    Bytes(Bytes),
}

impl UploadSource {
    async fn open(
        self,
    ) -> Result<(Box<dyn AsyncRead + Send + Unpin + 'static>, u64), StorageError> {
        match self {
            UploadSource::File(path) => {
                let file = tokio::fs::File::open(&path).await?;
                let len = file.metadata().await?.len();
                Ok((Box::new(file), len))
            }
            UploadSource::Bytes(data) => {
                let len = data.len() as u64;
                Ok((Box::new(Cursor::new(data)), len))
            }
        }
    }
}

/// Split a header set by the original placement rule: names containing
/// "content" describe the entity and travel with the body, the rest are plain
/// request headers.
pub(crate) fn split_headers(
    headers: &HashMap<String, String>,
) -> (HashMap<String, String>, HashMap<String, String>) {
    let mut content = HashMap::new();
    let mut request = HashMap::new();

    for (name, value) in headers {
        if name.to_ascii_lowercase().contains("content") {
            content.insert(name.clone(), value.clone());
        } else {
            request.insert(name.clone(), value.clone());
        }
    }

    (content, request)
}

/// Upload a source as a streamed request body, reporting progress after each
/// chunk read.
#[tracing::instrument(skip_all, fields(url = %url))]
pub(crate) async fn upload_with_progress(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    source: UploadSource,
    headers: &HashMap<String, String>,
    progress: Option<ProgressCallback>,
    cancel: &CancellationToken,
) -> Result<Response, StorageError> {
    let (reader, total) = source.open().await?;

    let stream = futures::stream::try_unfold(
        (reader, 0u64, progress),
        move |(mut reader, sent, progress)| async move {
            let mut buf = vec![0u8; UPLOAD_BUFFER_SIZE];
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                return Ok::<_, std::io::Error>(None);
            }
            buf.truncate(n);

            let sent = sent + n as u64;
            if let Some(callback) = &progress {
                callback(sent as f32 / total as f32 * 100.0);
            }

            Ok(Some((Bytes::from(buf), (reader, sent, progress))))
        },
    );

    let (content_headers, request_headers) = split_headers(headers);

    let builder = client
        .request(method, url)
        .headers(build_header_map(&request_headers))
        .headers(build_header_map(&content_headers))
        .header(CONTENT_LENGTH, total)
        .body(reqwest::Body::wrap_stream(stream));

    let response = tokio::select! {
        _ = cancel.cancelled() => return Err(StorageError::Canceled),
        result = builder.send() => result?,
    };

    if response.status().is_success() {
        tracing::debug!(bytes = total, "upload complete");
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

/// Download into memory, reporting progress when the server supplies a
/// content length.
pub(crate) async fn download_bytes(
    client: &reqwest::Client,
    url: &str,
    headers: &HashMap<String, String>,
    progress: Option<ProgressCallback>,
    cancel: &CancellationToken,
) -> Result<Vec<u8>, StorageError> {
    let mut buffer = Vec::new();
    download_to_writer(client, url, headers, &mut buffer, progress, cancel).await?;
    Ok(buffer)
}

/// Download onto the local filesystem, reporting progress when the server
/// supplies a content length.
pub(crate) async fn download_to_file(
    client: &reqwest::Client,
    url: &str,
    headers: &HashMap<String, String>,
    local_path: &Path,
    progress: Option<ProgressCallback>,
    cancel: &CancellationToken,
) -> Result<(), StorageError> {
    let mut file = tokio::fs::File::create(local_path).await?;
    download_to_writer(client, url, headers, &mut file, progress, cancel).await?;
    file.flush().await?;
    Ok(())
}

/// Core download loop: headers first, body streamed only once success is
/// confirmed. A non-success response's body is the error payload.
#[tracing::instrument(skip_all, fields(url = %url))]
async fn download_to_writer<W: AsyncWrite + Unpin>(
    client: &reqwest::Client,
    url: &str,
    headers: &HashMap<String, String>,
    destination: &mut W,
    progress: Option<ProgressCallback>,
    cancel: &CancellationToken,
) -> Result<(), StorageError> {
    let request = client.get(url).headers(build_header_map(headers));

    let mut response = tokio::select! {
        _ = cancel.cancelled() => return Err(StorageError::Canceled),
        result = request.send() => result?,
    };

    if !response.status().is_success() {
        return Err(error_from_response(response).await);
    }

    // No content length means no incremental progress events.
    let content_length = response.content_length();
    let mut received: u64 = 0;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return Err(StorageError::Canceled),
            result = response.chunk() => result?,
        };

        let Some(chunk) = chunk else {
            break;
        };

        destination.write_all(&chunk).await?;
        received += chunk.len() as u64;

        if let (Some(callback), Some(total)) = (&progress, content_length) {
            if total > 0 {
                callback(received as f32 / total as f32 * 100.0);
            }
        }
    }

    tracing::debug!(bytes = received, "download complete");
    Ok(())
}
