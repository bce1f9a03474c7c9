//! Shared request plumbing for the REST façades.
//!
//! One helper issues a request with the configured headers, deserializes the
//! success body, and converts any non-success status into a classified
//! [`StorageError::Server`]. Network-level failures propagate unmodified.

use crate::error::StorageError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;

/// Build a [`HeaderMap`] from a string map, skipping names or values that are
/// not representable on the wire.
pub(crate) fn build_header_map(headers: &HashMap<String, String>) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());

    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.insert(name, value);
            }
            _ => {
                tracing::warn!(header = %name, "skipping malformed header");
            }
        }
    }

    map
}

/// Read the response body and build the classified server error.
pub(crate) async fn error_from_response(response: Response) -> StorageError {
    let status = response.status().as_u16();
    match response.text().await {
        Ok(body) => StorageError::from_response(status, body),
        Err(err) => StorageError::Http(err),
    }
}

/// Issue a request and return the raw success response.
pub(crate) async fn send_request(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<serde_json::Value>,
    headers: &HashMap<String, String>,
) -> Result<Response, StorageError> {
    let mut builder = client
        .request(method, url)
        .headers(build_header_map(headers));

    if let Some(body) = body {
        builder = builder.json(&body);
    }

    let response = builder.send().await?;

    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

/// Issue a request and deserialize the success body into `T`.
pub(crate) async fn make_request<T: DeserializeOwned>(
    client: &reqwest::Client,
    method: Method,
    url: &str,
    body: Option<serde_json::Value>,
    headers: &HashMap<String, String>,
) -> Result<T, StorageError> {
    let response = send_request(client, method, url, body, headers).await?;
    Ok(response.json::<T>().await?)
}
