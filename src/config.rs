//! Client configuration.

use std::time::Duration;

/// Options applied when constructing a [`crate::StorageClient`].
///
/// Timeouts are independent per operation class: metadata calls finish in
/// seconds, while uploads and downloads of large payloads legitimately need
/// much longer ceilings.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Timeout for plain requests (bucket CRUD, list, sign, move, copy).
    pub request_timeout: Duration,

    /// Timeout for upload transfers, including each resumable chunk.
    pub upload_timeout: Duration,

    /// Timeout for download transfers.
    pub download_timeout: Duration,

    /// Default TTL for resumable session URLs in the upload cache. `None`
    /// keeps the cache's built-in default.
    pub default_cache_ttl: Option<Duration>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5 * 60),
            upload_timeout: Duration::from_secs(10 * 60),
            download_timeout: Duration::from_secs(10 * 60),
            default_cache_ttl: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = ClientOptions::default();
        assert_eq!(options.request_timeout, Duration::from_secs(300));
        assert!(options.upload_timeout > options.request_timeout);
        assert!(options.default_cache_ttl.is_none());
    }
}
