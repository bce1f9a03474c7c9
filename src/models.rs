//! Wire data model for the storage API.
//!
//! These structs mirror the JSON bodies the service produces and consumes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A named namespace on the remote service grouping objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Bucket {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    /// Public buckets don't require an authorization token to download
    /// objects, but still require a valid token for all other operations.
    /// Buckets are private by default.
    #[serde(default)]
    pub public: bool,

    /// File size limit accepted during upload, e.g. `"1kb"`, `"50mb"`.
    #[serde(default)]
    pub file_size_limit: Option<String>,

    /// Allowed mime types during upload, e.g. `["image/jpeg", "image/png"]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_mime_types: Option<Vec<String>>,
}

/// Options for creating or updating a bucket.
#[derive(Debug, Clone, Default)]
pub struct BucketUpsertOptions {
    pub public: bool,
    pub file_size_limit: Option<String>,
    pub allowed_mime_types: Option<Vec<String>>,
}

/// An object (or folder placeholder) listed within a bucket.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileObject {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub bucket_id: Option<String>,

    #[serde(default)]
    pub owner: Option<String>,

    #[serde(default)]
    pub id: Option<String>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl FileObject {
    /// Folders come back as name-only entries with every other field null.
    pub fn is_folder(&self) -> bool {
        self.name.as_deref().is_some_and(|n| !n.is_empty())
            && self.id.is_none()
            && self.created_at.is_none()
            && self.updated_at.is_none()
    }
}

/// Extended object details returned by the info endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileObjectV2 {
    pub id: String,

    pub version: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub bucket_id: Option<String>,

    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub last_accessed_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub size: Option<u64>,

    #[serde(default)]
    pub cache_control: Option<String>,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub etag: Option<String>,

    #[serde(default)]
    pub last_modified: Option<DateTime<Utc>>,

    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// Sorting configuration for list queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortBy {
    #[serde(default)]
    pub column: Option<String>,

    #[serde(default)]
    pub order: Option<String>,
}

impl Default for SortBy {
    fn default() -> Self {
        Self {
            column: Some("name".into()),
            order: Some("asc".into()),
        }
    }
}

/// Options for listing objects within a bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Number of files to be returned.
    pub limit: u32,

    /// Starting position of the query.
    pub offset: u32,

    /// Search string to filter files by.
    pub search: String,

    #[serde(rename = "sortBy")]
    pub sort_by: SortBy,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 100,
            offset: 0,
            search: String::new(),
            sort_by: SortBy::default(),
        }
    }
}

/// Per-upload options controlling the fixed-name headers sent with a file.
#[derive(Debug, Clone)]
pub struct FileOptions {
    /// `cache-control: max-age` value, in seconds.
    pub cache_control: String,

    /// Content type of the payload. The client does not infer this from the
    /// file name; callers set it explicitly.
    pub content_type: String,

    /// Overwrite an existing object at the same path (`x-upsert`).
    pub upsert: bool,

    /// Value for the `x-duplex` header, when the server supports duplex
    /// streaming.
    pub duplex: Option<String>,

    /// Custom object metadata, sent base64-encoded in `x-metadata` (plain
    /// uploads) or inside the resumable session metadata.
    pub metadata: Option<HashMap<String, String>>,

    /// Additional headers forwarded verbatim.
    pub headers: Option<HashMap<String, String>>,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            cache_control: crate::constants::defaults::CACHE_CONTROL_MAX_AGE.to_string(),
            content_type: "text/plain;charset=UTF-8".into(),
            upsert: false,
            duplex: None,
            metadata: None,
            headers: None,
        }
    }
}

/// Server-side image resize mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeMode {
    /// Maintain aspect ratio while filling the entire width and height.
    #[default]
    Cover,
    /// Maintain aspect ratio while fitting within the width and height.
    Contain,
    /// Fill the entire width and height, stretching if needed.
    Fill,
}

impl ResizeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResizeMode::Cover => "cover",
            ResizeMode::Contain => "contain",
            ResizeMode::Fill => "fill",
        }
    }
}

/// Parameters requesting server-side image transformation on download.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformOptions {
    /// Width of the image in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    /// Height of the image in pixels.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    pub resize: ResizeMode,

    /// Quality of the returned image, percentage based.
    pub quality: u8,

    /// Requested output format. `"origin"` forces the original format,
    /// bypassing automatic conversion.
    pub format: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            resize: ResizeMode::Cover,
            quality: 80,
            format: "origin".into(),
        }
    }
}

impl TransformOptions {
    /// Render as query parameters for URL construction.
    pub(crate) fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();

        if let Some(width) = self.width {
            pairs.push(("width".into(), width.to_string()));
        }
        if let Some(height) = self.height {
            pairs.push(("height".into(), height.to_string()));
        }
        pairs.push(("format".into(), self.format.clone()));
        pairs.push(("resize".into(), self.resize.as_str().into()));
        pairs.push(("quality".into(), self.quality.to_string()));

        pairs
    }
}

/// Options controlling the `download` query parameter on asset URLs.
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    /// `None`: no download attribute. Empty string: download under the
    /// original file name. Otherwise: download under the given name.
    pub file_name: Option<String>,
}

impl DownloadOptions {
    /// Download under the original file name.
    pub fn use_original_file_name() -> Self {
        Self {
            file_name: Some(String::new()),
        }
    }

    pub(crate) fn to_query_pairs(&self) -> Vec<(String, String)> {
        match &self.file_name {
            None => Vec::new(),
            Some(name) if name.is_empty() => vec![("download".into(), "true".into())],
            Some(name) => vec![("download".into(), name.clone())],
        }
    }
}

/// Destination settings for move/copy operations.
#[derive(Debug, Clone, Default)]
pub struct DestinationOptions {
    /// Target bucket, when relocating across buckets.
    pub destination_bucket: Option<String>,
}

/// Response from creating a single signed URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateSignedUrlResponse {
    #[serde(rename = "signedURL", default)]
    pub signed_url: Option<String>,
}

/// One entry of the multi-path signed URL response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignedUrlEntry {
    #[serde(rename = "signedURL", default)]
    pub signed_url: Option<String>,

    #[serde(default)]
    pub path: Option<String>,
}

/// Response from creating an upload signed URL.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct CreatedUploadSignedUrlResponse {
    #[serde(default)]
    pub url: Option<String>,
}

/// A pre-authorized upload target: lets a file be uploaded without the
/// caller's own credentials.
#[derive(Debug, Clone)]
pub struct UploadSignedUrl {
    /// The full signed URL.
    pub signed_url: String,

    /// The token embedded in the URL query.
    pub token: String,

    /// The object key the URL uploads to.
    pub key: String,
}

/// Minimal `{ "message": ... }` acknowledgement body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenericResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_object_folder_detection() {
        let folder = FileObject {
            name: Some("photos".into()),
            ..Default::default()
        };
        assert!(folder.is_folder());

        let file = FileObject {
            name: Some("photos/cat.png".into()),
            id: Some("abc".into()),
            ..Default::default()
        };
        assert!(!file.is_folder());
    }

    #[test]
    fn test_transform_options_query_defaults() {
        let pairs = TransformOptions::default().to_query_pairs();
        assert!(pairs.contains(&("resize".into(), "cover".into())));
        assert!(pairs.contains(&("quality".into(), "80".into())));
        assert!(pairs.contains(&("format".into(), "origin".into())));
        assert!(!pairs.iter().any(|(k, _)| k == "width"));
    }

    #[test]
    fn test_download_options_query() {
        assert!(DownloadOptions::default().to_query_pairs().is_empty());
        assert_eq!(
            DownloadOptions::use_original_file_name().to_query_pairs(),
            vec![("download".to_string(), "true".to_string())]
        );
        let named = DownloadOptions {
            file_name: Some("report.pdf".into()),
        };
        assert_eq!(
            named.to_query_pairs(),
            vec![("download".to_string(), "report.pdf".to_string())]
        );
    }

    #[test]
    fn test_search_options_serializes_sort_by() {
        let json = serde_json::to_value(SearchOptions::default()).unwrap();
        assert_eq!(json["limit"], 100);
        assert_eq!(json["sortBy"]["column"], "name");
        assert_eq!(json["sortBy"]["order"], "asc");
    }
}
