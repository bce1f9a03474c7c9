//! Stowage
//!
//! Typed async client for an object-storage HTTP API.
//!
//! # Features
//!
//! - **Bucket and object management**: CRUD, listing, move/copy, signed URLs
//! - **Resumable uploads**: create-then-patch chunked protocol with an
//!   in-memory session URL cache, so retries skip the create round-trip
//! - **Progress reporting**: fractional progress callbacks on uploads and
//!   downloads, streamed with bounded memory
//! - **Classified errors**: server failures carry a [`FailureReason`]
//!   callers can branch on instead of matching status codes or body strings
//!
//! # Example
//!
//! ```no_run
//! use stowage::StorageClient;
//! use std::collections::HashMap;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stowage::StorageError> {
//!     let mut headers = HashMap::new();
//!     headers.insert("Authorization".to_string(), "Bearer token".to_string());
//!
//!     let client = StorageClient::new("https://storage.example.com/storage/v1", headers)?;
//!     let files = client.from("avatars").list("", None).await?;
//!     println!("{} objects", files.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod file;
pub mod models;

mod bucket;
mod http;
mod progress;
mod resumable;

// Re-export commonly used types
pub use cache::UploadUrlCache;
pub use client::StorageClient;
pub use config::ClientOptions;
pub use error::{FailureReason, StorageError};
pub use file::FileApi;
pub use models::{
    Bucket, BucketUpsertOptions, DestinationOptions, DownloadOptions, FileObject, FileObjectV2,
    FileOptions, ResizeMode, SearchOptions, SortBy, TransformOptions, UploadSignedUrl,
};
pub use progress::ProgressCallback;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
