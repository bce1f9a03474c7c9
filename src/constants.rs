//! Fixed protocol constants: header names, endpoint paths, defaults.

/// HTTP header names with fixed semantics on the storage API.
pub mod headers {
    pub const AUTHORIZATION: &str = "Authorization";
    pub const CACHE_CONTROL: &str = "cache-control";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const UPSERT: &str = "x-upsert";
    pub const METADATA: &str = "x-metadata";
    pub const DUPLEX: &str = "x-duplex";
}

/// API endpoint path segments, relative to the configured base URL.
pub mod endpoints {
    pub const BUCKET: &str = "/bucket";
    pub const OBJECT: &str = "/object";
    pub const OBJECT_PUBLIC: &str = "/object/public";
    pub const OBJECT_SIGN: &str = "/object/sign";
    pub const OBJECT_LIST: &str = "/object/list";
    pub const OBJECT_INFO: &str = "/object/info";
    pub const OBJECT_MOVE: &str = "/object/move";
    pub const OBJECT_COPY: &str = "/object/copy";
    pub const RENDER_IMAGE_AUTHENTICATED: &str = "/render/image/authenticated";
    pub const RENDER_IMAGE_PUBLIC: &str = "/render/image/public";
    pub const UPLOAD_RESUMABLE: &str = "/upload/resumable";
    pub const UPLOAD_SIGN: &str = "/object/upload/sign";
}

/// Default values.
pub mod defaults {
    /// `cache-control: max-age` applied to uploads unless overridden.
    pub const CACHE_CONTROL_MAX_AGE: u32 = 3600;

    /// Resumable upload chunk size (6 MiB).
    pub const UPLOAD_CHUNK_SIZE: usize = 6 * 1024 * 1024;

    /// Read buffer for streamed (non-resumable) upload bodies.
    pub const UPLOAD_BUFFER_SIZE: usize = 4096;
}
