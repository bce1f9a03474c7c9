//! Error types for the storage client.
//!
//! Every failure reported by the remote service surfaces as
//! [`StorageError::Server`] carrying a [`FailureReason`] classified once from
//! the HTTP status code and response body. Callers branch on the reason
//! instead of matching status codes or body strings themselves.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classified reason for a server-reported failure.
///
/// Derived deterministically from `(status, body)` at the moment the error is
/// constructed and never recomputed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    Unknown,
    NotAuthorized,
    Internal,
    NotFound,
    AlreadyExists,
    InvalidInput,
}

impl FailureReason {
    /// Classify an HTTP status code plus optional response body text.
    ///
    /// Substring matching is case-insensitive and the rules are evaluated in
    /// order, first match wins. An absent body always yields `Unknown`,
    /// regardless of status code.
    pub fn classify(status: u16, body: Option<&str>) -> Self {
        let Some(body) = body else {
            return FailureReason::Unknown;
        };
        let body = body.to_ascii_lowercase();

        match status {
            400 if body.contains("authorization") => FailureReason::NotAuthorized,
            400 if body.contains("malformed") => FailureReason::NotAuthorized,
            400 if body.contains("invalid signature") => FailureReason::NotAuthorized,
            400 if body.contains("invalid") => FailureReason::InvalidInput,
            401 => FailureReason::NotAuthorized,
            404 if body.contains("not found") => FailureReason::NotFound,
            409 if body.contains("exists") => FailureReason::AlreadyExists,
            500 => FailureReason::Internal,
            _ => FailureReason::Unknown,
        }
    }
}

/// Error body shape returned by the storage service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<u16>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Errors produced by the storage client.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The remote service rejected the request. Carries the frozen
    /// [`FailureReason`] plus the raw status and body for diagnostics.
    #[error("storage service returned {status}: {message}")]
    Server {
        status: u16,
        reason: FailureReason,
        message: String,
        body: Option<String>,
    },

    /// Local misuse of the API (empty cache key, bad argument).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was canceled by the caller. Never produced for a
    /// server-reported failure.
    #[error("operation canceled")]
    Canceled,

    /// A successful response was missing data the contract requires.
    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Network-level failure, propagated unmodified.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Local filesystem failure during a transfer.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Failure serializing a request body or options payload.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl StorageError {
    /// Build a classified server error from a status code and body text.
    ///
    /// If the body parses as the service's [`ErrorResponse`] shape, its
    /// `message` and `statusCode` override the raw HTTP values.
    pub fn from_response(status: u16, body: String) -> Self {
        let parsed: Option<ErrorResponse> = serde_json::from_str(&body).ok();

        let effective_status = parsed
            .as_ref()
            .and_then(|e| e.status_code)
            .unwrap_or(status);
        let message = parsed
            .as_ref()
            .and_then(|e| e.message.clone())
            .unwrap_or_else(|| body.clone());

        StorageError::Server {
            status: effective_status,
            reason: FailureReason::classify(effective_status, Some(&body)),
            message,
            body: Some(body),
        }
    }

    /// The classified reason, when this is a server-reported failure.
    pub fn reason(&self) -> Option<FailureReason> {
        match self {
            StorageError::Server { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    /// True when the classified reason is [`FailureReason::NotFound`].
    pub fn is_not_found(&self) -> bool {
        self.reason() == Some(FailureReason::NotFound)
    }
}
