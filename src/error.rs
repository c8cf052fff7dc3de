//! Error types for remote calls and the browse layer.
//!
//! [`RemoteError`] is what a storage backend returns: a message plus a cause
//! classification. [`BrowseError`] is what consumers of the listing layer see.

use thiserror::Error;

/// Cause classification for a failed remote call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    Unauthorized,
    Forbidden,
    NotFound,
    RateLimited,
    Network,
    /// HTTP 400, e.g. an invalid continuation token
    BadRequest,
    Unknown,
}

impl RemoteErrorKind {
    /// Classify from an HTTP status and an optional S3 error code.
    ///
    /// The error code wins when it is one we recognise, since some
    /// S3-compatible stores return generic statuses with precise codes.
    pub fn from_status(status: u16, code: Option<&str>) -> Self {
        match code {
            Some("NoSuchBucket" | "NoSuchKey" | "NotFound") => return RemoteErrorKind::NotFound,
            Some("AccessDenied" | "AllAccessDisabled") => return RemoteErrorKind::Forbidden,
            Some("InvalidAccessKeyId" | "SignatureDoesNotMatch" | "ExpiredToken") => {
                return RemoteErrorKind::Unauthorized;
            }
            Some("SlowDown" | "Throttling" | "TooManyRequests") => {
                return RemoteErrorKind::RateLimited;
            }
            Some("InvalidArgument" | "InvalidToken") => return RemoteErrorKind::BadRequest,
            _ => {}
        }

        match status {
            400 => RemoteErrorKind::BadRequest,
            401 => RemoteErrorKind::Unauthorized,
            403 => RemoteErrorKind::Forbidden,
            404 => RemoteErrorKind::NotFound,
            429 | 503 => RemoteErrorKind::RateLimited,
            502 | 504 => RemoteErrorKind::Network,
            _ => RemoteErrorKind::Unknown,
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RemoteErrorKind::Unauthorized => "unauthorized",
            RemoteErrorKind::Forbidden => "forbidden",
            RemoteErrorKind::NotFound => "not found",
            RemoteErrorKind::RateLimited => "rate limited",
            RemoteErrorKind::Network => "network",
            RemoteErrorKind::BadRequest => "bad request",
            RemoteErrorKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Failure of a single remote call
#[derive(Debug, Clone, Error)]
#[error("{kind} error: {message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        RemoteError {
            kind,
            message: message.into(),
        }
    }
}

/// Errors surfaced to the tree and filesystem consumers
#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("storage endpoint unavailable ({0}); try again")]
    RemoteUnavailable(RemoteError),

    #[error("access denied ({0}); check the configured credentials and provider")]
    AuthFailure(RemoteError),

    #[error("s3://{bucket}/{prefix} does not exist")]
    NotFound { bucket: String, prefix: String },

    #[error("continuation token for s3://{bucket}/{prefix} is no longer valid; listing was reloaded")]
    MalformedContinuationToken { bucket: String, prefix: String },

    #[error(transparent)]
    Remote(RemoteError),

    #[error("operation cancelled after {completed} of {total} items")]
    Cancelled { completed: usize, total: usize },

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not a directory: {0}")]
    NotADirectory(String),

    #[error("is a directory: {0}")]
    IsADirectory(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BrowseError {
    /// Map a remote failure for `(bucket, prefix)` into the browse taxonomy
    pub fn from_remote(err: RemoteError, bucket: &str, prefix: &str) -> Self {
        match err.kind {
            RemoteErrorKind::Network | RemoteErrorKind::RateLimited => {
                BrowseError::RemoteUnavailable(err)
            }
            RemoteErrorKind::Unauthorized | RemoteErrorKind::Forbidden => {
                BrowseError::AuthFailure(err)
            }
            RemoteErrorKind::NotFound => BrowseError::NotFound {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            },
            RemoteErrorKind::BadRequest | RemoteErrorKind::Unknown => BrowseError::Remote(err),
        }
    }

    /// Whether retrying the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, BrowseError::RemoteUnavailable(_))
    }
}

pub type Result<T, E = BrowseError> = std::result::Result<T, E>;
