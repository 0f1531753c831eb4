//! Error taxonomy shared across the flake model, storage, indexing, GC, and
//! query layers. One variant per failure kind from the design's error
//! taxonomy; callers that only care about the coarse kind should match on
//! [`Error::kind`] rather than the variant itself.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Coarse failure kind, surfaced to embedding callers (connect/query/commit
/// APIs) that don't want to match on the full [`Error`] enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidQuery,
    InvalidTransaction,
    NotFound,
    Conflict,
    PermissionDenied,
    CartesianProductTooLarge,
    Unavailable,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::InvalidQuery => "invalid-query",
            ErrorKind::InvalidTransaction => "invalid-transaction",
            ErrorKind::NotFound => "not-found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::PermissionDenied => "permission-denied",
            ErrorKind::CartesianProductTooLarge => "cartesian-product-too-large",
            ErrorKind::Unavailable => "unavailable",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", s)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("validation: {message}")]
    Validation { message: String },

    #[error("consistency: {message}")]
    Consistency { message: String },

    #[error(
        "cartesian product too large: {left} x {right} estimated {estimated_size} > max {max_allowed}"
    )]
    CartesianTooLarge {
        left: String,
        right: String,
        estimated_size: u64,
        max_allowed: u64,
    },

    #[error("cancelled")]
    Cancelled,

    #[error("deadline exceeded")]
    DeadlineExceeded,

    #[error("storage address not found: {address}")]
    StorageNotFound { address: String },

    #[error("transient storage error: {message}")]
    StorageTransient { message: String },

    #[error("permanent storage error: {message}")]
    StoragePermanent { message: String },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("integrity: {message}")]
    Integrity { message: String },

    #[error("internal error: {message}")]
    Internal { message: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation { .. } => ErrorKind::InvalidQuery,
            Error::Consistency { .. } => ErrorKind::Conflict,
            Error::CartesianTooLarge { .. } => ErrorKind::CartesianProductTooLarge,
            Error::Cancelled | Error::DeadlineExceeded => ErrorKind::Unavailable,
            Error::StorageNotFound { .. } => ErrorKind::NotFound,
            Error::StorageTransient { .. } | Error::StoragePermanent { .. } => {
                ErrorKind::Unavailable
            }
            Error::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Error::Integrity { .. } | Error::Internal { .. } => ErrorKind::Internal,
            Error::Json(_) | Error::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn validation<S: Into<String>>(message: S) -> Error {
        Error::Validation {
            message: message.into(),
        }
    }

    pub fn consistency<S: Into<String>>(message: S) -> Error {
        Error::Consistency {
            message: message.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Error {
        Error::Internal {
            message: message.into(),
        }
    }

    pub fn cartesian_too_large<S: Into<String>>(
        left: S,
        right: S,
        estimated_size: u64,
        max_allowed: u64,
    ) -> Error {
        Error::CartesianTooLarge {
            left: left.into(),
            right: right.into(),
            estimated_size,
            max_allowed,
        }
    }
}

/// Shorthand in the spirit of `rdms`'s `err_at!` macro, without the
/// file/line capture (this crate uses `tracing` spans for that context
/// instead).
macro_rules! bail_validation {
    ($($arg:tt)*) => {
        return Err($crate::error::Error::validation(format!($($arg)*)))
    };
}

pub(crate) use bail_validation;
