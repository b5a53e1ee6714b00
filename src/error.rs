//! Crate-wide error type.
//!
//! Every fallible operation in this crate returns [`Result<T>`], a thin
//! alias over `std::result::Result<T, Error>`. There is no panicking
//! fallback path in non-test code: allocation failure, format
//! incompatibility, and misuse are all values, not process aborts.

use thiserror::Error;

/// The single error type surfaced by every public operation.
///
/// Each variant corresponds 1:1 to an `ErrorKind` of the core design:
/// `Oom`, `Full`, `IncompatibleFormat`, `Misconfiguration`, `NotFound`,
/// `DuplicateKey`, `Immutable`, `IoError`.
#[derive(Debug, Error)]
pub enum Error {
    /// The allocator refused a request; the index is unchanged.
    #[error("allocation failed (requested {requested} bytes)")]
    Oom {
        /// Bytes requested when the allocation failed.
        requested: usize,
    },

    /// No capacity remains and auto-grow is disabled.
    #[error("index is full (capacity {capacity}, auto-grow disabled)")]
    Full {
        /// Capacity at the time of the failed insert.
        capacity: usize,
    },

    /// A loaded or viewed file's header does not match this build.
    #[error("incompatible format: {reason}")]
    IncompatibleFormat {
        /// Human-readable mismatch description (magic, version, dims, kind).
        reason: String,
    },

    /// Index configuration is invalid (no kernel, bad thread id, dim 0).
    #[error("misconfiguration: {reason}")]
    Misconfiguration {
        /// Description of the invalid configuration.
        reason: String,
    },

    /// `remove`/`get` referenced a key that is not present.
    #[error("key not found")]
    NotFound,

    /// Single-vector mode with reject policy saw a duplicate key.
    #[error("duplicate key under reject policy")]
    DuplicateKey,

    /// A mutating operation was attempted on a view-mode index.
    #[error("index is immutable (view mode)")]
    Immutable,

    /// The underlying reader/writer failed.
    #[error("i/o error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// A short, stable tag for the error kind, suitable for metrics labels.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Oom { .. } => "OOM",
            Self::Full { .. } => "FULL",
            Self::IncompatibleFormat { .. } => "INCOMPATIBLE_FORMAT",
            Self::Misconfiguration { .. } => "MISCONFIGURATION",
            Self::NotFound => "NOT_FOUND",
            Self::DuplicateKey => "DUPLICATE_KEY",
            Self::Immutable => "IMMUTABLE",
            Self::IoError(_) => "IO_ERROR",
        }
    }

    /// Whether a caller can reasonably retry or work around this error
    /// without rebuilding the index from scratch.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::IncompatibleFormat { .. } | Self::IoError(_))
    }

    pub(crate) fn misconfiguration(reason: impl Into<String>) -> Self {
        Self::Misconfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn incompatible_format(reason: impl Into<String>) -> Self {
        Self::IncompatibleFormat {
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
