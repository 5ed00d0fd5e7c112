//! Error types for embedref_core.

use thiserror::Error;

/// Result type alias using embedref_core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by caller-supplied callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while parsing or rewriting embeds.
#[derive(Error, Debug)]
pub enum Error {
    /// The string is not a well-formed data URI.
    #[error("Invalid data URI: {reason}")]
    InvalidDataUri { reason: String },

    /// An upload target was requested without a bucket.
    #[error("\"bucket\" is required")]
    MissingBucket,

    /// Unsupported hash algorithm.
    #[error("Unsupported algorithm: {algorithm}")]
    UnsupportedAlgorithm { algorithm: String },

    /// The caller's `resolve` callback failed for an embed.
    #[error("Failed to resolve embed at {path}: {source}")]
    Resolve { path: String, source: BoxError },

    /// The caller's `sign` callback failed for an embed.
    #[error("Failed to sign embed at {path}: {source}")]
    Sign { path: String, source: BoxError },
}

impl Error {
    /// Create an InvalidDataUri error.
    pub fn invalid_data_uri(reason: impl Into<String>) -> Self {
        Error::InvalidDataUri {
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedAlgorithm error.
    pub fn unsupported_algorithm(algorithm: impl Into<String>) -> Self {
        Error::UnsupportedAlgorithm {
            algorithm: algorithm.into(),
        }
    }

    /// Create a Resolve error from a callback failure.
    pub fn resolve(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Resolve {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Create a Sign error from a callback failure.
    pub fn sign(path: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Error::Sign {
            path: path.into(),
            source: source.into(),
        }
    }
}
