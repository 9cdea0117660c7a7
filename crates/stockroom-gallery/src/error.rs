//! Error types for the gallery client.

use thiserror::Error;

/// Errors that can occur while talking to the gallery web service.
#[derive(Error, Debug)]
pub enum GalleryError {
    /// Network-level failure (connect, TLS, timeout, body read)
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status
    #[error("HTTP {status} from gallery: {body}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Leading part of the response body
        body: String,
    },

    /// The service answered `stat: fail`
    #[error("{method} failed: {code} {message}")]
    Protocol {
        /// API method that was called
        method: String,
        /// Error code reported by the service
        code: String,
        /// Error message reported by the service
        message: String,
    },

    /// Response body was not the expected structure
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Client could not be built from the given settings
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    /// Reading the file to upload failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for gallery operations.
pub type Result<T> = std::result::Result<T, GalleryError>;
