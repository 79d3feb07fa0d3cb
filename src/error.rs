//! Error types for the REST key-value client

use thiserror::Error;

/// Boxed error returned by an [`HttpTransport`](crate::transport::HttpTransport).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur when talking to the key-value service
#[derive(Error, Debug)]
pub enum Error {
    /// The request body could not be encoded; nothing was sent
    #[error("Unable to marshal request body: {0}")]
    Serialize(#[source] serde_json::Error),

    /// The HTTP request could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// URL parsing error
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Required configuration is missing
    #[error("Configuration error: {0}")]
    Config(String),

    /// The transport failed to perform the request
    #[error("Unable to perform request: {0}")]
    Transport(#[source] BoxError),

    /// Request timeout
    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    /// TLS/SSL error
    #[error("TLS error: {0}")]
    Tls(String),

    /// The service answered with a status outside `200..300`
    #[error("Response returned status code {status}: {body}, path: {path}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Error body, pretty-printed
        body: String,
        /// Request path
        path: String,
    },

    /// The response body did not have the expected JSON shape
    #[error("Unable to decode response body (status {status}): {source}")]
    Decode {
        /// HTTP status code of the undecodable response
        status: u16,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// The service reported an error for the command
    #[error("{0}")]
    Command(String),

    /// The result did not have the shape the caller asked for
    #[error("Cannot coerce {found} result into {expected}")]
    Coercion {
        /// Target type
        expected: &'static str,
        /// Kind of value actually returned
        found: &'static str,
    },
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, Error>;
