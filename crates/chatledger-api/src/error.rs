//! Error types for remote API operations.

/// Result type alias for remote API operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur talking to the remote API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unexpected status on a single-lookup endpoint.
    ///
    /// Paging endpoints never produce this: there a non-200 status is
    /// a terminator, not an error.
    #[error("unexpected status {status}")]
    Status {
        /// HTTP status code returned by the server.
        status: u16,
    },

    /// A record in the response is missing a required field.
    #[error("record missing required field: {field}")]
    MissingField {
        /// Name of the missing field.
        field: &'static str,
    },
}
