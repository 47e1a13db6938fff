//! Error type shared by storage, configuration and the backend client.
//!
//! The aggregator itself never fails; these only cover I/O around it.

/// Errors raised outside the aggregator core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The platform config/data directories could not be resolved (usually a
    /// missing `$HOME` on Unix or `%APPDATA%` on Windows).
    #[error("failed to obtain user's directories")]
    DirectoriesNotFound,
    /// Reading or writing a file on disk failed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A file or payload could not be (de)serialized.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The HTTP request failed or returned a non-success status.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The configured API base could not be turned into an endpoint URL.
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),
    /// An endpoint answered with something other than a JSON array.
    #[error("{endpoint} returned a non-array payload")]
    UnexpectedPayload { endpoint: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;
