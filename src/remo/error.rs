//! Errors returned by the local API client

use thiserror::Error;

/// Result type for local API operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to a device
#[derive(Error, Debug)]
pub enum Error {
    /// Connection failed or broke mid-exchange
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Device answered with something other than 200
    #[error("device rejected request: {status} {status_text}")]
    Device { status: u16, status_text: String },

    /// Response body is not a signal record
    #[error("malformed signal from device: {0}")]
    Decode(#[source] serde_json::Error),

    /// Signal could not be serialized
    #[error("failed to encode signal: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Flat classification of [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Device,
    Decode,
    Encode,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(_) => ErrorKind::Transport,
            Error::Device { .. } => ErrorKind::Device,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Encode(_) => ErrorKind::Encode,
        }
    }

    /// HTTP status of a device rejection
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Device { status, .. } => Some(*status),
            _ => None,
        }
    }
}
