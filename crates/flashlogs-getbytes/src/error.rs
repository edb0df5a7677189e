//! Error types for GetBytes operations

use flashlogs_core::{GetBytesErrorCode, ReadError};
use thiserror::Error;

/// GetBytes client errors
#[derive(Debug, Error)]
pub enum GetBytesError {
    /// Failed to connect to the watch or emulator
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// I/O error during communication
    #[error("I/O error: {0}")]
    IoError(String),

    /// Timeout during communication
    #[error("Communication timeout")]
    Timeout,

    /// Serial framing was violated (bad footer, oversized frame)
    #[error("Framing error: {0}")]
    Framing(String),

    /// A packet was too short or carried an unknown layout
    #[error("Malformed packet: {0}")]
    Malformed(String),

    /// The watch refused the request
    #[error("Device returned error: {0}")]
    Device(GetBytesErrorCode),

    /// Invalid parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Serial port error
    #[error("Serial port error: {0}")]
    SerialError(#[from] serialport::Error),
}

/// Result type for GetBytes operations
pub type Result<T> = core::result::Result<T, GetBytesError>;

impl From<std::io::Error> for GetBytesError {
    fn from(e: std::io::Error) -> Self {
        match e.kind() {
            std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock => GetBytesError::Timeout,
            std::io::ErrorKind::UnexpectedEof => {
                GetBytesError::ConnectionFailed("connection closed by peer".into())
            }
            _ => GetBytesError::IoError(e.to_string()),
        }
    }
}

impl From<GetBytesError> for ReadError {
    fn from(e: GetBytesError) -> Self {
        match e {
            GetBytesError::Device(code) => ReadError::Device(code),
            GetBytesError::Timeout => ReadError::Timeout,
            GetBytesError::Framing(msg) | GetBytesError::Malformed(msg) => {
                ReadError::Protocol(msg)
            }
            other => ReadError::Transport(other.to_string()),
        }
    }
}
