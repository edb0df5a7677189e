//! Error types for flashlogs-core
//!
//! Readers report failures as a tagged [`ReadError`]. A device-side refusal
//! carries the GetBytes error code so callers can match on the variant
//! instead of inspecting strings.

use core::fmt;
use thiserror::Error;

/// Error code carried by a GetBytes info response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GetBytesErrorCode {
    /// Request accepted
    Success,
    /// The watch could not parse the request
    MalformedRequest,
    /// Another GetBytes transfer is already running
    InProgress,
    /// The requested object or flash region is not readable
    ///
    /// Release firmware answers flash reads with this code.
    DoesNotExist,
    /// The requested object exists but failed its integrity check
    Corrupted,
    /// Code not known to this implementation
    Unknown(u8),
}

impl GetBytesErrorCode {
    /// Decode a wire value
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Success,
            1 => Self::MalformedRequest,
            2 => Self::InProgress,
            3 => Self::DoesNotExist,
            4 => Self::Corrupted,
            other => Self::Unknown(other),
        }
    }

    /// Encode to the wire value
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Success => 0,
            Self::MalformedRequest => 1,
            Self::InProgress => 2,
            Self::DoesNotExist => 3,
            Self::Corrupted => 4,
            Self::Unknown(other) => other,
        }
    }

    /// Whether the code reports success
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<u8> for GetBytesErrorCode {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

impl fmt::Display for GetBytesErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::MalformedRequest => write!(f, "malformed request"),
            Self::InProgress => write!(f, "transfer already in progress"),
            Self::DoesNotExist => write!(f, "does not exist"),
            Self::Corrupted => write!(f, "corrupted"),
            Self::Unknown(code) => write!(f, "unknown error code {}", code),
        }
    }
}

/// Failure of a byte-range read
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The device answered the request with an error code
    #[error("device rejected read: {0}")]
    Device(GetBytesErrorCode),

    /// The link to the device failed (disconnect, I/O error)
    #[error("transport error: {0}")]
    Transport(String),

    /// The device did not answer in time
    #[error("timed out waiting for the device")]
    Timeout,

    /// The device answered with something that does not fit the protocol
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The requested range does not fit in the 32-bit address space
    #[error("region 0x{start:08X} + 0x{length:X} is outside the address space")]
    OutOfRange {
        /// Requested start offset
        start: u32,
        /// Requested length
        length: u32,
    },
}

impl ReadError {
    /// The device error code, if the device itself refused the read
    pub fn device_code(&self) -> Option<GetBytesErrorCode> {
        match self {
            Self::Device(code) => Some(*code),
            _ => None,
        }
    }
}

/// Result type alias using [`ReadError`]
pub type Result<T> = core::result::Result<T, ReadError>;
