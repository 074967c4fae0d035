//! Error types for AirGuard collectors
//!
//! [`CollectorError`] describes what went wrong at the transport level.
//! [`ErrorKind`] buckets those causes into the categories callers act on.

use std::fmt;
use thiserror::Error;

/// Result type alias for collector operations
pub type Result<T> = std::result::Result<T, CollectorError>;

/// Caller-facing category of a collection failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote endpoint could not be contacted in time
    DeviceUnreachable,
    /// Contact succeeded but no usable data was produced
    DeviceDataUnavailable,
    /// A response arrived but could not be decoded
    MalformedResponse,
}

impl ErrorKind {
    /// Stable snake_case code
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::DeviceUnreachable => "device_unreachable",
            ErrorKind::DeviceDataUnavailable => "device_data_unavailable",
            ErrorKind::MalformedResponse => "malformed_response",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Errors raised by collectors and their transports
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CollectorError {
    /// Endpoint could not be contacted (connect/resolve/send failure)
    #[error("Unreachable: {reason}")]
    Unreachable { reason: String },

    /// No response within the deadline, after all attempts
    ///
    /// `attempts` counts the tries made by the layer whose deadline expired.
    /// An overall gateway deadline reports a single attempt, whatever the
    /// collector retried before it fired.
    #[error("Timeout after {timeout_ms}ms ({attempts} attempt(s))")]
    Timeout { timeout_ms: u64, attempts: u32 },

    /// LoRaWAN device has no active session on the network server
    #[error("Device not joined")]
    NotJoined,

    /// Contact succeeded but nothing usable arrived
    #[error("No data: {reason}")]
    NoData { reason: String },

    /// SNMP agent does not expose the requested object
    #[error("Object identifier not supported: {oid}")]
    UnsupportedOid { oid: String },

    /// Response could not be decoded into the expected metrics
    #[error("Malformed response: {reason}")]
    Malformed { reason: String },
}

impl CollectorError {
    /// Shorthand for [`CollectorError::Unreachable`]
    pub fn unreachable(reason: impl Into<String>) -> Self {
        Self::Unreachable {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CollectorError::NoData`]
    pub fn no_data(reason: impl Into<String>) -> Self {
        Self::NoData {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`CollectorError::Malformed`]
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::NotJoined => {
                ErrorKind::DeviceUnreachable
            }
            Self::NoData { .. } | Self::UnsupportedOid { .. } => ErrorKind::DeviceDataUnavailable,
            Self::Malformed { .. } => ErrorKind::MalformedResponse,
        }
    }

    /// Whether this is a transport timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
