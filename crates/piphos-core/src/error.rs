//! Error types for piphos
//!
//! Every failure in the core is a variant of [`Error`]. Callers that need to
//! branch on the failure class use [`Error::kind`] instead of matching on
//! messages.

use thiserror::Error;

/// Result type alias for piphos operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed underlying cause carried by transport failures
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Characters of a rejected IP candidate kept in [`Error::InvalidIp`]
pub const INVALID_IP_PREVIEW: usize = 64;

/// Core error type for piphos
#[derive(Error, Debug)]
pub enum Error {
    /// DNS, connect, timeout or other transport failure. Never retried.
    #[error("{target} is unreachable: {message}")]
    Unreachable {
        /// Beacon or tender name
        target: String,
        /// Human readable description
        message: String,
        /// Underlying cause, if any
        #[source]
        source: Option<BoxError>,
    },

    /// A beacon answered outside the 2xx range
    #[error("{target} responded with status {status}")]
    BadStatus {
        /// Beacon name
        target: String,
        /// HTTP status code
        status: u16,
    },

    /// A tender answered with a status other than the one expected for the call
    #[error("{target} responded with status {status} (expected {expected})")]
    UnexpectedStatus {
        /// Tender name
        target: String,
        /// HTTP status code received
        status: u16,
        /// HTTP status code expected
        expected: u16,
    },

    /// Response body exceeded the configured bound
    #[error("response from {target} exceeded {limit} bytes")]
    ResponseTooLarge {
        /// Beacon or tender name
        target: String,
        /// Maximum accepted body size in bytes
        limit: usize,
    },

    /// Payload is not a valid IPv4 or IPv6 literal
    #[error("invalid IP address format: {0:?}")]
    InvalidIp(String),

    /// Remote record exists but its content could not be used
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// Pull found no record carrying the sentinel description
    #[error("no record with description {0:?} found")]
    NoRecord(String),

    /// Create or update was refused by the tender
    #[error("{target} rejected the write with status {status}")]
    RemoteRejected {
        /// Tender name
        target: String,
        /// HTTP status code
        status: u16,
    },

    /// Credential missing or empty; raised before any network call
    #[error("missing credential: {0}")]
    MissingCredential(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Record-id store errors
    #[error("State store error: {0}")]
    StateStore(String),

    /// The operation was interrupted by the caller
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`Error`] values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unreachable,
    BadStatus,
    UnexpectedStatus,
    ResponseTooLarge,
    InvalidIp,
    MalformedRecord,
    NoRecord,
    RemoteRejected,
    MissingCredential,
    Config,
    StateStore,
    Cancelled,
    Serialization,
    Io,
}

impl Error {
    /// Create an unreachable error without an underlying cause
    pub fn unreachable(target: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            target: target.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Create an unreachable error wrapping its cause
    pub fn unreachable_with<E>(target: impl Into<String>, message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unreachable {
            target: target.into(),
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a bad status error (beacon range check)
    pub fn bad_status(target: impl Into<String>, status: u16) -> Self {
        Self::BadStatus {
            target: target.into(),
            status,
        }
    }

    /// Create an unexpected status error (tender exact-match check)
    pub fn unexpected_status(target: impl Into<String>, status: u16, expected: u16) -> Self {
        Self::UnexpectedStatus {
            target: target.into(),
            status,
            expected,
        }
    }

    /// Create a response-too-large error
    pub fn too_large(target: impl Into<String>, limit: usize) -> Self {
        Self::ResponseTooLarge {
            target: target.into(),
            limit,
        }
    }

    /// Create an invalid IP error, keeping at most [`INVALID_IP_PREVIEW`] chars of `raw`
    pub fn invalid_ip(raw: impl Into<String>) -> Self {
        let mut raw = raw.into();
        if let Some((cut, _)) = raw.char_indices().nth(INVALID_IP_PREVIEW) {
            raw.truncate(cut);
            raw.push_str("...");
        }
        Self::InvalidIp(raw)
    }

    /// Create a malformed record error
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRecord(msg.into())
    }

    /// Create a "no record" error
    pub fn no_record(sentinel: impl Into<String>) -> Self {
        Self::NoRecord(sentinel.into())
    }

    /// Create a remote-rejected error
    pub fn rejected(target: impl Into<String>, status: u16) -> Self {
        Self::RemoteRejected {
            target: target.into(),
            status,
        }
    }

    /// Create a missing credential error
    pub fn missing_credential(msg: impl Into<String>) -> Self {
        Self::MissingCredential(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a state store error
    pub fn state_store(msg: impl Into<String>) -> Self {
        Self::StateStore(msg.into())
    }

    /// Create a cancellation error
    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::BadStatus { .. } => ErrorKind::BadStatus,
            Self::UnexpectedStatus { .. } => ErrorKind::UnexpectedStatus,
            Self::ResponseTooLarge { .. } => ErrorKind::ResponseTooLarge,
            Self::InvalidIp(_) => ErrorKind::InvalidIp,
            Self::MalformedRecord(_) => ErrorKind::MalformedRecord,
            Self::NoRecord(_) => ErrorKind::NoRecord,
            Self::RemoteRejected { .. } => ErrorKind::RemoteRejected,
            Self::MissingCredential(_) => ErrorKind::MissingCredential,
            Self::Config(_) => ErrorKind::Config,
            Self::StateStore(_) => ErrorKind::StateStore,
            Self::Cancelled(_) => ErrorKind::Cancelled,
            Self::Json(_) => ErrorKind::Serialization,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// True for errors caused by local configuration rather than the network
    pub fn is_configuration(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::MissingCredential | ErrorKind::Config | ErrorKind::InvalidIp
        )
    }

    /// HTTP status code carried by this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::BadStatus { status, .. }
            | Self::UnexpectedStatus { status, .. }
            | Self::RemoteRejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}
