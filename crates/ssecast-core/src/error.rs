//! Shared error type across ssecast crates.

use thiserror::Error;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input (missing or empty client id, bad config value).
    BadRequest,
    /// Client id already registered.
    Conflict,
    /// Transport cannot flush partial output.
    StreamingUnsupported,
    /// Broker loop is no longer running.
    Unavailable,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::Conflict => "CONFLICT",
            ClientCode::StreamingUnsupported => "STREAMING_UNSUPPORTED",
            ClientCode::Unavailable => "UNAVAILABLE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, SseCastError>;

/// Unified error type used by core and gateway.
#[derive(Debug, Error)]
pub enum SseCastError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("client id already registered: {0}")]
    Conflict(String),
    #[error("streaming unsupported")]
    StreamingUnsupported,
    #[error("broker closed")]
    BrokerClosed,
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl SseCastError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            SseCastError::BadRequest(_) => ClientCode::BadRequest,
            SseCastError::Conflict(_) => ClientCode::Conflict,
            SseCastError::StreamingUnsupported => ClientCode::StreamingUnsupported,
            SseCastError::BrokerClosed => ClientCode::Unavailable,
            SseCastError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            SseCastError::Internal(_) => ClientCode::Internal,
        }
    }
}
