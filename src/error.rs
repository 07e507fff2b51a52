//! Error taxonomy surfaced by the request pipeline.

use std::time::Duration;

use thiserror::Error;

use crate::http::ErrorEnvelope;

/// Kind of a transport-level failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportErrorKind {
    /// Could not establish a connection (DNS, refused, TLS handshake).
    Connect,
    /// The request could not be written.
    Request,
    /// The response body could not be read.
    Body,
    /// Anything the HTTP client does not classify.
    Other,
}

/// A failure below HTTP: the exchange never produced a status code.
#[derive(Debug, Clone, Error)]
#[error("{kind:?} failure: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether the failure happened before the server saw the request.
    pub fn is_connection_level(&self) -> bool {
        self.kind == TransportErrorKind::Connect
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_connect() {
            TransportErrorKind::Connect
        } else if err.is_body() || err.is_decode() {
            TransportErrorKind::Body
        } else if err.is_request() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Other
        };
        Self::new(kind, err.to_string())
    }
}

/// Errors returned to callers of the pipeline.
#[derive(Debug, Error)]
pub enum DocDbError {
    /// DNS, connect, TLS or body failure.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The per-attempt deadline expired before a response arrived.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The caller's cancellation signal fired.
    #[error("request cancelled by caller")]
    Cancelled,

    /// The service answered with status >= 400.
    #[error("{0}")]
    Service(ErrorEnvelope),

    /// No usable credential, or the token provider failed.
    #[error("authorization error: {0}")]
    Auth(String),

    /// A request body or response body was not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid client configuration (bad endpoint URL, HTTP client build failure).
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for pipeline operations.
pub type DocDbResult<T> = Result<T, DocDbError>;

impl DocDbError {
    /// HTTP status code for service errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            DocDbError::Service(envelope) => Some(envelope.code),
            _ => None,
        }
    }

    pub fn sub_status(&self) -> Option<u32> {
        match self {
            DocDbError::Service(envelope) => envelope.sub_status,
            _ => None,
        }
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            DocDbError::Service(envelope) => envelope.retry_after_ms.map(Duration::from_millis),
            _ => None,
        }
    }

    pub fn activity_id(&self) -> Option<&str> {
        match self {
            DocDbError::Service(envelope) => envelope.activity_id.as_deref(),
            _ => None,
        }
    }

    /// Errors no retry strategy may ever absorb.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocDbError::Cancelled
                | DocDbError::Auth(_)
                | DocDbError::Serialization(_)
                | DocDbError::Config(_)
        )
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DocDbError::Transport(_) => "transport",
            DocDbError::Timeout(_) => "timeout",
            DocDbError::Cancelled => "cancelled",
            DocDbError::Service(_) => "service",
            DocDbError::Auth(_) => "auth",
            DocDbError::Serialization(_) => "serialization",
            DocDbError::Config(_) => "config",
        }
    }
}
