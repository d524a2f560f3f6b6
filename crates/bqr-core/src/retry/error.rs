//! Remote error shapes consumed by the retry classifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Concrete category of a failed remote call.
///
/// Derived from the HTTP status for API errors and from the curl error for
/// transport failures. The set is closed so classification is a plain `match`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Established connection broke (reset, aborted, nothing received).
    ConnectionFailure,
    /// HTTP 429.
    TooManyRequests,
    /// HTTP 500.
    InternalServerError,
    /// HTTP 502.
    BadGateway,
    /// Response body ended early or could not be decoded by the transport.
    ChunkedEncoding,
    /// Could not connect to, or resolve, the remote host.
    Connection,
    /// TLS handshake or credential transport failure.
    Transport,
    /// HTTP 400.
    BadRequest,
    /// HTTP 401.
    Unauthorized,
    /// HTTP 403.
    PermissionDenied,
    /// HTTP 404.
    NotFound,
    /// HTTP 409.
    Conflict,
    /// HTTP 412 (etag mismatch on update).
    PreconditionFailed,
    /// HTTP 503.
    ServiceUnavailable,
    /// HTTP 504.
    GatewayTimeout,
    /// Any other non-2xx status.
    HttpStatus(u16),
    /// Request exceeded the transport timeout.
    Timeout,
    /// Successful response whose body could not be decoded.
    Decode,
    /// Anything else.
    Other,
}

impl ErrorKind {
    /// Maps a non-2xx HTTP status to its kind.
    pub fn from_http_status(code: u16) -> Self {
        match code {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::PermissionDenied,
            404 => ErrorKind::NotFound,
            409 => ErrorKind::Conflict,
            412 => ErrorKind::PreconditionFailed,
            429 => ErrorKind::TooManyRequests,
            500 => ErrorKind::InternalServerError,
            502 => ErrorKind::BadGateway,
            503 => ErrorKind::ServiceUnavailable,
            504 => ErrorKind::GatewayTimeout,
            other => ErrorKind::HttpStatus(other),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ConnectionFailure => write!(f, "connection failure"),
            ErrorKind::TooManyRequests => write!(f, "HTTP 429 Too Many Requests"),
            ErrorKind::InternalServerError => write!(f, "HTTP 500 Internal Server Error"),
            ErrorKind::BadGateway => write!(f, "HTTP 502 Bad Gateway"),
            ErrorKind::ChunkedEncoding => write!(f, "chunked encoding error"),
            ErrorKind::Connection => write!(f, "connection error"),
            ErrorKind::Transport => write!(f, "transport error"),
            ErrorKind::BadRequest => write!(f, "HTTP 400 Bad Request"),
            ErrorKind::Unauthorized => write!(f, "HTTP 401 Unauthorized"),
            ErrorKind::PermissionDenied => write!(f, "HTTP 403 Forbidden"),
            ErrorKind::NotFound => write!(f, "HTTP 404 Not Found"),
            ErrorKind::Conflict => write!(f, "HTTP 409 Conflict"),
            ErrorKind::PreconditionFailed => write!(f, "HTTP 412 Precondition Failed"),
            ErrorKind::ServiceUnavailable => write!(f, "HTTP 503 Service Unavailable"),
            ErrorKind::GatewayTimeout => write!(f, "HTTP 504 Gateway Timeout"),
            ErrorKind::HttpStatus(code) => write!(f, "HTTP {}", code),
            ErrorKind::Timeout => write!(f, "timed out"),
            ErrorKind::Decode => write!(f, "undecodable response"),
            ErrorKind::Other => write!(f, "error"),
        }
    }
}

/// One entry of the `errors` array in a Google API error envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubError {
    /// Machine-readable reason code, e.g. `rateLimitExceeded`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl SubError {
    pub fn with_reason(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            ..Self::default()
        }
    }
}

/// Whether the error came with a structured sub-error list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorDetails {
    /// Sub-errors in the order the server returned them (may be empty).
    Structured(Vec<SubError>),
    /// No structured payload (transport failure, non-JSON error page).
    Unstructured,
}

/// A failed remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    kind: ErrorKind,
    message: String,
    details: ErrorDetails,
}

impl RemoteError {
    pub fn structured(kind: ErrorKind, message: impl Into<String>, errors: Vec<SubError>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: ErrorDetails::Structured(errors),
        }
    }

    pub fn unstructured(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: ErrorDetails::Unstructured,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    /// Sub-errors, or `None` for unstructured errors.
    pub fn sub_errors(&self) -> Option<&[SubError]> {
        match &self.details {
            ErrorDetails::Structured(errors) => Some(errors),
            ErrorDetails::Unstructured => None,
        }
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl std::error::Error for RemoteError {}

/// The remote error does not have the shape the classifier relies on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassifyError {
    #[error("first sub-error carries no reason code ({kind}: {message})")]
    MissingReason { kind: ErrorKind, message: String },
}

/// Outcome of a call that went through a retry policy.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    /// The last error returned by the remote side, unchanged.
    #[error(transparent)]
    Remote(#[from] RemoteError),
    /// The error could not be classified; it is surfaced instead of being
    /// treated as permanent.
    #[error("malformed remote error: {violation}")]
    Contract {
        violation: ClassifyError,
        #[source]
        source: RemoteError,
    },
}

impl CallError {
    /// The underlying remote error for either variant.
    pub fn remote(&self) -> &RemoteError {
        match self {
            CallError::Remote(e) => e,
            CallError::Contract { source, .. } => source,
        }
    }
}
