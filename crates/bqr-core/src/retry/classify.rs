//! Classify remote errors into retry decisions.

use crate::retry::error::{ClassifyError, ErrorKind, RemoteError};

/// Reason codes the API uses for transient failures.
pub const RETRYABLE_REASONS: [&str; 4] = [
    "rateLimitExceeded",
    "backendError",
    "internalError",
    "badGateway",
];

/// Kinds retried when the error carries no structured reason.
pub const RETRYABLE_KINDS: [ErrorKind; 7] = [
    ErrorKind::ConnectionFailure,
    ErrorKind::TooManyRequests,
    ErrorKind::InternalServerError,
    ErrorKind::BadGateway,
    ErrorKind::ChunkedEncoding,
    ErrorKind::Connection,
    ErrorKind::Transport,
];

pub fn is_retryable_reason(reason: &str) -> bool {
    RETRYABLE_REASONS.contains(&reason)
}

pub fn is_retryable_kind(kind: ErrorKind) -> bool {
    RETRYABLE_KINDS.contains(&kind)
}

/// Decides whether the call that produced `err` may be retried.
///
/// Only the first sub-error's reason is consulted. Errors without sub-errors
/// (unstructured, or an empty list) are classified by kind. A first sub-error
/// without a reason is reported as [`ClassifyError::MissingReason`].
pub fn should_retry(err: &RemoteError) -> Result<bool, ClassifyError> {
    match err.sub_errors() {
        Some([first, ..]) => match first.reason.as_deref() {
            Some(reason) => Ok(is_retryable_reason(reason)),
            None => Err(ClassifyError::MissingReason {
                kind: err.kind(),
                message: err.message().to_string(),
            }),
        },
        _ => Ok(is_retryable_kind(err.kind())),
    }
}

/// Classify a curl error into an error kind.
pub fn classify_curl_error(e: &curl::Error) -> ErrorKind {
    if e.is_operation_timedout() {
        return ErrorKind::Timeout;
    }
    if e.is_couldnt_connect() || e.is_couldnt_resolve_host() || e.is_couldnt_resolve_proxy() {
        return ErrorKind::Connection;
    }
    if e.is_recv_error() || e.is_send_error() || e.is_got_nothing() || e.is_read_error() {
        return ErrorKind::ConnectionFailure;
    }
    if e.is_partial_file() || e.is_bad_content_encoding() {
        return ErrorKind::ChunkedEncoding;
    }
    if e.is_ssl_connect_error() {
        return ErrorKind::Transport;
    }
    ErrorKind::Other
}
