//! `bqr classify` – show the retry decision for a synthetic error.

use anyhow::Result;
use bqr_core::retry::{should_retry, ErrorKind, RemoteError, SubError};
use clap::ValueEnum;

/// Failures that happen before any HTTP response arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportKind {
    ConnectionFailure,
    ChunkedEncoding,
    Connection,
    Transport,
    Timeout,
}

impl From<TransportKind> for ErrorKind {
    fn from(kind: TransportKind) -> Self {
        match kind {
            TransportKind::ConnectionFailure => ErrorKind::ConnectionFailure,
            TransportKind::ChunkedEncoding => ErrorKind::ChunkedEncoding,
            TransportKind::Connection => ErrorKind::Connection,
            TransportKind::Transport => ErrorKind::Transport,
            TransportKind::Timeout => ErrorKind::Timeout,
        }
    }
}

/// Builds the error described by the flags: structured when reasons are
/// given, unstructured otherwise.
pub(crate) fn synthetic_error(
    status: Option<u16>,
    transport: Option<TransportKind>,
    reasons: &[String],
) -> RemoteError {
    let kind = match (status, transport) {
        (Some(code), _) => ErrorKind::from_http_status(code),
        (None, Some(t)) => t.into(),
        (None, None) => ErrorKind::Other,
    };
    if reasons.is_empty() {
        RemoteError::unstructured(kind, "")
    } else {
        let errors = reasons.iter().map(SubError::with_reason).collect();
        RemoteError::structured(kind, "", errors)
    }
}

pub fn run_classify(
    status: Option<u16>,
    transport: Option<TransportKind>,
    reasons: &[String],
) -> Result<()> {
    let err = synthetic_error(status, transport, reasons);
    let retry = should_retry(&err)?;
    println!("{}: {}", err, if retry { "retry" } else { "no retry" });
    Ok(())
}
