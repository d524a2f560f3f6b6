//! Retry classification and policy.
//!
//! This module decides which remote failures are transient (rate limiting,
//! backend and gateway errors, broken connections) and bundles that decision
//! with a deadline into a [`RetryPolicy`]. Scheduling the retries is left to
//! the `backon` engine; [`call_with_retry`] only wires the policy into it.

mod classify;
mod error;
mod policy;
mod run;

pub use classify::{
    classify_curl_error, is_retryable_kind, is_retryable_reason, should_retry, RETRYABLE_KINDS,
    RETRYABLE_REASONS,
};
pub use error::{CallError, ClassifyError, ErrorDetails, ErrorKind, RemoteError, SubError};
pub use policy::{RetryPolicy, RetryPredicate, DEFAULT_RETRY};
pub use run::call_with_retry;
