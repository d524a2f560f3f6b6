//! CLI command handlers. Each command is in its own file.

mod access;
mod classify;
mod revoke;

pub use access::run_access;
pub use classify::{run_classify, TransportKind};
#[cfg(test)]
pub(crate) use classify::synthetic_error;
pub use revoke::run_revoke;
