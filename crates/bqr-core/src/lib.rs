pub mod config;
pub mod logging;

pub mod access;
pub mod client;
pub mod retry;
