//! docparse-client — client library for a remote document-parsing
//! service.
//!
//! The service stores uploaded documents, renders page previews and runs
//! structured extraction against a chosen schema. This crate is the
//! request-orchestration and state-consistency layer in front of it:
//! an authenticated session with a persisted credential, anti-forgery
//! token handling, a transport that injects headers on every call and
//! reacts globally to credential rejection, and per-resource stores that
//! keep a local cache consistent with a sequence of asynchronous,
//! possibly-failing remote operations.

pub mod auth;
pub mod config;
pub mod core;
pub mod models;
pub mod session;
pub mod stores;
pub mod transport;

pub use crate::core::ClientCore;

use tracing_subscriber::EnvFilter;

/// Initialize tracing with `RUST_LOG` or the crate default. Safe to call
/// more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();
}
