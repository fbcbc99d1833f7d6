//! Command implementations.

pub mod completions;
pub mod config;
pub mod pull;
pub mod push;
pub mod version;

use crate::error::{Error, Result};

/// Runtime for the async core; commands block on it.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))
}
