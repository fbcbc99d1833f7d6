//! shadowsync - mirror contribution history onto GitHub
//!
//! Pulls the commits a given identity authored on Bitbucket Cloud or Azure
//! DevOps and records their hashes, one destination commit per hash, in a
//! private "shadow" repository on GitHub. Only hashes and dates leave the
//! source host.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`config`] - Flag / environment / config file resolution
//! - [`http`] - Request executor and uniform failure type
//! - [`source`] - Bitbucket and Azure DevOps pullers
//! - [`destination`] - GitHub tree/blob/commit/ref client and shadow repository
//! - [`sync`] - Reconciliation orchestrator and pull files
//! - [`model`] - Data types (CommitRecord, RepositorySyncUnit, TreeDelta)
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod destination;
pub mod error;
pub mod http;
pub mod model;
pub mod source;
pub mod sync;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};

/// Global quiet flag for `--quiet`.
///
/// When set, commands print nothing but errors. Avoids threading a `quiet`
/// bool through every handler signature.
pub static QUIET: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if quiet mode is active.
#[inline]
pub fn is_quiet() -> bool {
    QUIET.load(std::sync::atomic::Ordering::Relaxed)
}
