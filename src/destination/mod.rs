//! Destination host: the GitHub repository holding the shadow files.
//!
//! - [`GitHubApi`] - one method per REST endpoint
//! - [`ShadowRepository`] - existence check, tracking blob lookup and
//!   reconciliation on top of the API

mod api;
mod repository;

pub use api::{BlobResponse, GitHubApi, TreeEntry};
pub use repository::{ReconcileOutcome, RepositoryStatus, ShadowRepository, decode_blob};
