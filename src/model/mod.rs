//! Data models for shadowsync.
//!
//! This module contains all domain models:
//! - CommitRecord / RepositorySyncUnit (pulled from the source host)
//! - RepositoryHead / TreeDelta / Signature (destination tree protocol)

pub mod commit;
pub mod git;

pub use commit::{CommitRecord, RepositorySyncUnit};
pub use git::{RepositoryHead, Signature, TreeDelta};
