//! Report and progress types for a sync run.

use serde::Serialize;

use crate::destination::RepositoryStatus;
use crate::error::{Error, Result};
use crate::sync::hash::ShadowNaming;

/// Progress notifications emitted while a run is in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Reconciliation of `repo` is starting (`index` is 1-based).
    Started {
        repo: String,
        index: usize,
        total: usize,
    },
    /// `count` new hashes were recorded for `repo`.
    Recorded { repo: String, count: usize },
    /// Every pulled hash of `repo` was already recorded.
    UpToDate { repo: String },
    /// Reconciliation of `repo` stopped early.
    Failed { repo: String, error: String },
}

/// Outcome of one source repository.
#[derive(Debug, Clone, Serialize)]
pub struct RepoOutcome {
    pub repo: String,
    /// Path of the shadow file in the destination tree.
    pub path: String,
    pub pulled: usize,
    pub recorded: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepoOutcome {
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Outcome of a whole run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub repository: String,
    pub repository_status: RepositoryStatus,
    pub naming: ShadowNaming,
    pub dry_run: bool,
    pub outcomes: Vec<RepoOutcome>,
}

impl SyncReport {
    /// Hashes recorded across all repositories.
    #[must_use]
    pub fn total_recorded(&self) -> usize {
        self.outcomes.iter().map(|o| o.recorded.len()).sum()
    }

    /// Names of the repositories whose reconciliation failed.
    #[must_use]
    pub fn failed(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failed())
            .map(|o| o.repo.clone())
            .collect()
    }

    /// `Err(PartialSync)` when any repository failed.
    pub fn ensure_complete(&self) -> Result<()> {
        let failed = self.failed();
        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::PartialSync {
                failed,
                total: self.outcomes.len(),
            })
        }
    }
}
