//! Sync orchestration.
//!
//! Given the pulled [`RepositorySyncUnit`]s, make sure the shadow repository
//! exists, then reconcile each unit's shadow file in turn. Units run one
//! after another: every destination commit moves the same branch ref.
//!
//! A failing unit is recorded in the [`SyncReport`] and the run moves on to
//! the next one.

use crate::destination::ShadowRepository;
use crate::error::Result;
use crate::http::HttpExecutor;
use crate::model::RepositorySyncUnit;
use crate::sync::hash::ShadowNaming;
use crate::sync::types::{RepoOutcome, SyncEvent, SyncReport};

/// Drives reconciliation of pulled units against the shadow repository.
pub struct Synchronizer<E> {
    shadow: ShadowRepository<E>,
    naming: ShadowNaming,
}

impl<E: HttpExecutor> Synchronizer<E> {
    #[must_use]
    pub const fn new(shadow: ShadowRepository<E>, naming: ShadowNaming) -> Self {
        Self { shadow, naming }
    }

    /// Reconcile every unit, reporting progress through `on_event`.
    ///
    /// # Errors
    ///
    /// Only when the shadow repository cannot be checked or created. Per-unit
    /// failures are part of the returned report.
    pub async fn run(
        &mut self,
        units: &[RepositorySyncUnit],
        mut on_event: impl FnMut(SyncEvent),
    ) -> Result<SyncReport> {
        let repository_status = self.shadow.ensure_exists().await?;
        let total = units.len();
        let mut outcomes = Vec::with_capacity(total);

        for (i, unit) in units.iter().enumerate() {
            let repo = unit.source_repo_name.clone();
            on_event(SyncEvent::Started {
                repo: repo.clone(),
                index: i + 1,
                total,
            });

            let outcome = self.sync_unit(unit).await;
            on_event(match (&outcome.error, outcome.recorded.len()) {
                (Some(error), _) => SyncEvent::Failed {
                    repo,
                    error: error.clone(),
                },
                (None, 0) => SyncEvent::UpToDate { repo },
                (None, count) => SyncEvent::Recorded { repo, count },
            });
            outcomes.push(outcome);
        }

        Ok(SyncReport {
            repository: self.shadow.name().to_string(),
            repository_status,
            naming: self.naming,
            dry_run: self.shadow.is_dry_run(),
            outcomes,
        })
    }

    async fn sync_unit(&self, unit: &RepositorySyncUnit) -> RepoOutcome {
        let path = self.naming.path_for(&unit.source_repo_name);
        let mut outcome = RepoOutcome {
            repo: unit.source_repo_name.clone(),
            path: path.clone(),
            pulled: unit.commits.len(),
            recorded: Vec::new(),
            error: None,
        };

        let content = match self.shadow.shadow_content(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!(repo = %outcome.repo, error = %e, "Could not read shadow file");
                outcome.error = Some(e.to_string());
                return outcome;
            }
        };

        let reconciled = self.shadow.reconcile(&path, &unit.commits, content).await;
        tracing::info!(
            repo = %outcome.repo,
            recorded = reconciled.recorded.len(),
            hashes = reconciled.content.len(),
            "Reconciled"
        );
        outcome.recorded = reconciled.recorded;
        outcome.error = reconciled.failure.map(|e| e.to_string());
        outcome
    }
}
