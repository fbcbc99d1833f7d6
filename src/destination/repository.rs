//! The shadow repository on the destination host.
//!
//! Per source repository and run:
//!
//! ```text
//! ensure_exists ─► locate_tracking_blob ─┬─ found ─► load_blob_content ─┐
//!                                        └─ absent ─► empty ────────────┴─► reconcile
//! ```
//!
//! `reconcile` issues one destination commit per newly recorded hash, each
//! built on a freshly fetched HEAD so the commits form a linear chain.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use super::api::{BlobResponse, GitHubApi};
use crate::error::{Error, Result};
use crate::http::HttpExecutor;
use crate::model::{CommitRecord, TreeDelta};
use crate::sync::ShadowContent;

const DESCRIPTION: &str = "Shadow record of contributions made on other hosts";

/// What `ensure_exists` found or did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RepositoryStatus {
    Existing,
    Created,
    /// Absent and left absent (dry run).
    Missing,
}

/// Result of reconciling one shadow file.
#[derive(Debug)]
pub struct ReconcileOutcome {
    /// Hashes committed (or, in a dry run, that would be), in order.
    pub recorded: Vec<String>,
    /// Content after the last successful commit.
    pub content: ShadowContent,
    /// The failure that stopped reconciliation early.
    pub failure: Option<Error>,
}

/// Decode a blob into text.
///
/// Base64 content is wrapped by the host every 60 characters; the line
/// breaks are removed before decoding.
pub fn decode_blob(blob: &BlobResponse) -> Result<String> {
    match blob.encoding.as_str() {
        "base64" => {
            let compact: String = blob.content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = STANDARD
                .decode(compact)
                .map_err(|e| Error::Structural(format!("blob is not valid base64: {e}")))?;
            String::from_utf8(bytes)
                .map_err(|e| Error::Structural(format!("blob is not valid UTF-8: {e}")))
        }
        "utf-8" | "utf8" => Ok(blob.content.clone()),
        other => Err(Error::Structural(format!("unsupported blob encoding '{other}'"))),
    }
}

/// Shadow repository manager.
pub struct ShadowRepository<E> {
    api: GitHubApi<E>,
    dry_run: bool,
    status: Option<RepositoryStatus>,
}

impl<E: HttpExecutor> ShadowRepository<E> {
    pub fn new(api: GitHubApi<E>, dry_run: bool) -> Self {
        Self {
            api,
            dry_run,
            status: None,
        }
    }

    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.api.config().repo
    }

    /// Create the repository unless `owner/repo` is already listed.
    ///
    /// Lists repositories once per instance; later calls return the cached
    /// status.
    pub async fn ensure_exists(&mut self) -> Result<RepositoryStatus> {
        if let Some(status) = self.status {
            return Ok(status);
        }

        let config = self.api.config();
        let repo = config.repo.clone();
        let full_name = format!("{}/{}", config.owner, config.repo);
        let existing = self.api.list_repositories().await?;

        // Names are case-insensitive on the host.
        let status = if existing.iter().any(|name| name.eq_ignore_ascii_case(&full_name)) {
            tracing::debug!(repo = %repo, "Shadow repository exists");
            RepositoryStatus::Existing
        } else if self.dry_run {
            tracing::info!(repo = %repo, "Shadow repository missing; dry run leaves it absent");
            RepositoryStatus::Missing
        } else {
            tracing::info!(repo = %repo, "Creating shadow repository");
            self.api.create_repository(DESCRIPTION).await?;
            RepositoryStatus::Created
        };

        self.status = Some(status);
        Ok(status)
    }

    /// SHA of the blob at exactly `path` in the root tree of HEAD.
    pub async fn locate_tracking_blob(&self, path: &str) -> Result<Option<String>> {
        let head = self.api.branch_head().await?;
        let entries = self.api.tree(&head.tree_sha).await?;

        Ok(entries
            .into_iter()
            .find(|entry| entry.kind == "blob" && entry.path == path)
            .map(|entry| entry.sha))
    }

    pub async fn load_blob_content(&self, sha: &str) -> Result<String> {
        let blob = self.api.blob(sha).await?;
        decode_blob(&blob)
    }

    /// Current content of the shadow file at `path`, empty if it has none.
    pub async fn shadow_content(&self, path: &str) -> Result<ShadowContent> {
        if self.status == Some(RepositoryStatus::Missing) {
            return Ok(ShadowContent::default());
        }

        match self.locate_tracking_blob(path).await? {
            Some(sha) => Ok(ShadowContent::parse(&self.load_blob_content(&sha).await?)),
            None => {
                tracing::debug!(path, "No tracking blob yet");
                Ok(ShadowContent::default())
            }
        }
    }

    /// Commit `content` as the new shadow file at `path`.
    ///
    /// HEAD is fetched again on every call. Returns the new commit SHA.
    pub async fn commit_line(
        &self,
        path: &str,
        content: &ShadowContent,
        commit: &CommitRecord,
    ) -> Result<String> {
        let head = self.api.branch_head().await?;
        let tree = self
            .api
            .create_tree(&head.tree_sha, &TreeDelta::blob(path, content.render()))
            .await?;

        let author = self.api.config().author.at(commit.date);
        let sha = self
            .api
            .create_commit(&format!("Update {path}"), &tree, &head.commit_sha, author)
            .await?;
        self.api.update_ref(&sha).await?;

        tracing::debug!(path, hash = %commit.hash, commit = %sha, "Recorded commit");
        Ok(sha)
    }

    /// Record every commit whose hash `content` does not contain yet.
    ///
    /// Commits are applied in the order given, one destination commit each.
    /// Hashes already present cost no request. The first failure stops the
    /// loop; what was committed before it stays committed.
    pub async fn reconcile(
        &self,
        path: &str,
        commits: &[CommitRecord],
        content: ShadowContent,
    ) -> ReconcileOutcome {
        let mut outcome = ReconcileOutcome {
            recorded: Vec::new(),
            content,
            failure: None,
        };

        for commit in commits {
            let Some(next) = outcome.content.with_line(&commit.hash) else {
                tracing::debug!(path, hash = %commit.hash, "Already recorded");
                continue;
            };

            if !self.dry_run {
                if let Err(e) = self.commit_line(path, &next, commit).await {
                    tracing::warn!(path, hash = %commit.hash, error = %e, "Reconciliation aborted");
                    outcome.failure = Some(e);
                    break;
                }
            }

            outcome.content = next;
            outcome.recorded.push(commit.hash.clone());
        }

        outcome
    }
}
