//! Source hosts: where commits are pulled from.
//!
//! Two hosts share one capability set, [`SourcePuller`]:
//! - **Bitbucket** - paginates through a `next` URL, matches the identity
//!   against the free-text `author.raw` field
//! - **Azure DevOps** - paginates with `$top`/`$skip`, matches the identity
//!   against the structured `author.email` field
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐
//! │  pull / sync     │
//! └────────┬─────────┘
//!          │ list_repositories, list_user_commits
//!     ┌────┴─────┐
//!     ▼          ▼
//! ┌─────────┐ ┌───────┐
//! │Bitbucket│ │ Azure │
//! └─────────┘ └───────┘
//!     │          │
//!     └────┬─────┘
//!          ▼
//!     walk_pages ──► HttpExecutor
//! ```
//!
//! Per-repository commit fetches run concurrently. Pages within one
//! repository are fetched strictly in order, each URL coming from the
//! previous response.

mod azure;
mod bitbucket;

pub use azure::AzurePuller;
pub use bitbucket::{BitbucketPuller, extract_email};

use std::collections::HashSet;
use std::future::Future;

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::http::{HttpFailure, HttpResult};
use crate::model::{CommitRecord, RepositorySyncUnit};

/// Supported source hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Bitbucket,
    Azure,
}

impl SourceKind {
    /// Shadow repository name used when none is configured.
    #[must_use]
    pub const fn default_shadow_repo(self) -> &'static str {
        match self {
            Self::Bitbucket => "BitbucketShadowContributions",
            Self::Azure => "AzureShadowContributions",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bitbucket => write!(f, "Bitbucket"),
            Self::Azure => write!(f, "Azure"),
        }
    }
}

/// Pulls repositories and commits from one source host.
pub trait SourcePuller: Send + Sync {
    /// Which host this puller talks to.
    fn kind(&self) -> SourceKind;

    /// Names of all repositories visible in the workspace / project.
    ///
    /// Fails only when the first page cannot be fetched; a failure on a
    /// later page ends the listing with what was collected.
    fn list_repositories(&self) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// All commits in `repo` authored by `identity`, in host order.
    ///
    /// `identity` is already trimmed. A failed page ends the walk for this
    /// repository only.
    fn repository_commits(
        &self,
        repo: &str,
        identity: &str,
    ) -> impl Future<Output = Vec<CommitRecord>> + Send;

    /// Matching commits for every repository, fetched concurrently.
    ///
    /// Repositories without a match are left out. Callers must not rely on
    /// the order of the returned units.
    fn list_user_commits(
        &self,
        repos: &[String],
        identity: &str,
    ) -> impl Future<Output = Vec<RepositorySyncUnit>> + Send {
        async move {
            let identity = identity.trim();
            tracing::info!(source = %self.kind(), repos = repos.len(), "Fetching commits");

            let fetches: Vec<_> = repos
                .iter()
                .map(|repo| repository_unit(self, repo, identity))
                .collect();

            join_all(fetches).await.into_iter().flatten().collect()
        }
    }

    /// List repositories, then pull the identity's commits from all of them.
    fn pull(&self, identity: &str) -> impl Future<Output = Result<Vec<RepositorySyncUnit>>> + Send {
        async move {
            let repos = self.list_repositories().await?;
            Ok(self.list_user_commits(&repos, identity).await)
        }
    }
}

async fn repository_unit<P: SourcePuller + ?Sized>(
    puller: &P,
    repo: &str,
    identity: &str,
) -> Option<RepositorySyncUnit> {
    let commits = puller.repository_commits(repo, identity).await;
    tracing::debug!(repo, matched = commits.len(), "Repository scanned");
    RepositorySyncUnit::non_empty(repo, commits)
}

/// One page of a paginated listing.
#[derive(Debug)]
pub(crate) struct Page<T> {
    pub items: Vec<T>,
    /// URL of the following page, if the host announced one.
    pub next: Option<String>,
}

/// Everything collected by [`walk_pages`].
#[derive(Debug)]
pub(crate) struct PageWalk<T> {
    pub items: Vec<T>,
    pub pages: usize,
    /// Set when a page request failed and the walk stopped early.
    pub failure: Option<HttpFailure>,
}

/// Follow `next` pointers from `first_url` until they run out.
///
/// Stops on an absent or empty pointer, on a pointer already visited
/// (including one pointing at itself), or on the first failed page.
pub(crate) async fn walk_pages<T, F, Fut>(first_url: String, mut fetch_page: F) -> PageWalk<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = HttpResult<Page<T>>>,
{
    let mut walk = PageWalk {
        items: Vec::new(),
        pages: 0,
        failure: None,
    };
    let mut visited = HashSet::new();
    let mut next = Some(first_url);

    while let Some(url) = next.take() {
        if url.is_empty() || !visited.insert(url.clone()) {
            tracing::debug!(url = %url, "Pagination pointer exhausted");
            break;
        }

        match fetch_page(url).await {
            Ok(page) => {
                walk.pages += 1;
                walk.items.extend(page.items);
                next = page.next;
            }
            Err(failure) => {
                walk.failure = Some(failure);
                break;
            }
        }
    }

    walk
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(items: &[u32], next: Option<&str>) -> HttpResult<Page<u32>> {
        Ok(Page {
            items: items.to_vec(),
            next: next.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_walk_follows_next_until_absent() {
        let mut requested = Vec::new();
        let walk = walk_pages("p1".to_string(), |url| {
            requested.push(url.clone());
            let result = match url.as_str() {
                "p1" => page(&[1, 2], Some("p2")),
                "p2" => page(&[3], None),
                other => panic!("unexpected page {other}"),
            };
            async move { result }
        })
        .await;

        assert_eq!(walk.items, vec![1, 2, 3]);
        assert_eq!(walk.pages, 2);
        assert!(walk.failure.is_none());
        assert_eq!(requested, vec!["p1", "p2"]);
    }

    #[tokio::test]
    async fn test_walk_stops_on_self_reference_and_empty_pointer() {
        let walk = walk_pages("p1".to_string(), |url| {
            let result = match url.as_str() {
                "p1" => page(&[1], Some("p1")),
                other => panic!("unexpected page {other}"),
            };
            async move { result }
        })
        .await;
        assert_eq!(walk.items, vec![1]);
        assert_eq!(walk.pages, 1);

        let walk = walk_pages("p1".to_string(), |_| async { page(&[7], Some("")) }).await;
        assert_eq!(walk.items, vec![7]);
        assert_eq!(walk.pages, 1);
    }

    #[tokio::test]
    async fn test_walk_keeps_items_before_failure() {
        let walk = walk_pages("p1".to_string(), |url| {
            let result = match url.as_str() {
                "p1" => page(&[1, 2], Some("p2")),
                _ => Err(HttpFailure::Status {
                    url,
                    status: 500,
                    message: String::new(),
                }),
            };
            async move { result }
        })
        .await;

        assert_eq!(walk.items, vec![1, 2]);
        assert_eq!(walk.failure.unwrap().status(), Some(500));
    }

    #[test]
    fn test_default_shadow_repo_names() {
        assert_eq!(
            SourceKind::Bitbucket.default_shadow_repo(),
            "BitbucketShadowContributions"
        );
        assert_eq!(SourceKind::Azure.default_shadow_repo(), "AzureShadowContributions");
    }
}
