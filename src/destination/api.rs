//! GitHub REST endpoints used by the shadow repository.
//!
//! One method per endpoint. Failures come back as `Error::Http`, except a
//! rejected ref update which is reported as `Error::NonFastForward`.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::GitHubConfig;
use crate::error::{Error, Result};
use crate::http::{ApiRequest, Auth, HttpExecutor, Method, Url, endpoint, fetch};
use crate::model::{RepositoryHead, TreeDelta};

/// Repositories requested per listing page.
const PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
struct RepositoryItem {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
    #[serde(default)]
    commit: Option<CommitDetail>,
}

#[derive(Debug, Deserialize)]
struct CommitDetail {
    #[serde(default)]
    tree: Option<Created>,
}

#[derive(Debug, Deserialize)]
struct Tree {
    #[serde(default)]
    tree: Vec<TreeEntry>,
}

/// One entry of a root tree listing.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sha: String,
}

/// Raw blob as returned by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct BlobResponse {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub encoding: String,
}

/// Client for one repository and branch on a GitHub-compatible host.
pub struct GitHubApi<E> {
    http: E,
    config: GitHubConfig,
    auth: Auth,
}

impl<E: HttpExecutor> GitHubApi<E> {
    pub fn new(http: E, config: GitHubConfig) -> Self {
        let auth = Auth::Bearer(config.token.clone());
        Self { http, config, auth }
    }

    pub fn config(&self) -> &GitHubConfig {
        &self.config
    }

    fn url(&self, segments: &[&str]) -> Url {
        endpoint(&self.config.api_url, segments)
    }

    fn repo_url(&self, rest: &[&str]) -> String {
        let mut segments = vec!["repos", self.config.owner.as_str(), self.config.repo.as_str()];
        segments.extend_from_slice(rest);
        self.url(&segments).into()
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        Ok(fetch(&self.http, request).await?)
    }

    /// Full names (`owner/name`) of every repository visible to the user.
    ///
    /// Reads `per_page=100` pages until a short page comes back, or a page
    /// that adds no name not already seen.
    pub async fn list_repositories(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut seen = HashSet::new();
        for page in 1.. {
            let mut url = self.url(&["user", "repos"]);
            url.query_pairs_mut()
                .append_pair("per_page", &PER_PAGE.to_string())
                .append_pair("page", &page.to_string());

            let items: Vec<RepositoryItem> = self.send(ApiRequest::get(url, &self.auth)).await?;
            let count = items.len();
            let before = names.len();
            names.extend(
                items
                    .into_iter()
                    .map(|r| r.full_name)
                    .filter(|name| seen.insert(name.clone())),
            );
            if count < PER_PAGE {
                break;
            }
            if names.len() == before {
                tracing::warn!(page, "Repository listing repeats a page; stopping");
                break;
            }
        }
        Ok(names)
    }

    /// Create the configured repository, private and auto-initialised.
    pub async fn create_repository(&self, description: &str) -> Result<()> {
        let body = json!({
            "name": self.config.repo,
            "description": description,
            "private": true,
            "auto_init": true,
        });
        let _: Value = self
            .send(ApiRequest::with_body(Method::Post, self.url(&["user", "repos"]), &self.auth, body))
            .await?;
        Ok(())
    }

    /// Current commit and root tree of the configured branch.
    pub async fn branch_head(&self) -> Result<RepositoryHead> {
        let url = self.repo_url(&["commits", self.config.branch.as_str()]);
        let head: BranchCommit = self.send(ApiRequest::get(url, &self.auth)).await?;

        let tree_sha = head
            .commit
            .and_then(|c| c.tree)
            .map(|t| t.sha)
            .ok_or_else(|| {
                Error::Structural(format!(
                    "head {} of {} has no tree",
                    head.sha, self.config.branch
                ))
            })?;

        Ok(RepositoryHead {
            commit_sha: head.sha,
            tree_sha,
        })
    }

    /// Entries of a tree, non-recursive.
    pub async fn tree(&self, sha: &str) -> Result<Vec<TreeEntry>> {
        let tree: Tree = self
            .send(ApiRequest::get(self.repo_url(&["git", "trees", sha]), &self.auth))
            .await?;
        Ok(tree.tree)
    }

    pub async fn blob(&self, sha: &str) -> Result<BlobResponse> {
        self.send(ApiRequest::get(self.repo_url(&["git", "blobs", sha]), &self.auth))
            .await
    }

    /// Create a tree from `base_tree` with a single entry replaced.
    pub async fn create_tree(&self, base_tree: &str, delta: &TreeDelta) -> Result<String> {
        let body = json!({ "base_tree": base_tree, "tree": [delta] });
        let created: Created = self
            .send(ApiRequest::with_body(Method::Post, self.repo_url(&["git", "trees"]), &self.auth, body))
            .await?;
        Ok(created.sha)
    }

    pub async fn create_commit(
        &self,
        message: &str,
        tree: &str,
        parent: &str,
        author: Value,
    ) -> Result<String> {
        let body = json!({
            "message": message,
            "tree": tree,
            "parents": [parent],
            "author": author,
        });
        let created: Created = self
            .send(ApiRequest::with_body(Method::Post, self.repo_url(&["git", "commits"]), &self.auth, body))
            .await?;
        Ok(created.sha)
    }

    /// Move the branch to `sha`. Never forced.
    pub async fn update_ref(&self, sha: &str) -> Result<()> {
        let url = self.repo_url(&["git", "refs", "heads", self.config.branch.as_str()]);
        let body = json!({ "sha": sha, "force": false });

        match fetch::<_, Value>(&self.http, ApiRequest::with_body(Method::Patch, url, &self.auth, body)).await {
            Ok(_) => Ok(()),
            Err(failure) if failure.status() == Some(422) => Err(Error::NonFastForward {
                reference: format!("heads/{}", self.config.branch),
                sha: sha.to_string(),
            }),
            Err(failure) => Err(Error::Http(failure)),
        }
    }
}
