//! Azure DevOps puller.
//!
//! Azure filters commits server-side with `searchCriteria.author`, which is a
//! fuzzy match on name or email, so the structured `author.email` field is
//! compared again client-side. Commit listings page with `$top`/`$skip`; a
//! full page means there may be another one.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{Page, SourceKind, SourcePuller, walk_pages};
use crate::config::AzureConfig;
use crate::error::{Error, Result};
use crate::http::{ApiRequest, Auth, HttpExecutor, HttpResult, Url, endpoint, fetch};
use crate::model::CommitRecord;

const API_VERSION: &str = "6.0";

/// Commits requested per page.
pub const PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
struct AzureList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RepositoryItem {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommitItem {
    commit_id: String,
    author: CommitAuthor,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    email: Option<String>,
    date: DateTime<Utc>,
}

/// Pulls from `dev.azure.com/{organization}/{project}`.
pub struct AzurePuller<E> {
    http: E,
    config: AzureConfig,
    auth: Auth,
}

impl<E: HttpExecutor> AzurePuller<E> {
    pub fn new(http: E, config: AzureConfig) -> Self {
        // Personal access tokens authenticate with an empty user name.
        let auth = Auth::Basic {
            username: String::new(),
            secret: config.token.clone(),
        };
        Self { http, config, auth }
    }

    fn git_url(&self, rest: &[&str]) -> Url {
        let mut segments = vec![
            self.config.organization.as_str(),
            self.config.project.as_str(),
            "_apis",
            "git",
            "repositories",
        ];
        segments.extend_from_slice(rest);
        endpoint(&self.config.api_url, &segments)
    }

    fn repositories_url(&self) -> String {
        let mut url = self.git_url(&[]);
        url.query_pairs_mut().append_pair("api-version", API_VERSION);
        url.into()
    }

    fn commits_url(&self, repo: &str, identity: &str, skip: usize) -> String {
        let mut url = self.git_url(&[repo, "commits"]);
        url.query_pairs_mut()
            .append_pair("searchCriteria.author", identity)
            .append_pair("searchCriteria.$top", &PAGE_SIZE.to_string())
            .append_pair("searchCriteria.$skip", &skip.to_string())
            .append_pair("api-version", API_VERSION);
        url.into()
    }

    async fn commit_page(
        &self,
        url: String,
        repo: &str,
        identity: &str,
        skip: usize,
    ) -> HttpResult<Page<CommitRecord>> {
        let list: AzureList<CommitItem> = fetch(&self.http, ApiRequest::get(url, &self.auth)).await?;

        let next = (list.value.len() >= PAGE_SIZE)
            .then(|| self.commits_url(repo, identity, skip + PAGE_SIZE));

        let items = list
            .value
            .into_iter()
            .filter(|item| item.author.email.as_deref() == Some(identity))
            .map(|item| CommitRecord::new(item.commit_id, item.author.date, identity))
            .collect();

        Ok(Page { items, next })
    }
}

impl<E: HttpExecutor> SourcePuller for AzurePuller<E> {
    fn kind(&self) -> SourceKind {
        SourceKind::Azure
    }

    async fn list_repositories(&self) -> Result<Vec<String>> {
        tracing::info!(
            organization = %self.config.organization,
            project = %self.config.project,
            "Listing Azure repositories"
        );

        let list: AzureList<RepositoryItem> =
            fetch(&self.http, ApiRequest::get(self.repositories_url(), &self.auth))
                .await
                .map_err(Error::Http)?;

        Ok(list.value.into_iter().map(|r| r.name).collect())
    }

    async fn repository_commits(&self, repo: &str, identity: &str) -> Vec<CommitRecord> {
        // Offset of the page being requested; advances by one page per request.
        let mut skip = 0;
        let walk = walk_pages(self.commits_url(repo, identity, 0), move |url| {
            let offset = skip;
            skip += PAGE_SIZE;
            self.commit_page(url, repo, identity, offset)
        })
        .await;

        if let Some(failure) = walk.failure {
            tracing::warn!(repo, error = %failure, "Commit listing stopped early");
        }
        walk.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedHost;
    use serde_json::json;

    fn config() -> AzureConfig {
        AzureConfig {
            api_url: "https://az.test".parse().unwrap(),
            organization: "acme".into(),
            project: "Core".into(),
            token: "pat".into(),
        }
    }

    fn commits_url(repo: &str, skip: usize) -> String {
        format!(
            "https://az.test/acme/Core/_apis/git/repositories/{repo}/commits?searchCriteria.author=jane%40x.com&searchCriteria.%24top=100&searchCriteria.%24skip={skip}&api-version=6.0"
        )
    }

    fn commit(hash: &str, email: &str) -> serde_json::Value {
        json!({"commitId": hash, "author": {"name": "Jane", "email": email, "date": "2023-01-02T10:00:00Z"}})
    }

    #[tokio::test]
    async fn test_list_repositories() {
        let host = ScriptedHost::new().respond(
            "https://az.test/acme/Core/_apis/git/repositories?api-version=6.0",
            json!({"count": 2, "value": [{"name": "svc-a"}, {"name": "svc b"}]}),
        );
        let puller = AzurePuller::new(&host, config());

        assert_eq!(puller.list_repositories().await.unwrap(), vec!["svc-a", "svc b"]);
        assert_eq!(host.last_authorization().unwrap(), "Basic OnBhdA==");
    }

    #[tokio::test]
    async fn test_commits_matched_on_email_field() {
        let host = ScriptedHost::new().respond(
            &commits_url("svc-a", 0),
            json!({"count": 3, "value": [
                commit("bbb", "jane@x.com"),
                commit("xxx", "jane.doe@x.com"),
                commit("aaa", "jane@x.com"),
            ]}),
        );
        let puller = AzurePuller::new(&host, config());

        let units = puller.list_user_commits(&["svc-a".to_string()], " jane@x.com").await;
        assert_eq!(units.len(), 1);
        let hashes: Vec<_> = units[0].commits.iter().map(|c| c.hash.as_str()).collect();
        assert_eq!(hashes, vec!["bbb", "aaa"]);
    }

    #[tokio::test]
    async fn test_full_page_requests_next_page() {
        let first: Vec<_> = (0..PAGE_SIZE).map(|i| commit(&format!("h{i}"), "jane@x.com")).collect();
        let host = ScriptedHost::new()
            .respond(&commits_url("svc-a", 0), json!({"count": PAGE_SIZE, "value": first}))
            .respond(
                &commits_url("svc-a", PAGE_SIZE),
                json!({"count": 1, "value": [commit("last", "jane@x.com")]}),
            );
        let puller = AzurePuller::new(&host, config());

        let commits = puller.repository_commits("svc-a", "jane@x.com").await;
        assert_eq!(commits.len(), PAGE_SIZE + 1);
        assert_eq!(commits.last().unwrap().hash, "last");
        assert_eq!(host.requested().len(), 2);
    }

    #[tokio::test]
    async fn test_repository_without_matches_is_omitted() {
        let host = ScriptedHost::new().respond(&commits_url("svc-a", 0), json!({"count": 0, "value": []}));
        let puller = AzurePuller::new(&host, config());

        assert!(puller.list_user_commits(&["svc-a".to_string()], "jane@x.com").await.is_empty());
    }
}
