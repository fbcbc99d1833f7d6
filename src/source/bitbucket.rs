//! Bitbucket Cloud puller.
//!
//! Bitbucket returns the author as a free-text `raw` string
//! (`Jane Doe <jane@x.com>`), so the identity is matched against the email
//! found between the angle brackets.
//!
//! Listings page through the `next` link of each response. Links leaving the
//! configured API origin are not followed.

use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;

use super::{Page, SourceKind, SourcePuller, walk_pages};
use crate::config::BitbucketConfig;
use crate::error::{Error, Result};
use crate::http::{ApiRequest, Auth, HttpExecutor, HttpResult, Url, endpoint, fetch};
use crate::model::CommitRecord;

/// `<...>` holding no nested brackets; bounded by the closing bracket.
static EMAIL_IN_BRACKETS: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"<([^<>]*)>").ok());

/// Extract the email from a raw author string such as `Jane Doe <jane@x.com>`.
///
/// Returns `None` when there is no bracketed email.
#[must_use]
pub fn extract_email(raw_author: &str) -> Option<&str> {
    EMAIL_IN_BRACKETS
        .as_ref()?
        .captures(raw_author)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[derive(Debug, Deserialize)]
struct BitbucketPage<T> {
    #[serde(default = "Vec::new")]
    values: Vec<T>,
    #[serde(default)]
    next: Option<String>,
}

impl<T> From<BitbucketPage<T>> for Page<T> {
    fn from(page: BitbucketPage<T>) -> Self {
        Self {
            items: page.values,
            next: page.next,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RepositoryItem {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct CommitItem {
    hash: String,
    date: DateTime<Utc>,
    #[serde(default)]
    author: Option<CommitAuthor>,
}

#[derive(Debug, Deserialize)]
struct CommitAuthor {
    #[serde(default)]
    raw: Option<String>,
}

/// Pulls from `api.bitbucket.org/2.0`.
pub struct BitbucketPuller<E> {
    http: E,
    config: BitbucketConfig,
    auth: Auth,
}

impl<E: HttpExecutor> BitbucketPuller<E> {
    pub fn new(http: E, config: BitbucketConfig) -> Self {
        let auth = Auth::Basic {
            username: config.username.clone(),
            secret: config.app_password.clone(),
        };
        Self { http, config, auth }
    }

    fn repositories_url(&self) -> String {
        let mut url = endpoint(&self.config.api_url, &["repositories", self.config.workspace.as_str()]);
        url.query_pairs_mut().append_pair("fields", "next,values.slug");
        url.into()
    }

    fn commits_url(&self, repo: &str) -> String {
        let mut url = endpoint(
            &self.config.api_url,
            &["repositories", self.config.workspace.as_str(), repo, "commits"],
        );
        url.query_pairs_mut()
            .append_pair("fields", "next,values.author,values.date,values.hash");
        url.into()
    }

    /// `next` if it stays on the configured API origin.
    fn same_origin(&self, next: Option<String>) -> Option<String> {
        let next = next?;
        match Url::parse(&next) {
            Ok(url) if url.origin() == self.config.api_url.origin() => Some(next),
            _ => {
                tracing::warn!(next = %next, "Ignoring pagination link outside the API origin");
                None
            }
        }
    }

    async fn repository_page(&self, url: String) -> HttpResult<Page<String>> {
        let page: BitbucketPage<RepositoryItem> =
            fetch(&self.http, ApiRequest::get(url, &self.auth)).await?;
        let page = Page::from(page);
        Ok(Page {
            items: page.items.into_iter().map(|r| r.slug).collect(),
            next: self.same_origin(page.next),
        })
    }

    async fn commit_page(&self, url: String, identity: &str) -> HttpResult<Page<CommitRecord>> {
        let page: BitbucketPage<CommitItem> =
            fetch(&self.http, ApiRequest::get(url, &self.auth)).await?;

        let items = page
            .values
            .into_iter()
            .filter_map(|item| {
                let raw = item.author.and_then(|a| a.raw)?;
                let email = extract_email(&raw)?;
                (email == identity).then(|| CommitRecord::new(item.hash, item.date, email))
            })
            .collect();

        Ok(Page {
            items,
            next: self.same_origin(page.next),
        })
    }
}

impl<E: HttpExecutor> SourcePuller for BitbucketPuller<E> {
    fn kind(&self) -> SourceKind {
        SourceKind::Bitbucket
    }

    async fn list_repositories(&self) -> Result<Vec<String>> {
        tracing::info!(workspace = %self.config.workspace, "Listing Bitbucket repositories");

        let walk = walk_pages(self.repositories_url(), move |url| self.repository_page(url)).await;
        match walk.failure {
            Some(failure) if walk.pages == 0 => Err(Error::Http(failure)),
            Some(failure) => {
                tracing::warn!(error = %failure, collected = walk.items.len(), "Repository listing truncated");
                Ok(walk.items)
            }
            None => Ok(walk.items),
        }
    }

    async fn repository_commits(&self, repo: &str, identity: &str) -> Vec<CommitRecord> {
        let walk = walk_pages(self.commits_url(repo), move |url| self.commit_page(url, identity)).await;
        if let Some(failure) = walk.failure {
            tracing::warn!(repo, error = %failure, "Commit listing stopped early");
        }
        walk.items
    }
}
