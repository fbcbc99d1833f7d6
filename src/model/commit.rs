//! Commit metadata pulled from a source host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One commit authored by the tracked identity.
///
/// Only the hash, the authoring date and the author identity leave the
/// source host; diffs and messages are never mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Full commit hash. Uniqueness key.
    pub hash: String,

    /// Original authoring date on the source host.
    pub date: DateTime<Utc>,

    /// Identity the commit was matched on (an email address).
    #[serde(alias = "user")]
    pub author: String,
}

impl CommitRecord {
    pub fn new(hash: impl Into<String>, date: DateTime<Utc>, author: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            date,
            author: author.into(),
        }
    }
}

/// The matching commits of one source repository.
///
/// Built once per run and read-only afterwards. Commits keep the order the
/// host returned them in, which for both supported hosts is newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySyncUnit {
    /// Source repository name (Bitbucket slug, Azure repository name).
    #[serde(rename = "repo")]
    pub source_repo_name: String,

    pub commits: Vec<CommitRecord>,
}

impl RepositorySyncUnit {
    /// Wrap a repository's commits, or `None` when there are none.
    ///
    /// Repositories without matching commits never produce a unit.
    #[must_use]
    pub fn non_empty(source_repo_name: impl Into<String>, commits: Vec<CommitRecord>) -> Option<Self> {
        if commits.is_empty() {
            None
        } else {
            Some(Self {
                source_repo_name: source_repo_name.into(),
                commits,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_repository_yields_no_unit() {
        assert!(RepositorySyncUnit::non_empty("svc-a", Vec::new()).is_none());

        let date = "2023-01-02T10:00:00Z".parse().unwrap();
        let unit = RepositorySyncUnit::non_empty("svc-a", vec![CommitRecord::new("aaa", date, "jane@x.com")]);
        assert_eq!(unit.unwrap().commits.len(), 1);
    }

    #[test]
    fn test_reads_legacy_user_field() {
        let json = r#"[{"repo":"svc-a","commits":[{"hash":"aaa","date":"2023-01-02T10:00:00+00:00","user":"jane@x.com"}]}]"#;
        let units: Vec<RepositorySyncUnit> = serde_json::from_str(json).unwrap();
        assert_eq!(units[0].source_repo_name, "svc-a");
        assert_eq!(units[0].commits[0].author, "jane@x.com");

        let written = serde_json::to_value(&units[0]).unwrap();
        assert_eq!(written["repo"], "svc-a");
        assert_eq!(written["commits"][0]["author"], "jane@x.com");
    }
}
