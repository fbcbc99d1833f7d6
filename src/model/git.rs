//! Destination tree protocol values.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Regular, non-executable file.
pub const BLOB_MODE: &str = "100644";

/// Commit and root tree of the tracked branch.
///
/// Fetched again before every mutation: each destination commit moves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryHead {
    pub commit_sha: String,
    pub tree_sha: String,
}

/// Single-entry tree mutation applied on top of a base tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeDelta {
    pub path: String,
    pub mode: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub content: String,
}

impl TreeDelta {
    /// Replace (or create) the blob at `path` with `content`.
    pub fn blob(path: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: BLOB_MODE,
            kind: "blob",
            content: content.into(),
        }
    }
}

/// Author identity of destination commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    /// Author block with the source commit's date.
    #[must_use]
    pub fn at(&self, date: DateTime<Utc>) -> serde_json::Value {
        serde_json::json!({
            "name": self.name,
            "email": self.email,
            "date": date.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_delta_wire_shape() {
        let delta = TreeDelta::blob("svc-a", "aaa\nbbb");
        let json = serde_json::to_value(&delta).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"path": "svc-a", "mode": "100644", "type": "blob", "content": "aaa\nbbb"})
        );
    }

    #[test]
    fn test_signature_carries_source_date() {
        let sig = Signature {
            name: "jane".into(),
            email: "jane@x.com".into(),
        };
        let date = "2023-01-02T10:00:00+02:00".parse().unwrap();
        assert_eq!(sig.at(date)["date"], "2023-01-02T08:00:00Z");
    }
}
