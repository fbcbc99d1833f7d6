//! Shadow file naming.
//!
//! A shadow file is named after its source repository, or after the SHA256
//! of that name when the names themselves should not be published.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Lowercase hex SHA256 of `value`.
///
/// Hex rather than base64: base64 may contain `/`, which the tree API would
/// read as a directory separator.
#[must_use]
pub fn content_hash(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// How shadow file paths are derived from source repository names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ShadowNaming {
    /// The repository name itself.
    #[default]
    Plain,
    /// SHA256 of the repository name.
    Hashed,
}

impl ShadowNaming {
    #[must_use]
    pub const fn from_flag(hash_paths: bool) -> Self {
        if hash_paths { Self::Hashed } else { Self::Plain }
    }

    /// Path of the shadow file for `repo`.
    #[must_use]
    pub fn path_for(self, repo: &str) -> String {
        match self {
            Self::Plain => repo.to_string(),
            Self::Hashed => content_hash(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_known_value() {
        assert_eq!(
            content_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_hashed_path_is_flat() {
        let path = ShadowNaming::Hashed.path_for("svc-a");
        assert_eq!(path.len(), 64);
        assert!(path.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(path, ShadowNaming::Hashed.path_for("svc-b"));
    }

    #[test]
    fn test_plain_path_is_name() {
        assert_eq!(ShadowNaming::Plain.path_for("svc-a"), "svc-a");
        assert_eq!(ShadowNaming::from_flag(false), ShadowNaming::Plain);
        assert_eq!(ShadowNaming::from_flag(true), ShadowNaming::Hashed);
    }
}
