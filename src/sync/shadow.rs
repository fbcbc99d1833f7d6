//! Shadow file content: one recorded commit hash per line.

use std::collections::HashSet;

/// Text of a shadow file plus the set of hashes it records.
///
/// Append-only: existing text is kept byte for byte (minus trailing
/// whitespace) and a new hash is added as a final line. A hash is never
/// recorded twice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShadowContent {
    text: String,
    index: HashSet<String>,
}

impl ShadowContent {
    /// Parse blob text.
    ///
    /// Membership ignores blank lines and whitespace around each line; the
    /// text itself is not rewritten.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim_end().to_string();
        let index = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { text, index }
    }

    /// Record `hash`; returns `false` if it was already present.
    pub fn append(&mut self, hash: &str) -> bool {
        if !self.index.insert(hash.to_string()) {
            return false;
        }
        if !self.text.is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(hash);
        true
    }

    /// Copy with `hash` recorded, or `None` if it already is.
    #[must_use]
    pub fn with_line(&self, hash: &str) -> Option<Self> {
        if self.index.contains(hash) {
            return None;
        }
        let mut next = self.clone();
        next.append(hash);
        Some(next)
    }

    /// Blob text, no trailing newline.
    #[must_use]
    pub fn render(&self) -> String {
        self.text.clone()
    }

    /// Number of distinct hashes recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
