//! Pull file I/O.
//!
//! `pull --output` writes the pulled units as pretty JSON; `push --input`
//! reads them back:
//!
//! ```json
//! [{"repo": "svc-a", "commits": [{"hash": "aaa", "date": "2023-01-02T10:00:00Z", "author": "jane@x.com"}]}]
//! ```

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::RepositorySyncUnit;

/// Write content to a file atomically.
///
/// Writes a sibling `.tmp` file, syncs it to disk, then renames it over
/// `path`. If any step fails the original file (if any) is left untouched.
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let temp_path = path.with_extension("json.tmp");

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    {
        let file = File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(content.as_bytes())?;
        writer.flush()?;
        writer.get_ref().sync_all()?;
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

/// Write pulled units to `path`.
pub fn write_pull_file(path: &Path, units: &[RepositorySyncUnit]) -> Result<()> {
    let mut json = serde_json::to_string_pretty(units)?;
    json.push('\n');
    atomic_write(path, &json)
}

/// Read pulled units from `path`.
///
/// Units without commits are dropped.
pub fn read_pull_file(path: &Path) -> Result<Vec<RepositorySyncUnit>> {
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    let units: Vec<RepositorySyncUnit> = serde_json::from_str(&content)
        .map_err(|e| Error::InvalidArgument(format!("{} is not a pull file: {e}", path.display())))?;

    Ok(units
        .into_iter()
        .filter_map(|u| RepositorySyncUnit::non_empty(u.source_repo_name, u.commits))
        .collect())
}
