//! Pull command implementation.

use std::path::Path;

use colored::Colorize;
use serde::Serialize;

use super::runtime;
use crate::cli::Credentials;
use crate::config::{ResolvedSource, SourceConfig};
use crate::error::Result;
use crate::http::ReqwestExecutor;
use crate::model::RepositorySyncUnit;
use crate::source::{AzurePuller, BitbucketPuller, SourceKind, SourcePuller};
use crate::sync::write_pull_file;

#[derive(Serialize)]
struct PullOutput<'a> {
    source: SourceKind,
    repositories: usize,
    commits: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    units: &'a [RepositorySyncUnit],
}

/// Execute `pull <source>`.
pub fn execute(source: SourceKind, output: Option<&Path>, credentials: &Credentials, json: bool) -> Result<()> {
    let resolved = credentials.load()?.source(source)?;
    let units = runtime()?.block_on(pull_units(&resolved))?;

    if let Some(path) = output {
        write_pull_file(path, &units)?;
    }

    if json {
        let payload = PullOutput {
            source: resolved.kind(),
            repositories: units.len(),
            commits: count_commits(&units),
            output: output.map(|p| p.display().to_string()),
            units: &units,
        };
        println!("{}", serde_json::to_string(&payload)?);
        return Ok(());
    }

    if !crate::is_quiet() {
        print_summary(source, &units);
        if let Some(path) = output {
            println!("Wrote {}", path.display().to_string().cyan());
        }
    }
    Ok(())
}

/// Pull the resolved identity's commits from its source host.
pub(crate) async fn pull_units(source: &ResolvedSource) -> Result<Vec<RepositorySyncUnit>> {
    tracing::info!(source = %source.kind(), identity = %source.identity, "Pulling commits");
    let http = ReqwestExecutor::new()?;
    match &source.config {
        SourceConfig::Bitbucket(config) => {
            BitbucketPuller::new(http, config.clone()).pull(&source.identity).await
        }
        SourceConfig::Azure(config) => {
            AzurePuller::new(http, config.clone()).pull(&source.identity).await
        }
    }
}

fn count_commits(units: &[RepositorySyncUnit]) -> usize {
    units.iter().map(|u| u.commits.len()).sum()
}

pub(crate) fn print_summary(source: SourceKind, units: &[RepositorySyncUnit]) {
    if units.is_empty() {
        println!("No matching commits on {source}.");
        return;
    }

    println!(
        "Pulled {} commits from {} {source} repositories",
        count_commits(units).to_string().bold(),
        units.len()
    );
    for unit in units {
        println!("  {} {}", unit.source_repo_name, format!("({})", unit.commits.len()).dimmed());
    }
}
