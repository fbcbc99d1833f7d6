//! Push and sync command implementations.
//!
//! Both resolve the destination before any request is made, then hand the
//! units to the [`Synchronizer`]. A run with failed repositories prints its
//! full report and then fails with a partial-sync error.

use std::path::Path;

use colored::Colorize;

use super::pull::{print_summary, pull_units};
use super::runtime;
use crate::cli::{Credentials, PushOptions};
use crate::config::GitHubConfig;
use crate::destination::{GitHubApi, RepositoryStatus, ShadowRepository};
use crate::error::Result;
use crate::http::ReqwestExecutor;
use crate::model::RepositorySyncUnit;
use crate::source::SourceKind;
use crate::sync::{ShadowNaming, SyncEvent, SyncReport, Synchronizer, read_pull_file};

/// Execute `push --input FILE`.
pub fn execute_push(
    input: &Path,
    source: SourceKind,
    options: PushOptions,
    credentials: &Credentials,
    json: bool,
) -> Result<()> {
    let units = read_pull_file(input)?;
    let github = credentials.load()?.destination(source)?;

    runtime()?.block_on(push_units(github, &units, options, json))
}

/// Execute `sync <source>`.
pub fn execute_sync(source: SourceKind, options: PushOptions, credentials: &Credentials, json: bool) -> Result<()> {
    let config = credentials.load()?;
    let resolved = config.source(source)?;
    let github = config.destination(source)?;

    runtime()?.block_on(async {
        let units = pull_units(&resolved).await?;
        if !json && !crate::is_quiet() {
            print_summary(source, &units);
            println!();
        }
        push_units(github, &units, options, json).await
    })
}

async fn push_units(
    github: GitHubConfig,
    units: &[RepositorySyncUnit],
    options: PushOptions,
    json: bool,
) -> Result<()> {
    let shadow = ShadowRepository::new(GitHubApi::new(ReqwestExecutor::new()?, github), options.dry_run);
    let mut synchronizer = Synchronizer::new(shadow, ShadowNaming::from_flag(options.hash_paths));

    let verbose_output = !json && !crate::is_quiet();
    let report = synchronizer
        .run(units, |event| {
            if verbose_output {
                print_event(&event, options.dry_run);
            }
        })
        .await?;

    if json {
        println!("{}", serde_json::to_string(&report)?);
    } else if !crate::is_quiet() {
        print_report(&report);
    }

    report.ensure_complete()
}

fn print_event(event: &SyncEvent, dry_run: bool) {
    match event {
        SyncEvent::Started { repo, index, total } => {
            println!("Syncing {} ({index}/{total})", repo.bold());
        }
        SyncEvent::Recorded { repo, count } => {
            let verb = if dry_run { "Would add" } else { "Added" };
            println!("  {}", format!("{verb} {count} commits from {repo}").green());
        }
        SyncEvent::UpToDate { repo } => {
            println!("  {}", format!("{repo} is up to date").dimmed());
        }
        SyncEvent::Failed { repo, error } => {
            println!("  {} {error}", format!("Aborted {repo}:").red());
        }
    }
}

fn print_report(report: &SyncReport) {
    println!();
    match report.repository_status {
        RepositoryStatus::Created => println!("Created shadow repository {}", report.repository.cyan()),
        RepositoryStatus::Missing => println!(
            "Shadow repository {} does not exist (dry run, not created)",
            report.repository.cyan()
        ),
        RepositoryStatus::Existing => {}
    }

    let recorded = report.total_recorded();
    let failed = report.failed();
    let prefix = if report.dry_run { "[dry run] " } else { "" };
    println!(
        "{prefix}{} new commits across {} repositories in {}",
        recorded.to_string().bold(),
        report.outcomes.len(),
        report.repository.cyan()
    );
    if !failed.is_empty() {
        println!("{} {}", "Failed:".red().bold(), failed.join(", "));
    }
}
