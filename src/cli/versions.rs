//! Versions command - list named versions older than the open changeset

use crate::cli::session::{load_pages, Session, Target};
use crate::cli::style::{arrow, bullet, styled_status, Stylize};
use anstream::println;
use version_compare::abort::AbortSignal;
use version_compare::error::Result;
use version_compare::types::ComparisonJobStatus;

/// Run the versions command
///
/// Loads `pages` pages (every page when `all`), then prints each version
/// with the changeset a comparison would start from. With `jobs`, looks up
/// the comparison job of every listed version.
pub async fn run_versions(
    target: Target,
    pages: usize,
    all: bool,
    jobs: bool,
    signal: &AbortSignal,
) -> Result<()> {
    let session = Session::connect(target, signal).await?;
    let loader = session.loader();
    load_pages(&loader, (!all).then_some(pages), signal).await?;

    if jobs {
        let orchestrator = session.jobs()?;
        let entries = loader.entries();
        for entry in &entries {
            let id = &entry.named_version.named_version.id;
            let status = orchestrator
                .query_job_status(&entries, id, signal)
                .await?
                .unwrap_or(ComparisonJobStatus::NotStarted);
            loader.update_job_status(id, status);
        }
    }

    let snapshot = loader.snapshot();
    if let Some(current) = &snapshot.current_named_version {
        let version = &current.named_version;
        let marker = if current.is_synthetic {
            " (no named version)".muted().to_string()
        } else {
            String::new()
        };
        println!(
            "{} {}{}",
            "Open version:".emphasis(),
            version.display_name.accent(),
            marker
        );
        println!(
            "  {}",
            format!("changeset #{} {}", version.changeset_index, version.changeset_id).muted()
        );
        println!();
    }

    if snapshot.entries.is_empty() {
        println!("{}", "No older named versions to compare with".muted());
        return Ok(());
    }

    println!("{}", "Named versions".emphasis());
    for entry in &snapshot.entries {
        let version = &entry.named_version.named_version;
        println!(
            "{} {} {}",
            bullet(),
            version.display_name.accent(),
            format!("#{} {}", version.changeset_index, version.created_date_time.format("%Y-%m-%d"))
                .muted()
        );
        println!(
            "    {} compare from {}",
            arrow(),
            entry.named_version.target_changeset_id.muted()
        );
        if let Some(status) = &entry.job {
            println!("    job: {}", styled_status(status));
        }
    }

    if snapshot.has_next_page {
        println!();
        println!("{}", "More versions available: pass --all to list every one".muted());
    }
    Ok(())
}
