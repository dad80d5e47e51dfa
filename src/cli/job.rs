//! Job command - inspect or delete the comparison job of one version

use crate::cli::session::{find_version, Session, Target};
use crate::cli::style::{check, styled_status, Stylize};
use anstream::println;
use version_compare::abort::AbortSignal;
use version_compare::api::comparison_job_id;
use version_compare::error::Result;
use version_compare::types::ComparisonJobStatus;

/// Print the job status for `version`
pub async fn run_job_status(target: Target, version: &str, signal: &AbortSignal) -> Result<()> {
    let session = Session::connect(target, signal).await?;
    let jobs = session.jobs()?;
    let loader = session.loader();
    let entry = find_version(&loader, version, signal).await?;

    let status = jobs
        .query_job_status(&loader.entries(), &entry.named_version.named_version.id, signal)
        .await?
        .unwrap_or(ComparisonJobStatus::NotStarted);

    let job_id = comparison_job_id(
        &entry.named_version.target_changeset_id,
        &jobs.context().current_changeset_id,
    );
    println!(
        "{} {}: {}",
        entry.named_version.named_version.display_name.accent(),
        job_id.muted(),
        styled_status(&status)
    );
    Ok(())
}

/// Delete the job for `version`
pub async fn run_job_delete(target: Target, version: &str, signal: &AbortSignal) -> Result<()> {
    let session = Session::connect(target, signal).await?;
    let jobs = session.jobs()?;
    let loader = session.loader();
    let entry = find_version(&loader, version, signal).await?;

    jobs.delete_job(&entry.named_version).await?;
    println!(
        "{} Deleted comparison job for {}",
        check(),
        entry.named_version.named_version.display_name.accent()
    );
    Ok(())
}
