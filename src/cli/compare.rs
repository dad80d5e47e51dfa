//! Compare command - run a comparison and summarize the changed elements

use crate::cli::progress::SpinnerProgress;
use crate::cli::session::{find_version, load_pages, Session, Target};
use crate::cli::style::{arrow, styled_opcode, styled_status, Stylize};
use anstream::println;
use async_trait::async_trait;
use clap::ValueEnum;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use std::collections::HashMap;
use std::sync::Arc;
use version_compare::abort::AbortSignal;
use version_compare::elements::{ChangedElementsManager, ElementConnection, ElementKey};
use version_compare::error::{Error, Result};
use version_compare::filter::FilterOptions;
use version_compare::types::{ChangedElementEntry, JobState, TypeOfChange, VersionCompareEntry};

/// Type of change selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChangeKind {
    /// Geometry changed
    Geometry,
    /// Placement changed
    Placement,
    /// Properties changed
    Property,
    /// Changed only through a child
    Indirect,
    /// Hidden properties changed
    Hidden,
}

impl ChangeKind {
    const fn bits(self) -> TypeOfChange {
        match self {
            Self::Geometry => TypeOfChange::GEOMETRY,
            Self::Placement => TypeOfChange::PLACEMENT,
            Self::Property => TypeOfChange::PROPERTY,
            Self::Indirect => TypeOfChange::INDIRECT,
            Self::Hidden => TypeOfChange::HIDDEN,
        }
    }
}

/// Filter flags of the compare command
#[derive(Debug, Clone, Default)]
pub struct FilterFlags {
    /// Hide inserted elements
    pub hide_added: bool,
    /// Hide deleted elements
    pub hide_deleted: bool,
    /// Hide modified elements
    pub hide_modified: bool,
    /// Keep only modifications of these kinds (all when empty)
    pub types: Vec<ChangeKind>,
    /// Keep only property changes touching these properties (all when empty)
    pub properties: Vec<String>,
}

/// Output options of the compare command
#[derive(Debug, Clone, Copy)]
pub struct CompareOutput {
    /// Stop after starting the job
    pub no_wait: bool,
    /// Rows to print
    pub limit: usize,
}

/// Element lookups need an opened iModel, which the CLI never has. The
/// summary only uses data from the comparison result itself.
struct Offline;

#[async_trait]
impl ElementConnection for Offline {
    async fn element_labels(&self, _keys: &[ElementKey]) -> Result<Vec<String>> {
        Err(Error::Internal("element labels need an opened iModel".to_string()))
    }

    async fn direct_children(
        &self,
        _element_ids: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        Err(Error::Internal("element children need an opened iModel".to_string()))
    }
}

/// Run the compare command
///
/// Without `version`, the user picks from the first page of versions.
pub async fn run_compare(
    target: Target,
    version: Option<&str>,
    flags: &FilterFlags,
    output: CompareOutput,
    signal: &AbortSignal,
) -> Result<()> {
    let session = Session::connect(target, signal).await?;
    let jobs = session.jobs()?;
    let loader = session.loader();

    let entry = match version {
        Some(query) => find_version(&loader, query, signal).await?,
        None => {
            load_pages(&loader, Some(1), signal).await?;
            pick_version(loader.entries())?
        }
    };
    let version = &entry.named_version;

    if output.no_wait {
        let started = jobs.start_job(version, signal).await?;
        println!(
            "{} {}: {}",
            version.named_version.display_name.accent(),
            started.job.id.muted(),
            styled_status(&started.status())
        );
        return Ok(());
    }

    let progress = SpinnerProgress::start();
    let finished = jobs
        .run(version, session.config.polling_interval, &progress, signal)
        .await;
    progress.finish();
    let job = finished?;

    if job.status == JobState::Failed {
        return Err(Error::ComparisonFailed {
            job_id: job.id,
            details: job.error_details.unwrap_or_default(),
        });
    }

    let payload = jobs.get_result(&job, signal).await?;
    let mut manager = ChangedElementsManager::new();
    let offline: Arc<dyn ElementConnection> = Arc::new(Offline);
    manager.load_payload(offline.clone(), offline, payload)?;

    print_summary(&manager, flags, output.limit);
    Ok(())
}

fn pick_version(entries: Vec<VersionCompareEntry>) -> Result<VersionCompareEntry> {
    if entries.is_empty() {
        return Err(Error::VersionNotFound(
            "no older named versions to compare with".to_string(),
        ));
    }

    let items: Vec<String> = entries
        .iter()
        .map(|e| {
            let version = &e.named_version.named_version;
            format!("{} (#{})", version.display_name, version.changeset_index)
        })
        .collect();

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Compare the open changeset with")
        .default(0)
        .items(&items)
        .interact()
        .map_err(|e| Error::Config(format!("failed to read selection: {e}")))?;

    entries
        .into_iter()
        .nth(selection)
        .ok_or_else(|| Error::Internal(format!("selection {selection} out of range")))
}

/// Apply command line flags on top of the show-everything options
fn filter_options(manager: &ChangedElementsManager, flags: &FilterFlags) -> FilterOptions {
    let mut options = manager.default_filter_options();
    options.want_added = !flags.hide_added;
    options.want_deleted = !flags.hide_deleted;
    options.want_modified = !flags.hide_modified;

    if !flags.types.is_empty() {
        options.wanted_type_of_change = flags
            .types
            .iter()
            .fold(TypeOfChange::empty(), |bits, kind| bits | kind.bits());
    }

    if !flags.properties.is_empty() {
        options.want_property_filtering = true;
        for (name, visible) in &mut options.wanted_properties {
            *visible = flags.properties.contains(name);
        }
    }
    options
}

fn print_summary(manager: &ChangedElementsManager, flags: &FilterFlags, limit: usize) {
    let counts = manager.counts();
    println!(
        "{} {} changed elements: {} added, {} modified, {} deleted",
        "Result:".emphasis(),
        counts.total().accent(),
        counts.added.success(),
        counts.modified.warn().for_stdout(),
        counts.deleted.error().for_stdout()
    );

    let options = filter_options(manager, flags);
    let shown: Vec<&ChangedElementEntry> = match manager.filter_root_entries(&options) {
        Some(ids) => ids.iter().filter_map(|id| manager.entry(id)).collect(),
        None => manager.cache().root_entries().collect(),
    };

    if shown.is_empty() {
        println!("{}", "No changed elements match the filter".muted());
        return;
    }

    println!();
    for entry in shown.iter().take(limit) {
        let children = if entry.children.is_empty() {
            String::new()
        } else {
            format!(" +{} changed children", entry.children.len())
                .muted()
                .to_string()
        };
        println!(
            "{} {} {}{}",
            arrow(),
            styled_opcode(entry.opcode),
            entry.id.accent(),
            children
        );
        if !entry.properties.is_empty() {
            let names: Vec<&str> = entry.properties.keys().map(String::as_str).collect();
            println!("    {}", names.join(", ").muted());
        }
    }

    if shown.len() > limit {
        println!();
        println!(
            "{}",
            format!("{} more rows, raise --limit to see them", shown.len() - limit).muted()
        );
    }
}
