//! vcompare - Compare named versions of an iModel
//!
//! CLI binary for listing named versions, running comparison jobs, and
//! summarizing the changed elements they find.

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use version_compare::abort::AbortController;

mod cli;

#[derive(Parser)]
#[command(name = "vcompare")]
#[command(about = "Compare named versions of an iModel")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    target: TargetArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TargetArgs {
    /// iTwin owning the iModel
    #[arg(long, env = "ITWIN_ID", global = true)]
    itwin_id: Option<String>,

    /// iModel to compare
    #[arg(long, env = "IMODEL_ID", global = true)]
    imodel_id: Option<String>,

    /// Open changeset to compare against (defaults to the latest)
    #[arg(long, env = "VCOMPARE_CHANGESET", global = true)]
    changeset: Option<String>,

    /// Access token (defaults to ITWIN_ACCESS_TOKEN or IMJS_ACCESS_TOKEN)
    #[arg(long, env = "ITWIN_ACCESS_TOKEN", hide_env_values = true, global = true)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// List named versions older than the open changeset
    Versions {
        /// Pages of versions to load
        #[arg(long, default_value_t = 1)]
        pages: usize,

        /// Load every page
        #[arg(long)]
        all: bool,

        /// Look up the comparison job of each version
        #[arg(long)]
        jobs: bool,
    },

    /// Compare a named version with the open changeset
    Compare {
        /// Named version ID or display name (prompts when omitted)
        version: Option<String>,

        /// Hide added elements
        #[arg(long)]
        no_added: bool,

        /// Hide deleted elements
        #[arg(long)]
        no_deleted: bool,

        /// Hide modified elements
        #[arg(long)]
        no_modified: bool,

        /// Keep only modifications of these kinds
        #[arg(long = "type", value_enum, value_delimiter = ',')]
        types: Vec<cli::ChangeKind>,

        /// Keep only property changes touching these properties
        #[arg(long = "property")]
        properties: Vec<String>,

        /// Start the job and exit without waiting for it
        #[arg(long)]
        no_wait: bool,

        /// Rows to print
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },

    /// Comparison job management
    Job {
        #[command(subcommand)]
        action: JobAction,
    },
}

#[derive(Subcommand)]
enum JobAction {
    /// Show the job status for a named version
    Status {
        /// Named version ID or display name
        version: String,
    },
    /// Delete the job for a named version
    Delete {
        /// Named version ID or display name
        version: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let target = cli::Target {
        itwin_id: cli.target.itwin_id,
        imodel_id: cli.target.imodel_id,
        changeset: cli.target.changeset,
        token: cli.target.token,
    };

    // Ctrl-C cancels in-flight requests and polling
    let controller = AbortController::new();
    let signal = controller.signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            controller.abort();
        }
    });

    match cli.command {
        Commands::Versions { pages, all, jobs } => {
            cli::run_versions(target, pages, all, jobs, &signal).await?;
        }
        Commands::Compare {
            version,
            no_added,
            no_deleted,
            no_modified,
            types,
            properties,
            no_wait,
            limit,
        } => {
            let flags = cli::FilterFlags {
                hide_added: no_added,
                hide_deleted: no_deleted,
                hide_modified: no_modified,
                types,
                properties,
            };
            let output = cli::CompareOutput { no_wait, limit };
            cli::run_compare(target, version.as_deref(), &flags, output, &signal).await?;
        }
        Commands::Job { action } => match action {
            JobAction::Status { version } => {
                cli::run_job_status(target, &version, &signal).await?;
            }
            JobAction::Delete { version } => {
                cli::run_job_delete(target, &version, &signal).await?;
            }
        },
    }

    Ok(())
}
