//! Spinner progress for comparison jobs

use crate::cli::style::{check, cross, hyperlink_url, spinner_style, Stream, Stylize};
use async_trait::async_trait;
use indicatif::ProgressBar;
use std::time::Duration;
use version_compare::comparison::ComparisonProgress;
use version_compare::types::ComparisonJobStatus;

/// Shows job state on a spinner while `compare` waits
///
/// Terminal states are printed above the spinner so they stay on screen.
pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    /// Start a ticking spinner
    pub fn start() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(spinner_style());
        bar.enable_steady_tick(Duration::from_millis(80));
        Self { bar }
    }

    /// Remove the spinner
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[async_trait]
impl ComparisonProgress for SpinnerProgress {
    async fn on_status(&self, status: &ComparisonJobStatus) {
        match status {
            ComparisonJobStatus::NotStarted => self.bar.set_message("Preparing comparison"),
            ComparisonJobStatus::Queued { job_id } => {
                self.bar
                    .set_message(format!("Job {} queued", job_id.accent()));
            }
            ComparisonJobStatus::Started { job_id, progress } => {
                self.bar.set_message(format!(
                    "Job {} computing changes {}",
                    job_id.accent(),
                    progress.muted()
                ));
            }
            ComparisonJobStatus::Completed {
                job_id,
                comparison_url,
            } => {
                self.bar
                    .println(format!("{} Job {} completed", check(), job_id.accent()));
                if !comparison_url.is_empty() {
                    self.bar.println(format!(
                        "  {}",
                        hyperlink_url(Stream::Stdout, comparison_url).muted()
                    ));
                }
            }
            ComparisonJobStatus::Failed { job_id, .. } => {
                self.bar.println(format!(
                    "{} Job {} {}",
                    cross().for_stdout(),
                    job_id.accent(),
                    status.error().for_stdout()
                ));
            }
        }
    }

    async fn on_message(&self, message: &str) {
        self.bar.set_message(message.to_string());
    }
}
