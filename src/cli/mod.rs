//! CLI commands
//!
//! Command implementations for the `vcompare` binary.

mod compare;
mod job;
mod progress;
mod session;
mod style;
mod versions;

pub use compare::{run_compare, ChangeKind, CompareOutput, FilterFlags};
pub use job::{run_job_delete, run_job_status};
pub use session::Target;
pub use versions::run_versions;
