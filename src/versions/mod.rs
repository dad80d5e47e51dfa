//! Named version list
//!
//! [`NamedVersionLoader`] pages the versions a user can compare the open
//! changeset against. [`SessionStore`] keeps loader state alive across
//! loader instances.

mod loader;
mod reducer;
mod session;

pub use loader::{LoaderEvent, LoaderKey, LoaderSnapshot, NamedVersionLoader};
pub use reducer::{mark_failed, update_job_status};
pub use session::SessionStore;
