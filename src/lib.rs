//! version-compare - Compare named versions of an iModel
//!
//! Library behind the `vcompare` binary:
//!
//! - [`versions`]: page the named versions older than the open changeset and
//!   pair each with the changeset a comparison starts from
//! - [`comparison`]: get or create comparison jobs and poll them to the end
//! - [`elements`]: hold a comparison result, load labels and children lazily
//! - [`filter`]: decide which changed elements a view shows
//!
//! Remote services sit behind the [`api::IModelsApi`] and
//! [`api::ComparisonJobApi`] traits; cancellation goes through
//! [`abort::AbortSignal`].

pub mod abort;
pub mod api;
pub mod auth;
pub mod comparison;
pub mod config;
pub mod elements;
pub mod error;
pub mod events;
pub mod filter;
pub mod types;
pub mod versions;

pub use error::{Error, Result};
