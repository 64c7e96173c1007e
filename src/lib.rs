//! Phone number reputation checking.
//!
//! Two binaries share this crate: `didrep` looks up the spam reputation of a
//! list of phone numbers and streams the results to CSV, `tabcat` merges
//! CSV/Excel report files into one table.

pub mod backoff;
pub mod config;
mod error;
pub mod input;
pub mod limiter;
pub mod merge;
pub mod parse;
pub mod phone;
pub mod process;
pub mod record;
pub mod request;
pub mod sink;
pub mod stats;

pub use error::{Error, Result};

/// Base URL of the reputation lookup service.
pub(crate) const LOOKUP_BASE_URL: &str = "https://lookup.robokiller.com";
