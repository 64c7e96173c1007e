//! Output row type for the results CSV.

use chrono::Local;
use serde::Serialize;

use crate::parse::Listing;

/// Markers stored in the `reputation` column of failed rows.
pub mod marker {
    pub const INVALID: &str = "Invalid";
    pub const BLOCKED: &str = "Blocked";
    pub const EMPTY_RESPONSE: &str = "Empty Response";
    pub const PARSE_ERROR: &str = "Parse Error";
    pub const ERROR: &str = "Error";
}

/// One CSV row. Created once per input number and never updated afterwards.
/// Field order is the output column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub phone_number: String,
    pub reputation: String,
    pub user_reports: String,
    pub total_calls: String,
    pub last_call: String,
    pub scraped_at: String,
}

impl LookupResult {
    /// Row for a successfully scraped page.
    pub fn success(number: &str, listing: Listing) -> Self {
        Self {
            phone_number: number.to_string(),
            reputation: listing.reputation,
            user_reports: listing.user_reports,
            total_calls: listing.total_calls,
            last_call: listing.last_call,
            scraped_at: now_stamp(),
        }
    }

    /// Row for a number that never produced usable data. `reason` lands in
    /// the reputation column, the data fields stay empty.
    pub fn failed(number: &str, reason: &str) -> Self {
        Self {
            phone_number: number.to_string(),
            reputation: reason.to_string(),
            user_reports: String::new(),
            total_calls: String::new(),
            last_call: String::new(),
            scraped_at: now_stamp(),
        }
    }
}

fn now_stamp() -> String {
    Local::now().to_rfc3339()
}
