//! Lookup page field extraction.
//!
//! Everything the crate knows about the lookup page's markup lives here.
//! Each field has an ordered list of selector fallbacks so a small markup
//! change degrades to `Not Found` instead of breaking the run.

use scraper::{Html, Selector};
use tokio::task::spawn_blocking;

use crate::{Error, Result};

/// Reputation value used when the page parsed but listed nothing.
pub const NOT_FOUND: &str = "Not Found";

/// Responses smaller than this are empty shells, not listings.
pub const MIN_PAGE_BYTES: usize = 1000;

/// Fragments that mark an anti-bot interstitial rather than a listing.
const BLOCK_INDICATORS: &[&str] = &[
    "captcha",
    "access denied",
    "cloudflare",
    "security check",
    "robot",
    "blocked",
    "please verify",
    "unusual traffic",
];

// TODO: load the fallback lists from a file so a markup change doesn't need
// a rebuild.
const REPUTATION_SELECTORS: &[&str] = &[
    "div#userReputation h3",
    r#"div[class*="reputation"] h3"#,
    r#"span[class*="reputation"]"#,
];
const USER_REPORTS_SELECTORS: &[&str] = &["div#userReports h3", r#"div[class*="reports"] h3"#];
const TOTAL_CALLS_SELECTORS: &[&str] = &["div#totalCall h3", r#"div[class*="calls"] h3"#];
const LAST_CALL_SELECTORS: &[&str] = &["div#lastCall h3", r#"div[class*="last"] h3"#];

/// Fields scraped from one lookup page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub reputation: String,
    pub user_reports: String,
    pub total_calls: String,
    pub last_call: String,
}

/// True when the body looks like a block page instead of a listing.
pub fn is_block_page(body: &str) -> bool {
    let lower = body.to_lowercase();
    BLOCK_INDICATORS.iter().any(|ind| lower.contains(ind))
}

/// Parses the page on a blocking thread and pulls out the listing fields.
///
/// A page without a reputation section yields [`NOT_FOUND`]; that is data,
/// not an error.
pub async fn extract_listing(body: String) -> Result<Listing> {
    let listing = spawn_blocking(move || -> Result<Listing> {
        let doc = Html::parse_document(&body);
        Ok(Listing {
            reputation: select_first(&doc, REPUTATION_SELECTORS)?
                .unwrap_or_else(|| NOT_FOUND.to_string()),
            user_reports: select_first(&doc, USER_REPORTS_SELECTORS)?.unwrap_or_default(),
            total_calls: select_first(&doc, TOTAL_CALLS_SELECTORS)?.unwrap_or_default(),
            last_call: select_first(&doc, LAST_CALL_SELECTORS)?.unwrap_or_default(),
        })
    })
    .await??;

    Ok(listing)
}

/// Text of the first element matching any selector in `fallbacks`, tried in
/// order. Elements whose text is all whitespace don't count as matches.
fn select_first(doc: &Html, fallbacks: &[&str]) -> Result<Option<String>> {
    for sel_str in fallbacks {
        let selector = create_selector(sel_str)?;
        for element in doc.select(&selector) {
            let text = element.text().collect::<String>();
            let text = text.trim();
            if !text.is_empty() {
                return Ok(Some(text.to_string()));
            }
        }
    }
    Ok(None)
}

#[inline]
fn create_selector(sel_str: &str) -> Result<Selector> {
    Selector::parse(sel_str).map_err(|_| Error::Selector(sel_str.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING_PAGE: &str = r#"<html><body>
        <div id="userReputation"><h3>Negative</h3></div>
        <div id="userReports"><h3>27</h3></div>
        <div id="totalCall"><h3>143</h3></div>
        <div id="lastCall"><h3>2024-11-02</h3></div>
        </body></html>"#;

    #[tokio::test]
    async fn extracts_all_fields_from_a_full_page() {
        let listing = extract_listing(LISTING_PAGE.to_string()).await.unwrap();
        assert_eq!(listing.reputation, "Negative");
        assert_eq!(listing.user_reports, "27");
        assert_eq!(listing.total_calls, "143");
        assert_eq!(listing.last_call, "2024-11-02");
    }

    #[tokio::test]
    async fn falls_back_to_class_selectors() {
        let page = r#"<html><body>
            <div class="reputation-box"><h3>Neutral</h3></div>
            <div class="reports-count"><h3>3</h3></div>
            </body></html>"#;
        let listing = extract_listing(page.to_string()).await.unwrap();
        assert_eq!(listing.reputation, "Neutral");
        assert_eq!(listing.user_reports, "3");
        assert_eq!(listing.total_calls, "");
    }

    #[tokio::test]
    async fn missing_reputation_defaults_to_not_found() {
        let page = "<html><body><p>nothing here</p></body></html>";
        let listing = extract_listing(page.to_string()).await.unwrap();
        assert_eq!(listing.reputation, NOT_FOUND);
        assert_eq!(listing.user_reports, "");
        assert_eq!(listing.last_call, "");
    }

    #[tokio::test]
    async fn whitespace_only_elements_do_not_match() {
        let page = r#"<html><body>
            <div id="userReputation"><h3>   </h3></div>
            <div class="reputation-tag"><h3>Positive</h3></div>
            </body></html>"#;
        let listing = extract_listing(page.to_string()).await.unwrap();
        assert_eq!(listing.reputation, "Positive");
    }

    #[test]
    fn block_pages_are_detected() {
        assert!(is_block_page("<h1>Please complete the CAPTCHA</h1>"));
        assert!(is_block_page("Checking your browser - Cloudflare"));
        assert!(is_block_page("Access Denied"));
        assert!(!is_block_page(LISTING_PAGE));
    }
}
