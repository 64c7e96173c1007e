//! Input list loading.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::phone::{clean_number, PhoneNumber};
use crate::{Error, Result};

/// One usable line of the input file.
#[derive(Debug, Clone)]
pub struct InputEntry {
    /// What the output row reports for this line: the cleaned digits when any
    /// survive cleaning, otherwise the raw field.
    pub label: String,
    /// Present when the line cleaned up to exactly ten digits.
    pub number: Option<PhoneNumber>,
}

/// Reads the input list. The first non-blank line is dropped when it looks
/// like a header, blank lines are skipped, everything else becomes an entry.
///
/// A missing or unreadable file is fatal; per-line problems are not.
pub fn read_entries(path: &Path) -> Result<Vec<InputEntry>> {
    let text = fs::read_to_string(path).map_err(|source| Error::Input {
        path: path.display().to_string(),
        source,
    })?;
    Ok(entries_from_text(&text))
}

fn entries_from_text(text: &str) -> Vec<InputEntry> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut entries = Vec::new();
    let mut first_line = true;
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let field = first_field(line);
        if first_line {
            first_line = false;
            if looks_like_header(field) {
                debug!(line, "skipping header line");
                continue;
            }
        }
        entries.push(entry_from_field(field));
    }
    entries
}

/// Takes the first comma-separated column and strips surrounding quotes.
fn first_field(line: &str) -> &str {
    let field = line.split(',').next().unwrap_or(line).trim();
    field.trim_matches(|c| c == '"' || c == '\'').trim()
}

/// A first line is a header when its leading field reads like a column name:
/// it contains letters, or no digits at all. A short digit string such as
/// `123` is data (an invalid entry), not a header.
fn looks_like_header(field: &str) -> bool {
    field.chars().any(|c| c.is_ascii_alphabetic()) || !field.chars().any(|c| c.is_ascii_digit())
}

fn entry_from_field(field: &str) -> InputEntry {
    let digits = clean_number(field);
    let number = PhoneNumber::parse(field);
    let label = if digits.is_empty() {
        field.to_string()
    } else {
        digits
    };
    InputEntry { label, number }
}
