//! Phone number cleaning and validation.

use std::fmt;

/// Digits in a valid US number, country code excluded.
pub const US_PHONE_DIGITS: usize = 10;

/// A validated, digits-only US phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Cleans `raw` and accepts it if exactly ten digits remain.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = clean_number(raw);
        (digits.len() == US_PHONE_DIGITS).then_some(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Strips everything that isn't an ASCII digit. Idempotent.
pub fn clean_number(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}
