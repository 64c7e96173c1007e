//! Run configuration for the lookup batch runner.

use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// Immutable settings for one run. Built once at startup from the CLI and
/// passed by reference afterwards.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    /// Maximum lookups in flight at once.
    pub concurrent_requests: usize,
    /// Per-request deadline, not per number including retries.
    pub timeout: Duration,
    /// Retries after the first attempt, so a number gets at most
    /// `1 + max_retries` attempts.
    pub max_retries: u32,
    /// Global request-start budget shared by all tasks. Fractional rates are
    /// allowed.
    pub requests_per_second: f64,
    /// Rows per output flush and per progress report.
    pub batch_size: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_file: PathBuf::from("numbers.csv"),
            output_file: PathBuf::from("results.csv"),
            concurrent_requests: 30,
            timeout: Duration::from_secs(15),
            max_retries: 2,
            requests_per_second: 5.0,
            batch_size: 100,
        }
    }
}

impl RunConfig {
    /// Rejects unusable settings, returns warnings for legal but risky ones.
    pub fn validate(&self) -> Result<Vec<String>> {
        if self.concurrent_requests == 0 {
            return Err(Error::Config("concurrent_requests must be at least 1".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be at least 1".into()));
        }
        if !self.requests_per_second.is_finite() || self.requests_per_second <= 0.0 {
            return Err(Error::Config("requests_per_second must be positive".into()));
        }
        if self.timeout.is_zero() {
            return Err(Error::Config("timeout must be positive".into()));
        }

        let mut warnings = Vec::new();
        if self.requests_per_second > 10.0 {
            warnings.push(format!(
                "requests_per_second = {} is aggressive and may get the client blocked",
                self.requests_per_second
            ));
        }
        if self.batch_size < 10 {
            warnings.push(format!("batch_size = {} flushes very often", self.batch_size));
        }
        Ok(warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid_without_warnings() {
        let warnings = RunConfig::default().validate().unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn zero_values_are_rejected() {
        let mut config = RunConfig {
            concurrent_requests: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());

        config = RunConfig {
            batch_size: 0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());

        config = RunConfig {
            requests_per_second: 0.0,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());

        config = RunConfig {
            timeout: Duration::ZERO,
            ..RunConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn risky_settings_only_warn() {
        let config = RunConfig {
            requests_per_second: 50.0,
            batch_size: 2,
            ..RunConfig::default()
        };
        let warnings = config.validate().unwrap();
        assert_eq!(warnings.len(), 2);
    }
}
