//! Lookup page fetching.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use thiserror::Error;

use crate::phone::PhoneNumber;
use crate::LOOKUP_BASE_URL;

/// Browser user agents rotated across attempts.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
];

/// Raw page response. Classification into retryable/terminal outcomes
/// happens in the runner, not here.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

/// Transport-level fetch failure.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("transport error: {0}")]
    Transport(String),
}

/// The one seam the runner talks HTTP through. Tests substitute a scripted
/// implementation.
#[async_trait]
pub trait LookupClient: Send + Sync {
    async fn fetch(&self, number: &PhoneNumber) -> Result<Page, FetchError>;
}

/// Production client for the reputation lookup endpoint.
pub struct HttpLookupClient {
    client: Client,
    base_url: String,
}

impl HttpLookupClient {
    /// Builds a client with the per-request timeout baked in.
    pub fn new(timeout: Duration) -> crate::Result<Self> {
        Self::with_base_url(LOOKUP_BASE_URL, timeout)
    }

    /// Same as [`new`](Self::new) but against a custom endpoint.
    pub fn with_base_url(base_url: &str, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .default_headers(default_headers())
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn lookup_url(&self, number: &PhoneNumber) -> String {
        format!("{}/search?q={}", self.base_url, number)
    }
}

#[async_trait]
impl LookupClient for HttpLookupClient {
    async fn fetch(&self, number: &PhoneNumber) -> Result<Page, FetchError> {
        let response = self
            .client
            .get(self.lookup_url(number))
            .header(USER_AGENT, pick_user_agent())
            .send()
            .await
            .map_err(classify_transport)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_transport)?;
        Ok(Page { status, body })
    }
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers
}

fn pick_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
}

fn classify_transport(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Connect(e.to_string())
    } else {
        FetchError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_url_appends_the_number_as_query() {
        let client =
            HttpLookupClient::with_base_url("http://localhost:9", Duration::from_secs(1)).unwrap();
        let number = PhoneNumber::parse("555-123-4567").unwrap();
        assert_eq!(
            client.lookup_url(&number),
            "http://localhost:9/search?q=5551234567"
        );
    }

    #[test]
    fn trailing_slash_in_base_url_is_trimmed() {
        let client =
            HttpLookupClient::with_base_url("http://localhost:9/", Duration::from_secs(1)).unwrap();
        let number = PhoneNumber::parse("5551234567").unwrap();
        assert_eq!(
            client.lookup_url(&number),
            "http://localhost:9/search?q=5551234567"
        );
    }

    #[test]
    fn user_agent_pool_is_usable() {
        for _ in 0..32 {
            let agent = pick_user_agent();
            assert!(USER_AGENTS.contains(&agent));
            assert!(agent.starts_with("Mozilla/5.0"));
        }
    }
}
