//! HTTP fetcher for the dashboard statistics endpoint.
//!
//! Issues one authenticated `GET` per call and decodes the body into a
//! [`StatsPayload`]. Every failure mode comes back as a [`FetchError`]; the
//! fetcher never panics and never touches any cache.
//!
//! ## Example
//!
//! ```rust,no_run
//! use dashsync_adapters::http::HttpStatsSource;
//! use dashsync_adapters::token::StaticToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = HttpStatsSource::builder()
//!         .base_url("https://api.example.org")
//!         .token(StaticToken::new("session-token"))
//!         .build()?;
//!
//!     let payload = source.fetch().await?;
//!     println!("Fetched {} centers", payload.centers.len());
//!     Ok(())
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};

use dashsync_types::StatsPayload;

use crate::token::{NoToken, TokenProvider};
use crate::FetchError;

/// Default path of the statistics endpoint.
pub const DEFAULT_STATS_PATH: &str = "/dashboard/stats";

/// Fetches dashboard statistics over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStatsSource {
    client: Client,
    url: String,
    token: Arc<dyn TokenProvider>,
    description: String,
}

impl HttpStatsSource {
    /// Create a new builder for configuring the source.
    pub fn builder() -> HttpStatsSourceBuilder {
        HttpStatsSourceBuilder::default()
    }

    /// Full URL requested on each fetch.
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Perform one fetch.
    pub async fn fetch(&self) -> Result<StatsPayload, FetchError> {
        let token = self
            .token
            .bearer_token()
            .ok_or_else(|| FetchError::Auth("No bearer token available".to_string()))?;

        let response = self.client.get(&self.url).bearer_auth(token).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Auth(format!("Token rejected with status {}", status)));
        }

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        let payload: StatsPayload = serde_json::from_slice(&body)?;

        Ok(payload)
    }
}

/// Builder for HttpStatsSource.
#[derive(Debug, Default)]
pub struct HttpStatsSourceBuilder {
    base_url: Option<String>,
    path: Option<String>,
    token: Option<Arc<dyn TokenProvider>>,
    timeout: Option<Duration>,
}

impl HttpStatsSourceBuilder {
    /// Set the API base URL (e.g., "https://api.example.org").
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Set the statistics path (default: "/dashboard/stats").
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the bearer token provider (default: none, every fetch fails auth).
    pub fn token(mut self, provider: impl TokenProvider + 'static) -> Self {
        self.token = Some(Arc::new(provider));
        self
    }

    /// Share a token provider with other components.
    pub fn shared_token(mut self, provider: Arc<dyn TokenProvider>) -> Self {
        self.token = Some(provider);
        self
    }

    /// Set the request timeout (default: 10 seconds).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the source.
    pub fn build(self) -> Result<HttpStatsSource, FetchError> {
        let base_url = self
            .base_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| FetchError::Config("base URL is not set".to_string()))?;
        let path = self.path.unwrap_or_else(|| DEFAULT_STATS_PATH.to_string());
        let url = join_url(&base_url, &path);

        let timeout = self.timeout.unwrap_or(Duration::from_secs(10));
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        Ok(HttpStatsSource {
            client,
            description: format!("http: {}", url),
            url,
            token: self.token.unwrap_or_else(|| Arc::new(NoToken)),
        })
    }
}

// Join base and path with exactly one slash between them
fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
