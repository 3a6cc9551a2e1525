//! Fetcher abstraction for pulling raw statistics.
//!
//! The engine only knows about [`StatsSource`]; the HTTP implementation from
//! `dashsync-adapters` plugs in behind it, and tests substitute scripted
//! sources.

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use dashsync_adapters::FetchError;
use dashsync_types::StatsPayload;
use tokio::time::Instant;

/// Trait for fetching one raw statistics payload.
///
/// Implementations must report every failure as a [`FetchError`] and must
/// not touch engine state; caching and fan-out are done by the caller.
#[async_trait]
pub trait StatsSource: Send + Sync + Debug {
    /// Perform one fetch against the remote endpoint.
    async fn fetch(&self) -> Result<StatsPayload, FetchError>;

    /// Returns a human-readable description of the source.
    ///
    /// Used in log lines.
    fn description(&self) -> &str;
}

#[cfg(feature = "http")]
#[async_trait]
impl StatsSource for dashsync_adapters::http::HttpStatsSource {
    async fn fetch(&self) -> Result<StatsPayload, FetchError> {
        dashsync_adapters::http::HttpStatsSource::fetch(self).await
    }

    fn description(&self) -> &str {
        dashsync_adapters::http::HttpStatsSource::description(self)
    }
}

/// Result of one fetch together with how long it took.
#[derive(Debug)]
pub struct FetchOutcome {
    pub result: Result<StatsPayload, FetchError>,
    pub duration: Duration,
}

/// Run a single fetch and measure its latency.
pub async fn timed_fetch(source: &dyn StatsSource) -> FetchOutcome {
    let started = Instant::now();
    let result = source.fetch().await;
    FetchOutcome {
        result,
        duration: started.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedSource, Step};

    #[tokio::test(start_paused = true)]
    async fn timed_fetch_measures_latency() {
        let source =
            ScriptedSource::new(vec![Step::payload()]).with_delay(Duration::from_millis(250));

        let outcome = timed_fetch(&source).await;

        assert!(outcome.result.is_ok());
        assert!(outcome.duration >= Duration::from_millis(250));
        assert!(outcome.duration < Duration::from_millis(260));
    }

    #[tokio::test]
    async fn timed_fetch_passes_errors_through() {
        let source = ScriptedSource::new(vec![Step::Network]);

        let outcome = timed_fetch(&source).await;

        assert!(matches!(outcome.result, Err(FetchError::Connection(_))));
    }
}
