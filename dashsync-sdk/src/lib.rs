//! # dashsync-sdk
//!
//! Polling engine that keeps dashboard observers in sync with a remote
//! statistics endpoint.
//!
//! A [`Dashboard`] polls a [`StatsSource`] on a timer, derives totals and
//! percentages from each payload, caches the last good result and hands
//! every observer the same [`Snapshot`]. When a fetch fails observers get
//! the cached data tagged stale while it is younger than the freshness
//! window, and zeroed fallback defaults after that.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dashsync_sdk::{Dashboard, PollMode, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SyncConfig::load(None)?;
//!
//!     let dashboard = Dashboard::builder(config.http_source()?)
//!         .frequencies(config.frequency_table())
//!         .freshness_window(config.freshness_window())
//!         .mode(config.mode)
//!         .on_unauthorized(|_| eprintln!("session expired"))
//!         .build();
//!
//!     let subscription = dashboard.subscribe(|snapshot| {
//!         println!("{}: {:?}", snapshot.freshness.as_str(), snapshot.stats);
//!     });
//!
//!     dashboard.start(dashboard.interval());
//!
//!     // Speed up while someone is looking at the page
//!     dashboard.set_frequency(PollMode::High);
//!     let latest = dashboard.refresh_now().await;
//!     println!("live: {}", latest.is_live());
//!
//!     subscription.unsubscribe();
//!     dashboard.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Single timer**: restarting never stacks timers; mode changes that keep
//!   the same interval leave the timer alone
//! - **No overlapping fetches**: `refresh_now()` during a tick shares its result
//! - **Stale-while-failing**: cached data for 120 s by default, then fallback
//! - **Isolated fan-out**: a panicking observer does not affect the others

mod cache;
mod clock;
mod config;
mod dashboard;
mod enhance;
mod frequency;
mod registry;
mod source;

#[cfg(test)]
mod testing;

pub use cache::{SnapshotCache, DEFAULT_FRESHNESS_WINDOW};
pub use clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{ConfigError, IntervalConfig, SyncConfig, ENV_PREFIX};
pub use dashboard::{Dashboard, DashboardBuilder, FrequencyChange, SchedulerState};
pub use enhance::{derive_group, derive_stats, enhance, order_events};
pub use frequency::{FrequencyController, FrequencyTable, PollMode, UnknownMode, MIN_INTERVAL};
pub use registry::{SubscriberRegistry, Subscription};
pub use source::{timed_fetch, FetchOutcome, StatsSource};

// Re-export types for convenience
pub use dashsync_adapters::FetchError;
pub use dashsync_types::{
    keys, ActivityRecord, FailureKind, FetchFailure, Freshness, GroupStats, Milliseconds,
    Snapshot, StatsPayload,
};
