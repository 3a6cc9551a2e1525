//! Snapshot - the unit of dashboard state delivered to observers.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::{keys, ActivityRecord, FetchFailure, GroupStats, GroupStatsBuilder, Milliseconds, StatsMap};

/// Where a snapshot's data came from.
///
/// Every snapshot handed to an observer carries exactly one of these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Freshness {
    /// Produced by a fetch that just succeeded.
    Live,
    /// Served from cache after a failed fetch, still inside the freshness window.
    Stale,
    /// Synthetic zeroed defaults; no usable cache existed.
    Fallback,
}

impl Freshness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::Live => "live",
            Freshness::Stale => "stale",
            Freshness::Fallback => "fallback",
        }
    }
}

/// A point-in-time view of the dashboard statistics.
///
/// Snapshots are immutable once published: the cache replaces them wholesale
/// and observers receive them behind an `Arc`.
///
/// # Example
///
/// ```rust
/// use dashsync_types::{keys, FailureKind, FetchFailure, Freshness, Milliseconds, Snapshot};
///
/// let failure = FetchFailure::new(FailureKind::Network, "connection refused");
/// let fallback = Snapshot::fallback(failure, 1_700_000_000_000, Milliseconds::from_millis(12));
///
/// assert_eq!(fallback.freshness, Freshness::Fallback);
/// assert!(!fallback.is_live());
/// assert_eq!(fallback.stat(keys::TOTAL_BENEFICIARIES), 0.0);
/// assert!(fallback.error.is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Snapshot {
    /// Named counters and derived metrics.
    pub stats: StatsMap,

    /// Per-center breakdowns keyed by center identifier.
    pub group_stats: BTreeMap<String, GroupStats>,

    /// Activity feed, most recent first.
    pub recent_events: Vec<ActivityRecord>,

    /// Unix timestamp in milliseconds when the data was fetched.
    pub fetched_at_ms: u64,

    pub freshness: Freshness,

    /// Latency of the fetch that produced this snapshot (diagnostic only).
    pub fetch_duration: Milliseconds,

    /// Why this snapshot is not live. Never set on live snapshots.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub error: Option<FetchFailure>,
}

impl Snapshot {
    /// Create a builder for live snapshots.
    pub fn builder() -> SnapshotBuilder {
        SnapshotBuilder::new()
    }

    /// The documented fallback: every known stat at zero, no groups, no events.
    pub fn fallback(error: FetchFailure, at_ms: u64, fetch_duration: Milliseconds) -> Self {
        Self {
            stats: default_stats(),
            group_stats: BTreeMap::new(),
            recent_events: Vec::new(),
            fetched_at_ms: at_ms,
            freshness: Freshness::Fallback,
            fetch_duration,
            error: Some(error),
        }
    }

    /// Copy of this snapshot tagged stale, carrying the failure that caused it.
    pub fn to_stale(&self, error: FetchFailure) -> Self {
        Self {
            freshness: Freshness::Stale,
            error: Some(error),
            ..self.clone()
        }
    }

    /// True only for snapshots from a fetch that just succeeded.
    pub fn is_live(&self) -> bool {
        self.freshness == Freshness::Live
    }

    /// Whether observers should show an offline indicator.
    pub fn is_degraded(&self) -> bool {
        !self.is_live()
    }

    /// Read a stat, treating missing values as zero.
    pub fn stat(&self, key: &str) -> f64 {
        self.stats.get(key).copied().unwrap_or(0.0)
    }

    /// Milliseconds elapsed since the data was fetched.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.fetched_at_ms)
    }
}

/// The stats map of a fallback snapshot.
pub fn default_stats() -> StatsMap {
    keys::all().map(|k| (String::from(k), 0.0)).collect()
}

/// Builder for constructing live `Snapshot` instances.
#[derive(Debug)]
pub struct SnapshotBuilder {
    timestamp_ms: Option<u64>,
    stats: StatsMap,
    group_stats: BTreeMap<String, GroupStats>,
    recent_events: Vec<ActivityRecord>,
    fetch_duration: Milliseconds,
}

impl SnapshotBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            timestamp_ms: None,
            stats: StatsMap::new(),
            group_stats: BTreeMap::new(),
            recent_events: Vec::new(),
            fetch_duration: Milliseconds::default(),
        }
    }

    /// Set a specific timestamp (milliseconds since Unix epoch).
    pub fn timestamp_ms(mut self, ts: u64) -> Self {
        self.timestamp_ms = Some(ts);
        self
    }

    /// Set one named stat.
    pub fn stat(mut self, key: impl Into<String>, value: f64) -> Self {
        self.stats.insert(key.into(), value);
        self
    }

    /// Replace all stats.
    pub fn stats(mut self, stats: StatsMap) -> Self {
        self.stats = stats;
        self
    }

    /// Add a group built using a closure.
    pub fn group<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(GroupStatsBuilder) -> GroupStatsBuilder,
    {
        let group = f(GroupStats::builder()).build();
        self.group_stats.insert(name.into(), group);
        self
    }

    /// Add a group with pre-built stats.
    pub fn group_stats(mut self, name: impl Into<String>, group: GroupStats) -> Self {
        self.group_stats.insert(name.into(), group);
        self
    }

    /// Append an activity record. Order is kept as given.
    pub fn event(mut self, record: ActivityRecord) -> Self {
        self.recent_events.push(record);
        self
    }

    /// Replace the activity feed.
    pub fn events(mut self, records: Vec<ActivityRecord>) -> Self {
        self.recent_events = records;
        self
    }

    pub fn fetch_duration(mut self, duration: impl Into<Milliseconds>) -> Self {
        self.fetch_duration = duration.into();
        self
    }

    /// Build the snapshot.
    #[cfg(feature = "std")]
    pub fn build(self) -> Snapshot {
        let ts = self.timestamp_ms.unwrap_or_else(current_timestamp_ms);
        self.finish(ts)
    }

    /// Build the snapshot with a specific timestamp (for no_std).
    #[cfg(not(feature = "std"))]
    pub fn build(self) -> Snapshot {
        let ts = self.timestamp_ms.unwrap_or(0);
        self.finish(ts)
    }

    fn finish(self, fetched_at_ms: u64) -> Snapshot {
        Snapshot {
            stats: self.stats,
            group_stats: self.group_stats,
            recent_events: self.recent_events,
            fetched_at_ms,
            freshness: Freshness::Live,
            fetch_duration: self.fetch_duration,
            error: None,
        }
    }
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Get current timestamp in milliseconds since Unix epoch.
#[cfg(feature = "std")]
pub fn current_timestamp_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
