//! Last-known-good snapshot and the staleness policy applied on failure.

use std::sync::Arc;
use std::time::Duration;

use dashsync_types::{FetchFailure, Freshness, Milliseconds, Snapshot};
use parking_lot::RwLock;

/// Default freshness window: cached data older than this is not served.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(120);

/// Holds the most recent successfully fetched snapshot.
///
/// Only live snapshots are ever written. Entries are replaced wholesale and
/// never mutated in place; readers get either the shared `Arc` or a re-tagged
/// copy.
#[derive(Debug, Default)]
pub struct SnapshotCache {
    state: RwLock<CacheState>,
}

#[derive(Debug, Default)]
struct CacheState {
    current: Option<Arc<Snapshot>>,
    /// Latest `fetched_at_ms` ever stored. Survives `clear()`.
    high_water_ms: u64,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a freshly enhanced snapshot, stamping it with `now_ms`.
    ///
    /// The stored timestamp never moves backward: if the clock reads earlier
    /// than any previous entry, including one since cleared, the previous
    /// timestamp is kept.
    pub fn write(&self, mut snapshot: Snapshot, now_ms: u64) -> Arc<Snapshot> {
        let mut state = self.state.write();
        snapshot.fetched_at_ms = now_ms.max(state.high_water_ms);
        state.high_water_ms = snapshot.fetched_at_ms;

        let snapshot = Arc::new(snapshot);
        state.current = Some(snapshot.clone());
        snapshot
    }

    /// A stale-tagged copy of the cached snapshot if it is younger than `window`.
    pub fn read_if_fresh(&self, now_ms: u64, window: Duration) -> Option<Snapshot> {
        self.fresh_entry(now_ms, window).map(|cached| Snapshot {
            freshness: Freshness::Stale,
            ..Snapshot::clone(&cached)
        })
    }

    /// What to deliver after a failed fetch.
    ///
    /// Serves the cached snapshot tagged stale while it is fresh, otherwise
    /// the fallback defaults. Either way `error` is attached.
    pub fn degrade(
        &self,
        error: FetchFailure,
        now_ms: u64,
        window: Duration,
        fetch_duration: Milliseconds,
    ) -> Snapshot {
        match self.fresh_entry(now_ms, window) {
            Some(cached) => cached.to_stale(error),
            None => Snapshot::fallback(error, now_ms, fetch_duration),
        }
    }

    fn fresh_entry(&self, now_ms: u64, window: Duration) -> Option<Arc<Snapshot>> {
        let state = self.state.read();
        let cached = state.current.as_ref()?;
        (u128::from(cached.age_ms(now_ms)) < window.as_millis()).then(|| cached.clone())
    }

    /// The cached live snapshot, regardless of age.
    pub fn peek(&self) -> Option<Arc<Snapshot>> {
        self.state.read().current.clone()
    }

    /// Drop the cached snapshot.
    pub fn clear(&self) {
        self.state.write().current.take();
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().current.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashsync_types::{keys, FailureKind};

    const T: u64 = 1_700_000_000_000;

    fn live(children: f64) -> Snapshot {
        Snapshot::builder().stat(keys::CHILDREN, children).build()
    }

    fn network() -> FetchFailure {
        FetchFailure::new(FailureKind::Network, "connection refused")
    }

    #[test]
    fn write_stamps_fetch_time() {
        let cache = SnapshotCache::new();
        let stored = cache.write(live(1.0), T);
        assert_eq!(stored.fetched_at_ms, T);
        assert!(Arc::ptr_eq(&stored, &cache.peek().unwrap()));
    }

    #[test]
    fn fetched_at_never_moves_backward() {
        let cache = SnapshotCache::new();
        cache.write(live(1.0), T);

        let stored = cache.write(live(2.0), T - 5_000);

        assert_eq!(stored.fetched_at_ms, T);
        assert_eq!(stored.stat(keys::CHILDREN), 2.0);
    }

    #[test]
    fn fresh_entry_is_served_stale() {
        let cache = SnapshotCache::new();
        cache.write(live(7.0), T);

        let stale = cache
            .read_if_fresh(T + 60_000, DEFAULT_FRESHNESS_WINDOW)
            .unwrap();

        assert_eq!(stale.freshness, Freshness::Stale);
        assert_eq!(stale.stat(keys::CHILDREN), 7.0);
        assert_eq!(stale.fetched_at_ms, T);
    }

    #[test]
    fn expired_entry_is_not_served() {
        let cache = SnapshotCache::new();
        cache.write(live(7.0), T);

        assert!(cache
            .read_if_fresh(T + 121_000, DEFAULT_FRESHNESS_WINDOW)
            .is_none());
    }

    #[test]
    fn window_boundary_is_exclusive() {
        let cache = SnapshotCache::new();
        cache.write(live(7.0), T);

        assert!(cache.read_if_fresh(T + 119_999, DEFAULT_FRESHNESS_WINDOW).is_some());
        assert!(cache.read_if_fresh(T + 120_000, DEFAULT_FRESHNESS_WINDOW).is_none());
    }

    #[test]
    fn degrade_prefers_fresh_cache() {
        let cache = SnapshotCache::new();
        cache.write(live(7.0), T);

        let snapshot = cache.degrade(
            network(),
            T + 60_000,
            DEFAULT_FRESHNESS_WINDOW,
            Milliseconds::from_millis(30),
        );

        assert_eq!(snapshot.freshness, Freshness::Stale);
        assert_eq!(snapshot.error, Some(network()));
        assert_eq!(snapshot.stat(keys::CHILDREN), 7.0);

        // The cached entry itself is untouched.
        let cached = cache.peek().unwrap();
        assert!(cached.is_live());
        assert!(cached.error.is_none());
    }

    #[test]
    fn degrade_falls_back_when_expired() {
        let cache = SnapshotCache::new();
        cache.write(live(7.0), T);

        let snapshot = cache.degrade(
            network(),
            T + 121_000,
            DEFAULT_FRESHNESS_WINDOW,
            Milliseconds::from_millis(30),
        );

        assert_eq!(snapshot.freshness, Freshness::Fallback);
        assert_eq!(snapshot.stat(keys::CHILDREN), 0.0);
        assert_eq!(snapshot.fetched_at_ms, T + 121_000);
        assert_eq!(snapshot.fetch_duration.as_millis(), 30);
        assert_eq!(snapshot.error, Some(network()));
    }

    #[test]
    fn degrade_falls_back_when_empty() {
        let cache = SnapshotCache::new();
        let snapshot = cache.degrade(network(), T, DEFAULT_FRESHNESS_WINDOW, Milliseconds::default());
        assert_eq!(snapshot.freshness, Freshness::Fallback);
    }

    #[test]
    fn clear_drops_entry() {
        let cache = SnapshotCache::new();
        cache.write(live(7.0), T);
        assert!(!cache.is_empty());

        cache.clear();

        assert!(cache.is_empty());
        assert!(cache.read_if_fresh(T, DEFAULT_FRESHNESS_WINDOW).is_none());
    }

    #[test]
    fn fetched_at_never_moves_backward_across_clear() {
        let cache = SnapshotCache::new();
        cache.write(live(1.0), T);
        cache.clear();

        let stored = cache.write(live(2.0), T - 5_000);

        assert_eq!(stored.fetched_at_ms, T);
        assert_eq!(stored.stat(keys::CHILDREN), 2.0);
    }
}
