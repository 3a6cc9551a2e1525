//! The polling service object.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use dashsync_adapters::FetchError;
use dashsync_types::{FetchFailure, Milliseconds, Snapshot};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::cache::{SnapshotCache, DEFAULT_FRESHNESS_WINDOW};
use crate::clock::{Clock, SystemClock};
use crate::enhance::enhance;
use crate::frequency::{FrequencyController, FrequencyTable, PollMode};
use crate::registry::{isolate, SubscriberRegistry, Subscription};
use crate::source::{timed_fetch, FetchOutcome, StatsSource};

type UnauthorizedHook = Arc<dyn Fn(&FetchFailure) + Send + Sync>;

/// Whether the polling timer is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Active,
}

/// Outcome of [`Dashboard::set_frequency`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrequencyChange {
    /// The mode resolves to the interval already in use; the timer was left alone.
    Unchanged,
    /// New interval recorded while stopped; it applies on the next start.
    Updated(Duration),
    /// The running timer was replaced with one at the new interval.
    Restarted(Duration),
}

struct TimerHandle {
    id: u64,
    stop_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
    interval: Duration,
}

impl TimerHandle {
    fn cancel(&self) {
        self.stop_tx.send_replace(true);
    }
}

struct Inner {
    source: Arc<dyn StatsSource>,
    clock: Arc<dyn Clock>,
    cache: SnapshotCache,
    registry: SubscriberRegistry,
    freshness_window: Duration,
    frequency: Mutex<FrequencyController>,
    timer: Mutex<Option<TimerHandle>>,
    on_unauthorized: Option<UnauthorizedHook>,

    // Held for the whole fetch-to-notify cycle.
    fetch_lock: tokio::sync::Mutex<()>,
    completed: AtomicU64,
    fetching: AtomicBool,
    timer_starts: AtomicU64,
    latest: RwLock<Option<Arc<Snapshot>>>,
}

/// Keeps observers in sync with a statistics endpoint.
///
/// A `Dashboard` owns the cache, the subscriber registry and at most one
/// polling timer. Cloning it is cheap and every clone drives the same engine.
///
/// # Example
///
/// ```rust,no_run
/// use dashsync_adapters::http::HttpStatsSource;
/// use dashsync_adapters::StaticToken;
/// use dashsync_sdk::{Dashboard, PollMode};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = HttpStatsSource::builder()
///         .base_url("https://api.example.org")
///         .token(StaticToken::new("secret"))
///         .build()?;
///
///     let dashboard = Dashboard::builder(source).mode(PollMode::Normal).build();
///
///     let subscription = dashboard.subscribe(|snapshot| {
///         println!("{} at {}", snapshot.freshness.as_str(), snapshot.fetched_at_ms);
///     });
///
///     dashboard.start(dashboard.interval());
///     dashboard.set_frequency(PollMode::High);
///
///     tokio::signal::ctrl_c().await?;
///     subscription.unsubscribe();
///     dashboard.shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Dashboard {
    inner: Arc<Inner>,
}

impl Dashboard {
    /// Create a builder around the given source.
    pub fn builder(source: impl StatsSource + 'static) -> DashboardBuilder {
        DashboardBuilder::new(Arc::new(source))
    }

    /// Create a builder around a source that is shared elsewhere.
    pub fn with_shared_source(source: Arc<dyn StatsSource>) -> DashboardBuilder {
        DashboardBuilder::new(source)
    }

    /// Start polling every `interval`, fetching once right away.
    ///
    /// A running timer is cancelled first, so calling this repeatedly never
    /// stacks timers. Must be called within a tokio runtime.
    pub fn start(&self, interval: Duration) {
        let interval = self.inner.frequency.lock().set_current(interval);
        self.spawn_timer(interval);
    }

    /// Start polling at the interval last chosen by `start` or `set_frequency`.
    pub fn resume(&self) {
        let interval = self.interval();
        self.spawn_timer(interval);
    }

    /// Stop the timer. Returns `false` if it was not running.
    ///
    /// A fetch already in flight is not aborted: its result is still cached
    /// and delivered, but no further ticks happen.
    pub fn stop(&self) -> bool {
        let timer = self.inner.timer.lock().take();
        match timer {
            Some(timer) => {
                timer.cancel();
                info!(
                    source = self.inner.source.description(),
                    "Stopped polling"
                );
                true
            }
            None => false,
        }
    }

    /// Fetch right away, outside the timer's schedule.
    ///
    /// Never overlaps another fetch. If one is already in flight this waits
    /// for it and returns the snapshot it delivered instead of starting a
    /// second request.
    pub async fn refresh_now(&self) -> Arc<Snapshot> {
        self.inner.refresh().await
    }

    /// Switch to the interval configured for `mode`.
    ///
    /// The timer is only restarted when the interval actually changes and the
    /// scheduler is active.
    pub fn set_frequency(&self, mode: PollMode) -> FrequencyChange {
        let resolved = self.inner.frequency.lock().resolve(mode);

        let Some(interval) = resolved else {
            debug!(%mode, "Poll interval unchanged, keeping timer");
            return FrequencyChange::Unchanged;
        };

        if self.state() == SchedulerState::Active {
            info!(%mode, interval_ms = interval.as_millis() as u64, "Restarting timer");
            self.stop();
            self.spawn_timer(interval);
            FrequencyChange::Restarted(interval)
        } else {
            FrequencyChange::Updated(interval)
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.inner.timer.lock().is_some() {
            SchedulerState::Active
        } else {
            SchedulerState::Stopped
        }
    }

    /// Interval the timer runs (or will run) at.
    pub fn interval(&self) -> Duration {
        self.inner.frequency.lock().current()
    }

    /// Mode behind the current interval, if it came from one.
    pub fn mode(&self) -> Option<PollMode> {
        self.inner.frequency.lock().mode()
    }

    /// Register an observer for every delivered snapshot.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(Arc<Snapshot>) + Send + Sync + 'static,
    {
        self.inner.registry.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// The snapshot most recently delivered to observers.
    pub fn latest(&self) -> Option<Arc<Snapshot>> {
        self.inner.latest.read().clone()
    }

    /// Forget the cached snapshot. The next failure falls back to defaults.
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }

    /// Whether a fetch is in flight right now.
    pub fn is_fetching(&self) -> bool {
        self.inner.fetching.load(Ordering::Acquire)
    }

    /// Number of fetch cycles completed so far.
    pub fn fetch_count(&self) -> u64 {
        self.inner.completed.load(Ordering::Acquire)
    }

    /// Stop polling, wait for the timer task to finish, and drop every
    /// subscriber.
    pub async fn shutdown(self) {
        let timer = self.inner.timer.lock().take();
        if let Some(timer) = timer {
            timer.cancel();
            if let Err(e) = timer.task.await {
                warn!(error = %e, "Timer task ended abnormally");
            }
        }
        self.inner.registry.clear();
        info!(
            source = self.inner.source.description(),
            "Dashboard shut down"
        );
    }

    fn spawn_timer(&self, interval: Duration) {
        let mut slot = self.inner.timer.lock();
        if let Some(previous) = slot.take() {
            previous.cancel();
        }

        let id = self.inner.timer_starts.fetch_add(1, Ordering::Relaxed) + 1;
        let (stop_tx, stop_rx) = watch::channel(false);
        let task = tokio::spawn(run_timer(Arc::downgrade(&self.inner), id, interval, stop_rx));

        info!(
            source = self.inner.source.description(),
            interval_ms = interval.as_millis() as u64,
            "Started polling"
        );
        *slot = Some(TimerHandle {
            id,
            stop_tx,
            task,
            interval,
        });
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let interval = self.inner.timer.lock().as_ref().map(|t| t.interval);
        f.debug_struct("Dashboard")
            .field("source", &self.inner.source.description())
            .field("running_interval", &interval)
            .field("subscribers", &self.inner.registry.len())
            .field("fetch_count", &self.fetch_count())
            .finish()
    }
}

async fn run_timer(
    inner: Weak<Inner>,
    id: u64,
    interval: Duration,
    mut stop_rx: watch::Receiver<bool>,
) {
    let _exit = TimerExit {
        inner: inner.clone(),
        id,
    };
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            changed = stop_rx.changed() => {
                if changed.is_err() || *stop_rx.borrow() {
                    break;
                }
            }
            _ = ticker.tick() => {
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                inner.refresh().await;
            }
        }
    }
}

/// Releases the timer slot if the task unwinds, so `state()` stops
/// reporting a dead timer as active.
struct TimerExit {
    inner: Weak<Inner>,
    id: u64,
}

impl Drop for TimerExit {
    fn drop(&mut self) {
        if !std::thread::panicking() {
            return;
        }
        error!(timer = self.id, "Polling timer panicked; scheduler stopped");
        if let Some(inner) = self.inner.upgrade() {
            let mut slot = inner.timer.lock();
            if slot.as_ref().map(|t| t.id) == Some(self.id) {
                slot.take();
            }
        }
    }
}

impl Inner {
    async fn refresh(&self) -> Arc<Snapshot> {
        let seen = self.completed.load(Ordering::Acquire);
        let _lock = self.fetch_lock.lock().await;

        // Someone else finished a fetch while we waited; share its result.
        if self.completed.load(Ordering::Acquire) != seen {
            let latest = self.latest.read().clone();
            if let Some(latest) = latest {
                return latest;
            }
        }

        let outcome = {
            let _fetching = FetchingGuard::set(&self.fetching);
            timed_fetch(self.source.as_ref()).await
        };
        let snapshot = self.settle(outcome);
        self.completed.fetch_add(1, Ordering::Release);
        snapshot
    }

    /// Cache, record and deliver the result of one fetch.
    fn settle(&self, outcome: FetchOutcome) -> Arc<Snapshot> {
        let now_ms = self.clock.now_ms();
        let duration = Milliseconds::from(outcome.duration);

        let snapshot = match outcome.result {
            Ok(payload) => match catch_unwind(AssertUnwindSafe(|| {
                enhance(payload, now_ms, duration)
            })) {
                Ok(enhanced) => {
                    let stored = self.cache.write(enhanced, now_ms);
                    debug!(
                        source = self.source.description(),
                        duration_ms = duration.as_millis(),
                        "Fetched live snapshot"
                    );
                    stored
                }
                Err(_) => self.degrade(
                    FetchError::Parse("payload could not be processed".to_string()),
                    now_ms,
                    duration,
                ),
            },
            Err(e) => self.degrade(e, now_ms, duration),
        };

        *self.latest.write() = Some(snapshot.clone());
        self.registry.notify(&snapshot);
        snapshot
    }

    /// Report a failed fetch and pick the stale or fallback snapshot.
    fn degrade(&self, e: FetchError, now_ms: u64, duration: Milliseconds) -> Arc<Snapshot> {
        let failure = e.to_failure();
        if e.is_auth() {
            if let Some(hook) = &self.on_unauthorized {
                isolate("on_unauthorized", || hook(&failure));
            }
        }
        let degraded = self
            .cache
            .degrade(failure, now_ms, self.freshness_window, duration);
        warn!(
            source = self.source.description(),
            error = %e,
            serving = degraded.freshness.as_str(),
            "Fetch failed"
        );
        Arc::new(degraded)
    }
}

struct FetchingGuard<'a>(&'a AtomicBool);

impl<'a> FetchingGuard<'a> {
    fn set(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Builder for [`Dashboard`].
pub struct DashboardBuilder {
    source: Arc<dyn StatsSource>,
    clock: Arc<dyn Clock>,
    freshness_window: Duration,
    frequencies: FrequencyTable,
    mode: PollMode,
    on_unauthorized: Option<UnauthorizedHook>,
}

impl DashboardBuilder {
    fn new(source: Arc<dyn StatsSource>) -> Self {
        Self {
            source,
            clock: Arc::new(SystemClock),
            freshness_window: DEFAULT_FRESHNESS_WINDOW,
            frequencies: FrequencyTable::default(),
            mode: PollMode::default(),
            on_unauthorized: None,
        }
    }

    /// Time source used to stamp snapshots and judge cache age.
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// How long a cached snapshot may be served after a failure.
    pub fn freshness_window(mut self, window: Duration) -> Self {
        self.freshness_window = window;
        self
    }

    pub fn frequencies(mut self, table: FrequencyTable) -> Self {
        self.frequencies = table;
        self
    }

    /// Initial mode; decides the interval returned by [`Dashboard::interval`].
    pub fn mode(mut self, mode: PollMode) -> Self {
        self.mode = mode;
        self
    }

    /// Called once per fetch rejected for authentication reasons.
    pub fn on_unauthorized<F>(mut self, hook: F) -> Self
    where
        F: Fn(&FetchFailure) + Send + Sync + 'static,
    {
        self.on_unauthorized = Some(Arc::new(hook));
        self
    }

    pub fn build(self) -> Dashboard {
        Dashboard {
            inner: Arc::new(Inner {
                source: self.source,
                clock: self.clock,
                cache: SnapshotCache::new(),
                registry: SubscriberRegistry::new(),
                freshness_window: self.freshness_window,
                frequency: Mutex::new(FrequencyController::with_mode(
                    self.frequencies,
                    self.mode,
                )),
                timer: Mutex::new(None),
                on_unauthorized: self.on_unauthorized,
                fetch_lock: tokio::sync::Mutex::new(()),
                completed: AtomicU64::new(0),
                fetching: AtomicBool::new(false),
                timer_starts: AtomicU64::new(0),
                latest: RwLock::new(None),
            }),
        }
    }
}

impl std::fmt::Debug for DashboardBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardBuilder")
            .field("source", &self.source.description())
            .field("freshness_window", &self.freshness_window)
            .field("frequencies", &self.frequencies)
            .field("mode", &self.mode)
            .finish()
    }
}
