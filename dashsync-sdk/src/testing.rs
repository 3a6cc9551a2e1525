//! Scripted statistics source shared by the unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use dashsync_adapters::FetchError;
use dashsync_types::{keys, ActivityRecord, CenterCounts, StatsPayload};
use parking_lot::Mutex;

use crate::source::StatsSource;

/// What the next fetch returns.
#[derive(Debug, Clone)]
pub enum Step {
    Payload(StatsPayload),
    Network,
    Unauthorized,
    Malformed,
    /// The fetch itself panics.
    Panic,
}

impl Step {
    pub fn payload() -> Self {
        Step::Payload(sample_payload())
    }

    fn into_result(self) -> Result<StatsPayload, FetchError> {
        match self {
            Step::Payload(p) => Ok(p),
            Step::Network => Err(FetchError::Connection("connection refused".into())),
            Step::Unauthorized => Err(FetchError::Auth("token expired".into())),
            Step::Malformed => Err(FetchError::Parse("expected value at line 1".into())),
            Step::Panic => panic!("source blew up"),
        }
    }
}

/// A well-formed payload whose counts sit at the edge of `u64`.
pub fn oversized_payload() -> StatsPayload {
    let mut payload = sample_payload();
    payload.centers.insert(
        "center-z".to_string(),
        CenterCounts {
            children: u64::MAX,
            pregnant_women: 1,
            ..Default::default()
        },
    );
    payload
}

pub fn sample_payload() -> StatsPayload {
    let mut payload = StatsPayload::default();
    for (key, value) in [
        (keys::CHILDREN, 120.0),
        (keys::PREGNANT_WOMEN, 14.0),
        (keys::LACTATING_MOTHERS, 10.0),
        (keys::ADOLESCENT_GIRLS, 16.0),
        (keys::PRESENT_TODAY, 90.0),
        (keys::TOTAL_CENTERS, 4.0),
        (keys::ACTIVE_CENTERS, 3.0),
    ] {
        payload.stats.insert(key.to_string(), value);
    }
    payload.centers.insert(
        "center-a".to_string(),
        CenterCounts {
            children: 40,
            present_today: 31,
            ..Default::default()
        },
    );
    payload.recent_activities.push(ActivityRecord {
        id: "a1".into(),
        kind: "attendance".into(),
        message: "Morning roll call".into(),
        center: Some("center-a".into()),
        timestamp_ms: 1_700_000_000_000,
    });
    payload
}

/// Replays a fixed list of steps, then repeats `then` forever.
#[derive(Debug)]
pub struct ScriptedSource {
    steps: Mutex<VecDeque<Step>>,
    then: Step,
    delay: Duration,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(steps: Vec<Step>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            then: Step::payload(),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn then_always(mut self, step: Step) -> Self {
        self.then = step;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of fetches started.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of fetches ever running at once.
    pub fn max_concurrent(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StatsSource for ScriptedSource {
    async fn fetch(&self) -> Result<StatsPayload, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let step = self
            .steps
            .lock()
            .pop_front()
            .unwrap_or_else(|| self.then.clone());
        self.active.fetch_sub(1, Ordering::SeqCst);
        step.into_result()
    }

    fn description(&self) -> &str {
        "scripted"
    }
}
