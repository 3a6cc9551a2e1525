//! Polling modes and the controller that maps them to intervals.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Shortest interval the timer will run at.
pub const MIN_INTERVAL: Duration = Duration::from_millis(100);

/// Named polling speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PollMode {
    High,
    #[default]
    Normal,
    Low,
}

impl PollMode {
    pub const ALL: [PollMode; 3] = [PollMode::High, PollMode::Normal, PollMode::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            PollMode::High => "high",
            PollMode::Normal => "normal",
            PollMode::Low => "low",
        }
    }
}

impl fmt::Display for PollMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A mode name that is not `high`, `normal` or `low`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown poll mode '{0}' (expected high, normal or low)")]
pub struct UnknownMode(pub String);

impl FromStr for PollMode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "high" => Ok(PollMode::High),
            "normal" => Ok(PollMode::Normal),
            "low" => Ok(PollMode::Low),
            _ => Err(UnknownMode(s.to_string())),
        }
    }
}

/// Interval for each mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrequencyTable {
    pub high: Duration,
    pub normal: Duration,
    pub low: Duration,
}

impl Default for FrequencyTable {
    fn default() -> Self {
        Self {
            high: Duration::from_secs(5),
            normal: Duration::from_secs(15),
            low: Duration::from_secs(60),
        }
    }
}

impl FrequencyTable {
    /// Interval for `mode`, never below [`MIN_INTERVAL`].
    pub fn interval(&self, mode: PollMode) -> Duration {
        let raw = match mode {
            PollMode::High => self.high,
            PollMode::Normal => self.normal,
            PollMode::Low => self.low,
        };
        raw.max(MIN_INTERVAL)
    }
}

/// Tracks the interval the scheduler is running at and decides whether a
/// mode change needs a timer restart.
#[derive(Debug, Clone)]
pub struct FrequencyController {
    table: FrequencyTable,
    current: Duration,
    mode: Option<PollMode>,
}

impl FrequencyController {
    /// Start at `initial`, which need not match any mode.
    pub fn new(table: FrequencyTable, initial: Duration) -> Self {
        Self {
            table,
            current: initial.max(MIN_INTERVAL),
            mode: None,
        }
    }

    /// Start at the interval for `mode`.
    pub fn with_mode(table: FrequencyTable, mode: PollMode) -> Self {
        Self {
            current: table.interval(mode),
            mode: Some(mode),
            table,
        }
    }

    /// Switch to `mode`.
    ///
    /// Returns the new interval if it differs from the current one, or `None`
    /// when nothing needs to change.
    pub fn resolve(&mut self, mode: PollMode) -> Option<Duration> {
        self.mode = Some(mode);
        let next = self.table.interval(mode);
        if next == self.current {
            None
        } else {
            self.current = next;
            Some(next)
        }
    }

    /// Record an explicitly chosen interval; clears the mode.
    pub fn set_current(&mut self, interval: Duration) -> Duration {
        self.current = interval.max(MIN_INTERVAL);
        self.mode = None;
        self.current
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    /// Last mode applied, if the interval came from one.
    pub fn mode(&self) -> Option<PollMode> {
        self.mode
    }

    pub fn table(&self) -> &FrequencyTable {
        &self.table
    }
}
