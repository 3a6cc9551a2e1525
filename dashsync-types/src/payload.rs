//! Wire format of the statistics endpoint.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::{ActivityRecord, CenterCounts, StatsMap};

/// Body returned by `GET {base_url}/dashboard/stats`.
///
/// Every field defaults when absent and unknown fields are ignored, so older
/// and newer servers both decode. The payload is raw: derived metrics are
/// computed afterwards.
///
/// # Example
///
/// ```rust
/// use dashsync_types::{keys, StatsPayload};
///
/// let mut payload = StatsPayload::default();
/// payload.stats.insert(keys::CHILDREN.into(), 120.0);
///
/// assert_eq!(payload.counter(keys::CHILDREN), 120.0);
/// assert_eq!(payload.counter(keys::PREGNANT_WOMEN), 0.0);
///
/// // Decode with serde (requires "serde" feature)
/// // let payload: StatsPayload = serde_json::from_str(body)?;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct StatsPayload {
    /// Aggregate counters keyed by the names in [`crate::keys`].
    pub stats: StatsMap,

    /// Per-center breakdowns keyed by center identifier.
    pub centers: BTreeMap<String, CenterCounts>,

    /// Activity feed in server order.
    pub recent_activities: Vec<ActivityRecord>,
}

impl StatsPayload {
    /// Read a counter, treating missing and non-finite values as zero.
    pub fn counter(&self, key: &str) -> f64 {
        match self.stats.get(key) {
            Some(v) if v.is_finite() => *v,
            _ => 0.0,
        }
    }

    /// Read a counter only if the server reported it.
    pub fn reported(&self, key: &str) -> Option<f64> {
        self.stats.get(key).copied().filter(|v| v.is_finite())
    }
}
