//! Statistic names, per-center breakdowns and activity records.

use alloc::collections::BTreeMap;
use alloc::string::String;

/// Named counters and derived metrics, keyed by the names in [`keys`].
pub type StatsMap = BTreeMap<String, f64>;

/// Well-known statistic names.
///
/// Raw counters arrive from the statistics endpoint; derived metrics are
/// computed from them before a snapshot is published.
pub mod keys {
    pub const CHILDREN: &str = "children";
    pub const PREGNANT_WOMEN: &str = "pregnant_women";
    pub const LACTATING_MOTHERS: &str = "lactating_mothers";
    pub const ADOLESCENT_GIRLS: &str = "adolescent_girls";
    pub const TOTAL_CENTERS: &str = "total_centers";
    pub const ACTIVE_CENTERS: &str = "active_centers";
    pub const NEW_CENTERS: &str = "new_centers";
    pub const TOTAL_WORKERS: &str = "total_workers";
    pub const PRESENT_TODAY: &str = "present_today";
    pub const NUTRITION_DELIVERED: &str = "nutrition_delivered";
    pub const VACCINATIONS_DONE: &str = "vaccinations_done";
    pub const VACCINATIONS_DUE: &str = "vaccinations_due";
    pub const NEW_ENROLLMENTS: &str = "new_enrollments";

    pub const TOTAL_BENEFICIARIES: &str = "total_beneficiaries";
    pub const ATTENDANCE_RATE: &str = "attendance_rate";
    pub const CENTER_COVERAGE: &str = "center_coverage";
    pub const NUTRITION_COVERAGE: &str = "nutrition_coverage";
    pub const VACCINATION_COVERAGE: &str = "vaccination_coverage";
    pub const BENEFICIARY_GROWTH: &str = "beneficiary_growth";
    pub const CENTER_GROWTH: &str = "center_growth";

    /// Counters reported by the endpoint.
    pub const RAW: &[&str] = &[
        CHILDREN,
        PREGNANT_WOMEN,
        LACTATING_MOTHERS,
        ADOLESCENT_GIRLS,
        TOTAL_CENTERS,
        ACTIVE_CENTERS,
        NEW_CENTERS,
        TOTAL_WORKERS,
        PRESENT_TODAY,
        NUTRITION_DELIVERED,
        VACCINATIONS_DONE,
        VACCINATIONS_DUE,
        NEW_ENROLLMENTS,
    ];

    /// Metrics computed from the raw counters.
    pub const DERIVED: &[&str] = &[
        TOTAL_BENEFICIARIES,
        ATTENDANCE_RATE,
        CENTER_COVERAGE,
        NUTRITION_COVERAGE,
        VACCINATION_COVERAGE,
        BENEFICIARY_GROWTH,
        CENTER_GROWTH,
    ];

    /// Percentage-style metrics, all clamped to `0..=MAX_PERCENTAGE`.
    pub const PERCENTAGES: &[&str] = &[
        ATTENDANCE_RATE,
        CENTER_COVERAGE,
        NUTRITION_COVERAGE,
        VACCINATION_COVERAGE,
        BENEFICIARY_GROWTH,
        CENTER_GROWTH,
    ];

    /// Every key a published snapshot carries.
    pub fn all() -> impl Iterator<Item = &'static str> {
        RAW.iter().chain(DERIVED.iter()).copied()
    }
}

/// Raw per-center counts as reported by the endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CenterCounts {
    pub children: u64,
    pub pregnant_women: u64,
    pub lactating_mothers: u64,
    pub adolescent_girls: u64,
    pub present_today: u64,
    pub workers: u64,
}

impl CenterCounts {
    /// Sum of every beneficiary category, saturating at `u64::MAX`.
    pub fn beneficiaries(&self) -> u64 {
        self.children
            .saturating_add(self.pregnant_women)
            .saturating_add(self.lactating_mothers)
            .saturating_add(self.adolescent_girls)
    }
}

/// Counts for one center plus the metrics derived from them.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GroupStats {
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub counts: CenterCounts,

    /// Sum of the beneficiary categories in `counts`.
    pub total_beneficiaries: u64,

    /// Share of enrolled children present today, in percent.
    pub attendance_rate: f64,
}

impl GroupStats {
    /// Create a builder for group stats.
    pub fn builder() -> GroupStatsBuilder {
        GroupStatsBuilder::default()
    }
}

/// Builder for `GroupStats`.
///
/// Derived fields are left at zero; the enhancer fills them in.
#[derive(Debug, Default)]
pub struct GroupStatsBuilder {
    counts: CenterCounts,
}

impl GroupStatsBuilder {
    pub fn children(mut self, n: u64) -> Self {
        self.counts.children = n;
        self
    }

    pub fn pregnant_women(mut self, n: u64) -> Self {
        self.counts.pregnant_women = n;
        self
    }

    pub fn lactating_mothers(mut self, n: u64) -> Self {
        self.counts.lactating_mothers = n;
        self
    }

    pub fn adolescent_girls(mut self, n: u64) -> Self {
        self.counts.adolescent_girls = n;
        self
    }

    pub fn present_today(mut self, n: u64) -> Self {
        self.counts.present_today = n;
        self
    }

    pub fn workers(mut self, n: u64) -> Self {
        self.counts.workers = n;
        self
    }

    /// Build the group stats.
    pub fn build(self) -> GroupStats {
        GroupStats {
            counts: self.counts,
            ..Default::default()
        }
    }
}

/// One entry of the recent-activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ActivityRecord {
    pub id: String,

    /// Activity category, e.g. "attendance" or "enrollment".
    pub kind: String,

    pub message: String,

    /// Center the activity belongs to, if any.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub center: Option<String>,

    /// Unix timestamp in milliseconds.
    pub timestamp_ms: u64,
}
