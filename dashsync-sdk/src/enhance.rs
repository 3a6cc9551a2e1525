//! Derived statistics.
//!
//! Turns a raw [`StatsPayload`] into a live [`Snapshot`]: totals are summed
//! over beneficiary categories, percentage fields are clamped to
//! `0..=MAX_PERCENTAGE`, and the activity feed is ordered newest first.
//!
//! Growth figures are heuristic. The endpoint only reports the current period,
//! so growth is estimated as new entries over the pre-existing base within the
//! same payload. There is no historical baseline behind these numbers.

use dashsync_types::{
    keys, ActivityRecord, CenterCounts, GroupStats, Milliseconds, Snapshot, StatsMap,
    StatsPayload, MAX_PERCENTAGE, MAX_RECENT_EVENTS,
};

/// Build a live snapshot from a raw payload.
///
/// Pure: the same payload, timestamp and duration always give the same
/// snapshot.
pub fn enhance(payload: StatsPayload, fetched_at_ms: u64, fetch_duration: Milliseconds) -> Snapshot {
    let stats = derive_stats(&payload);

    let mut builder = Snapshot::builder()
        .timestamp_ms(fetched_at_ms)
        .fetch_duration(fetch_duration)
        .stats(stats)
        .events(order_events(payload.recent_activities));

    for (center, counts) in payload.centers {
        builder = builder.group_stats(center, derive_group(counts));
    }

    builder.build()
}

/// Compute the full stats map: raw counters, extras reported by the server,
/// then derived metrics.
pub fn derive_stats(payload: &StatsPayload) -> StatsMap {
    let mut stats = StatsMap::new();

    for (key, value) in &payload.stats {
        if value.is_finite() {
            stats.insert(key.clone(), value.max(0.0));
        }
    }
    for key in keys::RAW {
        stats.entry(key.to_string()).or_insert(0.0);
    }

    let count = |key: &str| stats.get(key).copied().unwrap_or(0.0);

    let total = count(keys::CHILDREN)
        + count(keys::PREGNANT_WOMEN)
        + count(keys::LACTATING_MOTHERS)
        + count(keys::ADOLESCENT_GIRLS);

    let attendance = percent(count(keys::PRESENT_TODAY), count(keys::CHILDREN));
    let center_coverage = percent(count(keys::ACTIVE_CENTERS), count(keys::TOTAL_CENTERS));
    let nutrition = percent(count(keys::NUTRITION_DELIVERED), total);
    let vaccinations = percent(
        count(keys::VACCINATIONS_DONE),
        count(keys::VACCINATIONS_DONE) + count(keys::VACCINATIONS_DUE),
    );

    let beneficiary_growth = payload
        .reported(keys::BENEFICIARY_GROWTH)
        .map(clamp_percentage)
        .unwrap_or_else(|| growth(count(keys::NEW_ENROLLMENTS), total));
    let center_growth = payload
        .reported(keys::CENTER_GROWTH)
        .map(clamp_percentage)
        .unwrap_or_else(|| growth(count(keys::NEW_CENTERS), count(keys::TOTAL_CENTERS)));

    for (key, value) in [
        (keys::TOTAL_BENEFICIARIES, total),
        (keys::ATTENDANCE_RATE, attendance),
        (keys::CENTER_COVERAGE, center_coverage),
        (keys::NUTRITION_COVERAGE, nutrition),
        (keys::VACCINATION_COVERAGE, vaccinations),
        (keys::BENEFICIARY_GROWTH, beneficiary_growth),
        (keys::CENTER_GROWTH, center_growth),
    ] {
        stats.insert(key.to_string(), value);
    }

    stats
}

/// Per-center totals and attendance.
pub fn derive_group(counts: CenterCounts) -> GroupStats {
    GroupStats {
        total_beneficiaries: counts.beneficiaries(),
        attendance_rate: percent(counts.present_today as f64, counts.children as f64),
        counts,
    }
}

/// Newest first, bounded to `MAX_RECENT_EVENTS`. Ties keep server order.
pub fn order_events(mut events: Vec<ActivityRecord>) -> Vec<ActivityRecord> {
    events.sort_by(|a, b| b.timestamp_ms.cmp(&a.timestamp_ms));
    events.truncate(MAX_RECENT_EVENTS);
    events
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        return 0.0;
    }
    clamp_percentage(part / whole * 100.0)
}

// New entries relative to what existed before them
fn growth(new: f64, total: f64) -> f64 {
    percent(new, total - new)
}

fn clamp_percentage(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_PERCENTAGE)
    }
}
