use chrono::NaiveDateTime;
use serde::Serialize;

use super::classifier::CompletionClassifier;
use super::sample::{display_datetime, TicketSample};
use super::stats::{hours, mean, percentile, round2};

const HOUR: f64 = 3600.0;
const DAY: f64 = 24.0 * HOUR;

/// Resolution time tiers: [lo, hi) in seconds.
const TIERS: &[(f64, f64, &str)] = &[
    (0.0, HOUR, "<1h"),
    (HOUR, 4.0 * HOUR, "1–4h"),
    (4.0 * HOUR, 8.0 * HOUR, "4–8h"),
    (8.0 * HOUR, DAY, "8–24h"),
    (DAY, 3.0 * DAY, "1–3d"),
    (3.0 * DAY, 7.0 * DAY, "3–7d"),
    (7.0 * DAY, f64::INFINITY, "≥7d"),
];

const SAMPLE_LIMIT: usize = 50;

/// Maximum number of resolved tickets examined per report.
pub const RESOLVED_SCAN_LIMIT: usize = 2000;

#[derive(Debug, Clone, Serialize)]
pub struct TierCount {
    pub label: String,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TierSeries {
    pub labels: Vec<String>,
    pub data: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct EfficiencyKpi {
    pub done_count: usize,
    pub avg_hours: f64,
    pub median_hours: f64,
    pub p90_hours: f64,
    pub open_count: usize,
    pub open_avg_age_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedSample {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub project_id: Option<i64>,
    pub created_at: String,
    pub resolved_at: String,
    pub resolved_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EfficiencyReport {
    pub buckets: Vec<TierCount>,
    pub series: TierSeries,
    pub kpi: EfficiencyKpi,
    pub samples: Vec<ResolvedSample>,
}

/// Lead-time distribution of tickets resolved in the window.
///
/// `resolved` is expected newest first; tickets with a negative resolution
/// time are skipped. Open tickets among `created_in_range` give the current
/// open count and average age at `now`.
pub fn compute_efficiency(
    resolved: &[TicketSample],
    created_in_range: &[TicketSample],
    classifier: &CompletionClassifier,
    now: NaiveDateTime,
) -> EfficiencyReport {
    let mut done_secs: Vec<f64> = Vec::new();
    let mut counts = vec![0usize; TIERS.len()];
    let mut samples = Vec::new();

    for t in resolved.iter().take(RESOLVED_SCAN_LIMIT) {
        let (sec, resolved_at) = match (t.resolution_seconds(classifier), t.updated_at) {
            (Some(sec), Some(at)) if sec >= 0.0 => (sec, at),
            _ => continue,
        };
        done_secs.push(sec);
        if let Some(i) = TIERS.iter().position(|(lo, hi, _)| sec >= *lo && sec < *hi) {
            counts[i] += 1;
        }
        if samples.len() < SAMPLE_LIMIT {
            samples.push(ResolvedSample {
                id: t.id,
                code: t.code.clone(),
                name: t.name.clone(),
                project_id: t.project_id,
                created_at: display_datetime(t.created_at),
                resolved_at: display_datetime(resolved_at),
                resolved_hours: round2(hours(sec)),
            });
        }
    }

    let open_ages: Vec<f64> = created_in_range
        .iter()
        .filter(|t| !t.is_closed(classifier))
        .map(|t| (now - t.created_at).num_seconds() as f64)
        .filter(|age| *age >= 0.0)
        .collect();

    let done_count = done_secs.len();
    let denominator = done_count.max(1);
    let labels: Vec<String> = TIERS.iter().map(|(_, _, l)| l.to_string()).collect();
    let buckets = labels
        .iter()
        .zip(&counts)
        .map(|(label, count)| TierCount {
            label: label.clone(),
            count: *count,
            pct: round2(*count as f64 / denominator as f64 * 100.0),
        })
        .collect();

    EfficiencyReport {
        buckets,
        series: TierSeries {
            labels,
            data: counts,
        },
        kpi: EfficiencyKpi {
            done_count,
            avg_hours: round2(hours(mean(&done_secs))),
            median_hours: round2(hours(percentile(&done_secs, 0.5))),
            p90_hours: round2(hours(percentile(&done_secs, 0.9))),
            open_count: open_ages.len(),
            open_avg_age_hours: round2(hours(mean(&open_ages))),
        },
        samples,
    }
}
