use chrono::NaiveDateTime;
use serde::Serialize;

use super::classifier::CompletionClassifier;
use super::rollup::DateRange;
use super::sample::{display_datetime, elapsed_hours, TicketSample};
use super::stats::{pct, round1, round2};
use super::temporal::Buckets;

const ITEM_LIMIT: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Series {
    pub name: String,
    pub data: Vec<usize>,
}

impl Series {
    fn new(name: &str, data: &[usize]) -> Self {
        Series {
            name: name.to_string(),
            data: data.to_vec(),
        }
    }
}

// ─── Ticket trend ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct TrendTotals {
    pub created: usize,
    pub closed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TicketTrend {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    pub totals: TrendTotals,
}

/// Created vs closed per bucket. Creations are placed by `created_at`,
/// closures by `updated_at` of done tickets.
pub fn compute_ticket_trend(
    created_in_range: &[TicketSample],
    updated_in_range: &[TicketSample],
    buckets: &Buckets,
    classifier: &CompletionClassifier,
) -> TicketTrend {
    let mut created = buckets.zeros();
    let mut closed = buckets.zeros();

    for t in created_in_range {
        if let Some(i) = buckets.position(t.created_at) {
            created[i] += 1;
        }
    }
    for t in updated_in_range {
        if let Some(i) = t.closed_at(classifier).and_then(|ts| buckets.position(ts)) {
            closed[i] += 1;
        }
    }

    TicketTrend {
        labels: buckets.labels(),
        totals: TrendTotals {
            created: created.iter().sum(),
            closed: closed.iter().sum(),
        },
        series: vec![Series::new("新增", &created), Series::new("完成", &closed)],
    }
}

// ─── Project progress ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProgressKpi {
    pub created: usize,
    pub closed: usize,
    pub backlog_start: usize,
    pub backlog_end: usize,
    pub open_now: usize,
    pub progress_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenItem {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub created_at: String,
    pub age_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ClosedItem {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub created_at: String,
    pub closed_at: String,
    pub lead_hours: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectProgress {
    pub labels: Vec<String>,
    pub series: Vec<Series>,
    pub kpi: ProgressKpi,
    pub open_items: Vec<OpenItem>,
    pub closed_items: Vec<ClosedItem>,
}

/// Backlog progress of one project over the window.
///
/// `tickets` holds every active ticket of the project. The backlog starts
/// with tickets created before the window that were not already closed
/// before it, then moves by `created - closed` per bucket (never below 0).
pub fn compute_project_progress(
    tickets: &[TicketSample],
    range: DateRange,
    buckets: &Buckets,
    classifier: &CompletionClassifier,
    now: NaiveDateTime,
) -> ProjectProgress {
    let mut created = buckets.zeros();
    let mut closed = buckets.zeros();
    let mut backlog_start = 0usize;
    let mut total_up_to_end = 0usize;
    let mut closed_up_to_end = 0usize;
    let mut open: Vec<&TicketSample> = Vec::new();
    let mut closed_in_range: Vec<(&TicketSample, NaiveDateTime)> = Vec::new();

    for t in tickets {
        let closed_at = t.closed_at(classifier);

        if range.contains(t.created_at) {
            if let Some(i) = buckets.position(t.created_at) {
                created[i] += 1;
            }
        }
        if let Some(ts) = closed_at.filter(|ts| range.contains(*ts)) {
            if let Some(i) = buckets.position(ts) {
                closed[i] += 1;
            }
            closed_in_range.push((t, ts));
        }
        if t.created_at < range.from && !closed_at.map_or(false, |ts| ts < range.from) {
            backlog_start += 1;
        }
        if t.created_at <= range.to {
            total_up_to_end += 1;
        }
        if closed_at.map_or(false, |ts| ts <= range.to) {
            closed_up_to_end += 1;
        }
        if closed_at.is_none() {
            open.push(t);
        }
    }

    let mut running = backlog_start as i64;
    let backlog: Vec<usize> = created
        .iter()
        .zip(&closed)
        .map(|(c, d)| {
            running = (running + *c as i64 - *d as i64).max(0);
            running as usize
        })
        .collect();
    let backlog_end = backlog.last().copied().unwrap_or(backlog_start);

    let open_now = open.len();
    open.sort_by_key(|t| t.created_at);
    let open_items = open
        .into_iter()
        .take(ITEM_LIMIT)
        .map(|t| OpenItem {
            id: t.id,
            code: t.code.clone(),
            name: t.name.clone(),
            created_at: display_datetime(t.created_at),
            age_hours: round1(elapsed_hours(t.created_at, now)),
        })
        .collect();

    closed_in_range.sort_by(|a, b| b.1.cmp(&a.1));
    let closed_items = closed_in_range
        .into_iter()
        .take(ITEM_LIMIT)
        .map(|(t, ts)| ClosedItem {
            id: t.id,
            code: t.code.clone(),
            name: t.name.clone(),
            created_at: display_datetime(t.created_at),
            closed_at: display_datetime(ts),
            lead_hours: round2((ts - t.created_at).num_seconds() as f64 / 3600.0),
        })
        .collect();

    ProjectProgress {
        labels: buckets.labels(),
        kpi: ProgressKpi {
            created: created.iter().sum(),
            closed: closed.iter().sum(),
            backlog_start,
            backlog_end,
            open_now,
            progress_pct: pct(closed_up_to_end, total_up_to_end),
        },
        series: vec![
            Series::new("新增", &created),
            Series::new("完成", &closed),
            Series::new("待辦(Backlog)", &backlog),
        ],
        open_items,
        closed_items,
    }
}
