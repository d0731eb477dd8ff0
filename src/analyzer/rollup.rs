use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;

use super::achievement::PieChart;
use super::classifier::CompletionClassifier;
use super::sample::{TicketSample, UNCATEGORIZED_LABEL, UNSET_LABEL};
use super::stats::{hours, mean, pct, pct2, percentile, round2};

const TOP_PROJECTS: usize = 10;

/// Project metadata as stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectInfo {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub status: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DateRange {
    pub from: NaiveDateTime,
    pub to: NaiveDateTime,
}

impl DateRange {
    pub fn new(from: NaiveDateTime, to: NaiveDateTime) -> Self {
        DateRange { from, to }
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        ts >= self.from && ts <= self.to
    }
}

// ─── Projects overview ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectsKpi {
    pub projects: usize,
    pub open_now: usize,
    pub created: usize,
    pub closed: usize,
    pub avg_rt_hours: f64,
    pub p90_rt_hours: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProjectsBar {
    pub labels: Vec<String>,
    pub open_now: Vec<usize>,
    pub created: Vec<usize>,
    pub closed: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectRow {
    pub project_id: i64,
    pub project_code: String,
    pub project_name: String,
    pub project_status: String,
    pub start_date: String,
    pub end_date: String,
    pub created: usize,
    pub closed: usize,
    pub open_now: usize,
    pub avg_rt_hours: f64,
    pub p90_rt_hours: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectsOverview {
    pub kpi: ProjectsKpi,
    pub status_dist: PieChart,
    pub bar: ProjectsBar,
    pub rows: Vec<ProjectRow>,
}

impl Default for ProjectsOverview {
    fn default() -> Self {
        ProjectsOverview {
            kpi: ProjectsKpi::default(),
            status_dist: PieChart::new(Vec::new(), Vec::new()),
            bar: ProjectsBar::default(),
            rows: Vec::new(),
        }
    }
}

fn format_date(d: Option<NaiveDate>) -> String {
    d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn rt_stats(seconds: &[f64]) -> (f64, f64) {
    if seconds.is_empty() {
        return (0.0, 0.0);
    }
    (
        round2(hours(mean(seconds))),
        round2(hours(percentile(seconds, 0.9))),
    )
}

/// Per-project workload for the window.
///
/// - `created_in_range`: tickets created in the window (counted as created)
/// - `updated_in_range`: tickets updated in the window; done ones with a
///   non-negative resolution time count as closed and feed the RT stats
/// - `current`: every active ticket, without date filter (open-now)
///
/// Tickets of projects outside `projects` are ignored.
pub fn compute_projects_overview(
    projects: &[ProjectInfo],
    created_in_range: &[TicketSample],
    updated_in_range: &[TicketSample],
    current: &[TicketSample],
    range: DateRange,
    classifier: &CompletionClassifier,
) -> ProjectsOverview {
    if projects.is_empty() {
        return ProjectsOverview::default();
    }

    let ids: HashSet<i64> = projects.iter().map(|p| p.id).collect();
    let in_scope = |t: &&TicketSample| t.project_id.map_or(false, |id| ids.contains(&id));

    let mut created: HashMap<i64, usize> = HashMap::new();
    for t in created_in_range.iter().filter(in_scope) {
        if range.contains(t.created_at) {
            *created.entry(t.project_id.unwrap_or_default()).or_default() += 1;
        }
    }

    let mut resolution: HashMap<i64, Vec<f64>> = HashMap::new();
    for t in updated_in_range.iter().filter(in_scope) {
        if !t.updated_at.map_or(false, |u| range.contains(u)) {
            continue;
        }
        match t.resolution_seconds(classifier) {
            Some(sec) if sec >= 0.0 => resolution
                .entry(t.project_id.unwrap_or_default())
                .or_default()
                .push(sec),
            _ => {}
        }
    }

    let mut open_now: HashMap<i64, usize> = HashMap::new();
    for t in current.iter().filter(in_scope) {
        if !t.is_closed(classifier) {
            *open_now.entry(t.project_id.unwrap_or_default()).or_default() += 1;
        }
    }

    let rows: Vec<ProjectRow> = projects
        .iter()
        .map(|p| {
            let secs = resolution.get(&p.id).map(Vec::as_slice).unwrap_or_default();
            let (avg_rt_hours, p90_rt_hours) = rt_stats(secs);
            ProjectRow {
                project_id: p.id,
                project_code: p.code.clone(),
                project_name: p.name.clone(),
                project_status: p.status.clone().unwrap_or_default(),
                start_date: format_date(p.start_date),
                end_date: format_date(p.end_date),
                created: created.get(&p.id).copied().unwrap_or(0),
                closed: secs.len(),
                open_now: open_now.get(&p.id).copied().unwrap_or(0),
                avg_rt_hours,
                p90_rt_hours,
            }
        })
        .collect();

    let mut top: Vec<&ProjectRow> = rows.iter().collect();
    top.sort_by(|a, b| b.open_now.cmp(&a.open_now));
    top.truncate(TOP_PROJECTS);
    let bar = ProjectsBar {
        labels: top.iter().map(|r| r.project_name.clone()).collect(),
        open_now: top.iter().map(|r| r.open_now).collect(),
        created: top.iter().map(|r| r.created).collect(),
        closed: top.iter().map(|r| r.closed).collect(),
    };

    let all_secs: Vec<f64> = projects
        .iter()
        .filter_map(|p| resolution.get(&p.id))
        .flatten()
        .copied()
        .collect();
    let (avg_rt_hours, p90_rt_hours) = rt_stats(&all_secs);

    let mut status_order: Vec<String> = Vec::new();
    let mut status_counts: HashMap<String, usize> = HashMap::new();
    for p in projects {
        let label = p
            .status
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| UNSET_LABEL.to_string());
        let count = status_counts.entry(label.clone()).or_insert(0);
        if *count == 0 {
            status_order.push(label);
        }
        *count += 1;
    }
    let status_values = status_order
        .iter()
        .map(|s| status_counts.get(s).copied().unwrap_or(0))
        .collect();

    ProjectsOverview {
        kpi: ProjectsKpi {
            projects: projects.len(),
            open_now: rows.iter().map(|r| r.open_now).sum(),
            created: rows.iter().map(|r| r.created).sum(),
            closed: rows.iter().map(|r| r.closed).sum(),
            avg_rt_hours,
            p90_rt_hours,
        },
        status_dist: PieChart::new(status_order, status_values),
        bar,
        rows,
    }
}

// ─── Category distribution ───────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryTop {
    pub label: String,
    pub count: usize,
    pub pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryKpi {
    pub total: usize,
    pub categories: usize,
    pub top: CategoryTop,
    pub closed_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CategoryStack {
    pub labels: Vec<String>,
    pub open: Vec<usize>,
    pub closed: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryRow {
    pub category_id: Option<i64>,
    pub category_name: String,
    pub count: usize,
    pub percent: f64,
    pub open: usize,
    pub closed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub pie: PieChart,
    pub stack: CategoryStack,
    pub kpi: CategoryKpi,
    pub rows: Vec<CategoryRow>,
}

/// Groups tickets created in the window by category.
///
/// A ticket counts as closed only when done AND `updated_at <= date_to`; a
/// closure after the window end leaves it open for this period.
pub fn compute_category_rollup(
    samples: &[TicketSample],
    names: &HashMap<i64, String>,
    date_to: NaiveDateTime,
    classifier: &CompletionClassifier,
) -> CategoryReport {
    let mut grouped: BTreeMap<Option<i64>, (usize, usize)> = BTreeMap::new();
    for t in samples {
        let entry = grouped.entry(t.category_id).or_default();
        entry.0 += 1;
        if t.closed_at(classifier).map_or(false, |closed| closed <= date_to) {
            entry.1 += 1;
        }
    }

    let total: usize = grouped.values().map(|(count, _)| count).sum();
    let mut keys: Vec<(Option<i64>, usize, usize)> = grouped
        .into_iter()
        .map(|(k, (count, closed))| (k, count, closed))
        .collect();
    keys.sort_by(|a, b| b.1.cmp(&a.1));

    let mut rows = Vec::with_capacity(keys.len());
    let mut top = CategoryTop::default();
    for (category_id, count, closed) in keys {
        let category_name = category_id
            .and_then(|id| names.get(&id).cloned())
            .unwrap_or_else(|| UNCATEGORIZED_LABEL.to_string());
        if count > top.count {
            top = CategoryTop {
                label: category_name.clone(),
                count,
                pct: pct(count, total),
            };
        }
        rows.push(CategoryRow {
            category_id,
            category_name,
            count,
            percent: pct2(count, total),
            open: count.saturating_sub(closed),
            closed,
        });
    }

    let labels: Vec<String> = rows.iter().map(|r| r.category_name.clone()).collect();
    let closed_total: usize = rows.iter().map(|r| r.closed).sum();

    CategoryReport {
        pie: PieChart::new(labels.clone(), rows.iter().map(|r| r.count).collect()),
        stack: CategoryStack {
            labels,
            open: rows.iter().map(|r| r.open).collect(),
            closed: rows.iter().map(|r| r.closed).collect(),
        },
        kpi: CategoryKpi {
            total,
            categories: rows.len(),
            top,
            closed_pct: pct(closed_total, total),
        },
        rows,
    }
}
