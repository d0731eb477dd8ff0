use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use super::classifier::CompletionClassifier;
use super::sample::{TicketSample, UNSET_LABEL};
use super::sla::{evaluate, normalize_priority, rank_samples, OverdueSample, RulesEcho, SlaOutcome, SlaRuleSet};
use super::stats::{palette, pct};
use super::temporal::Buckets;

#[derive(Debug, Clone, Default, Serialize)]
pub struct AchievementKpi {
    pub total: usize,
    pub closed: usize,
    pub open: usize,
    pub achieved_closed: usize,
    pub breached_closed: usize,
    pub achieve_rate_closed: f64,
    pub achieved_all_now: usize,
    pub achieve_rate_all_now: f64,
    pub open_within_sla: usize,
    pub open_breach: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PieChart {
    pub labels: Vec<String>,
    pub counts: Vec<usize>,
    pub palette: Vec<String>,
}

impl PieChart {
    pub fn new(labels: Vec<String>, counts: Vec<usize>) -> Self {
        let palette = palette(labels.len());
        PieChart {
            labels,
            counts,
            palette,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct PriorityBar {
    pub labels: Vec<String>,
    pub achieved: Vec<usize>,
    pub breached: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AchievementTrend {
    pub labels: Vec<String>,
    pub closed_achieved: Vec<usize>,
    pub closed_breached: Vec<usize>,
    pub rate: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AchievementReport {
    pub kpi: AchievementKpi,
    pub pie: PieChart,
    pub bar_by_priority: PriorityBar,
    pub trend: AchievementTrend,
    pub samples: Vec<OverdueSample>,
    pub rules: RulesEcho,
}

/// Per-priority counters kept in first-seen order.
#[derive(Default)]
pub(crate) struct PriorityTally {
    order: Vec<String>,
    counts: HashMap<String, (usize, usize)>,
}

impl PriorityTally {
    pub(crate) fn label(priority: Option<&str>) -> String {
        let p = normalize_priority(priority);
        if p.is_empty() {
            UNSET_LABEL.to_string()
        } else {
            p
        }
    }

    pub(crate) fn touch(&mut self, label: &str) {
        if !self.counts.contains_key(label) {
            self.order.push(label.to_string());
            self.counts.insert(label.to_string(), (0, 0));
        }
    }

    pub(crate) fn add(&mut self, label: &str, first: usize, second: usize) {
        self.touch(label);
        if let Some(entry) = self.counts.get_mut(label) {
            entry.0 += first;
            entry.1 += second;
        }
    }

    /// (labels, first counters, second counters) sorted by combined volume
    /// descending; ties keep first-seen order.
    pub(crate) fn into_series(self) -> (Vec<String>, Vec<usize>, Vec<usize>) {
        let PriorityTally { mut order, counts } = self;
        let total = |label: &String| counts.get(label).map(|(a, b)| a + b).unwrap_or(0);
        order.sort_by(|a, b| total(b).cmp(&total(a)));
        let first = order.iter().map(|l| counts.get(l).map(|c| c.0).unwrap_or(0)).collect();
        let second = order.iter().map(|l| counts.get(l).map(|c| c.1).unwrap_or(0)).collect();
        (order, first, second)
    }
}

/// SLA achievement over tickets created in the report window.
///
/// Closed tickets are judged on turnaround (`updated_at - created_at`) and
/// land in the trend bucket of `updated_at`; open tickets are judged on their
/// age at `now`. Every breach becomes a worst-offender candidate.
pub fn compute_achievement(
    samples: &[TicketSample],
    rules: &SlaRuleSet,
    buckets: &Buckets,
    classifier: &CompletionClassifier,
    now: NaiveDateTime,
) -> AchievementReport {
    let mut kpi = AchievementKpi {
        total: samples.len(),
        ..Default::default()
    };
    let mut closed_achieved = buckets.zeros();
    let mut closed_breached = buckets.zeros();
    let mut tally = PriorityTally::default();
    let mut overdue = Vec::new();

    for sample in samples {
        let label = PriorityTally::label(sample.priority.as_deref());
        tally.touch(&label);
        let target = rules.resolve(sample.priority.as_deref());
        let outcome = evaluate(sample, target, classifier, now);

        match outcome {
            SlaOutcome::ClosedAchieved { .. } => {
                kpi.closed += 1;
                kpi.achieved_closed += 1;
                tally.add(&label, 1, 0);
                if let Some(i) = sample.updated_at.and_then(|u| buckets.position(u)) {
                    closed_achieved[i] += 1;
                }
            }
            SlaOutcome::ClosedBreached { closed_at, .. } => {
                kpi.closed += 1;
                kpi.breached_closed += 1;
                tally.add(&label, 0, 1);
                if let Some(i) = buckets.position(closed_at) {
                    closed_breached[i] += 1;
                }
            }
            SlaOutcome::OpenWithin { .. } => {
                kpi.open += 1;
                kpi.open_within_sla += 1;
            }
            SlaOutcome::OpenBreached { .. } => {
                kpi.open += 1;
                kpi.open_breach += 1;
            }
        }

        if let Some(s) = OverdueSample::from_outcome(sample, target, &outcome) {
            overdue.push(s);
        }
    }

    kpi.achieve_rate_closed = pct(kpi.achieved_closed, kpi.closed);
    kpi.achieved_all_now = kpi.achieved_closed + kpi.open_within_sla;
    kpi.achieve_rate_all_now = pct(kpi.achieved_all_now, kpi.total);

    let rate = closed_achieved
        .iter()
        .zip(&closed_breached)
        .map(|(a, b)| pct(*a, a + b))
        .collect();

    let (labels, achieved, breached) = tally.into_series();

    log::debug!(
        "SLA achievement: {} tickets, {} closed, {} open breaches",
        kpi.total,
        kpi.closed,
        kpi.open_breach
    );

    AchievementReport {
        pie: PieChart::new(
            vec!["達成(已結)".to_string(), "逾期(已結)".to_string()],
            vec![kpi.achieved_closed, kpi.breached_closed],
        ),
        bar_by_priority: PriorityBar {
            labels,
            achieved,
            breached,
        },
        trend: AchievementTrend {
            labels: buckets.labels(),
            closed_achieved,
            closed_breached,
            rate,
        },
        samples: rank_samples(overdue),
        rules: RulesEcho::from(rules),
        kpi,
    }
}
