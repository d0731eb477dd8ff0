use chrono::NaiveDateTime;
use serde::Serialize;

use super::achievement::PriorityTally;
use super::classifier::CompletionClassifier;
use super::sample::TicketSample;
use super::sla::{evaluate, rank_samples, OverdueSample, RulesEcho, SlaOutcome, SlaRuleSet};
use super::temporal::Buckets;

#[derive(Debug, Clone, Default, Serialize)]
pub struct OverdueKpi {
    pub overdue_total: usize,
    pub overdue_open: usize,
    pub overdue_closed: usize,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OverdueBar {
    pub labels: Vec<String>,
    pub open_breached: Vec<usize>,
    pub closed_breached: Vec<usize>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OverdueTrend {
    pub labels: Vec<String>,
    pub open_breached: Vec<usize>,
    pub closed_breached: Vec<usize>,
    pub total: Vec<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OverdueReport {
    pub kpi: OverdueKpi,
    pub bar: OverdueBar,
    pub trend: OverdueTrend,
    pub samples: Vec<OverdueSample>,
    pub rules: RulesEcho,
}

/// Breach-only view of the achievement loop.
///
/// Open breaches are trended by `created_at` since they are still accruing;
/// closed breaches by `updated_at`.
pub fn compute_overdue(
    samples: &[TicketSample],
    rules: &SlaRuleSet,
    buckets: &Buckets,
    classifier: &CompletionClassifier,
    now: NaiveDateTime,
) -> OverdueReport {
    let mut kpi = OverdueKpi::default();
    let mut open_series = buckets.zeros();
    let mut closed_series = buckets.zeros();
    let mut tally = PriorityTally::default();
    let mut overdue = Vec::new();

    for sample in samples {
        let label = PriorityTally::label(sample.priority.as_deref());
        tally.touch(&label);
        let target = rules.resolve(sample.priority.as_deref());
        let outcome = evaluate(sample, target, classifier, now);

        match outcome {
            SlaOutcome::OpenBreached { .. } => {
                kpi.overdue_open += 1;
                tally.add(&label, 1, 0);
                if let Some(i) = buckets.position(sample.created_at) {
                    open_series[i] += 1;
                }
            }
            SlaOutcome::ClosedBreached { closed_at, .. } => {
                kpi.overdue_closed += 1;
                tally.add(&label, 0, 1);
                if let Some(i) = buckets.position(closed_at) {
                    closed_series[i] += 1;
                }
            }
            _ => continue,
        }

        if let Some(s) = OverdueSample::from_outcome(sample, target, &outcome) {
            overdue.push(s);
        }
    }
    kpi.overdue_total = kpi.overdue_open + kpi.overdue_closed;

    let total = open_series
        .iter()
        .zip(&closed_series)
        .map(|(o, c)| o + c)
        .collect();
    let (labels, open_breached, closed_breached) = tally.into_series();

    log::debug!(
        "SLA overdue: {} open, {} closed breaches",
        kpi.overdue_open,
        kpi.overdue_closed
    );

    OverdueReport {
        kpi,
        bar: OverdueBar {
            labels,
            open_breached,
            closed_breached,
        },
        trend: OverdueTrend {
            labels: buckets.labels(),
            open_breached: open_series,
            closed_breached: closed_series,
            total,
        },
        samples: rank_samples(overdue),
        rules: RulesEcho::from(rules),
    }
}
