use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::classifier::CompletionClassifier;
use super::sample::{display_datetime, elapsed_hours, TicketSample};
use super::stats::round2;

/// Synonym priorities and the canonical tier they resolve to.
const ALIASES: &[(&str, &str)] = &[
    ("critical", "p1"),
    ("urgent", "p1"),
    ("high", "p2"),
    ("medium", "p3"),
    ("normal", "p3"),
    ("standard", "p3"),
    ("low", "p4"),
];

/// Synonyms stored as their own base-table keys. They take the stored tier
/// hours but, being exact keys, are not touched by per-request overrides.
const BASE_SYNONYMS: &[(&str, &str)] = &[
    ("critical", "p1"),
    ("urgent", "p1"),
    ("high", "p2"),
    ("medium", "p3"),
    ("low", "p4"),
];

/// Worst-offender lists are capped at this many entries.
pub const SAMPLE_LIMIT: usize = 50;

pub fn normalize_priority(priority: Option<&str>) -> String {
    priority.unwrap_or_default().trim().to_lowercase()
}

/// Target resolution hours per lowercase priority key, plus a default.
#[derive(Debug, Clone, PartialEq)]
pub struct SlaRuleSet {
    rules: BTreeMap<String, u32>,
    default_hours: u32,
}

impl SlaRuleSet {
    pub fn new(default_hours: u32) -> Self {
        SlaRuleSet {
            rules: BTreeMap::new(),
            default_hours,
        }
    }

    pub fn with_rule(mut self, priority: &str, hours: u32) -> Self {
        self.rules.insert(normalize_priority(Some(priority)), hours);
        self
    }

    /// Canonical tiers: p1 4h, p2 8h, p3 24h, p4 72h, default 24h.
    pub fn standard() -> Self {
        SlaRuleSet::from_hours(RuleHours::default())
    }

    /// Tier keys `p1..p4` plus the base synonyms, all from the same hours.
    pub fn from_hours(hours: RuleHours) -> Self {
        let mut set = SlaRuleSet::new(hours.default_hours)
            .with_rule("p1", hours.p1)
            .with_rule("p2", hours.p2)
            .with_rule("p3", hours.p3)
            .with_rule("p4", hours.p4);
        for (synonym, tier) in BASE_SYNONYMS {
            if let Some(h) = set.get(tier) {
                set = set.with_rule(synonym, h);
            }
        }
        set
    }

    pub fn default_hours(&self) -> u32 {
        self.default_hours
    }

    pub fn get(&self, key: &str) -> Option<u32> {
        self.rules.get(key).copied()
    }

    /// Exact key, then alias target, then the default. Never fails.
    pub fn resolve(&self, priority: Option<&str>) -> u32 {
        let key = normalize_priority(priority);
        if let Some(hours) = self.rules.get(&key) {
            return *hours;
        }
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .and_then(|(_, target)| self.rules.get(*target))
            .copied()
            .unwrap_or(self.default_hours)
    }

    /// New rule set with the overrides layered on top; `self` is untouched.
    /// Only `p1..p4` and the default change, so synonyms held as base keys
    /// keep their stored hours while `normal`/`standard` follow `p3`.
    pub fn with_overrides(&self, overrides: &SlaOverrides) -> SlaRuleSet {
        let mut merged = self.clone();
        let tiers = [
            ("p1", overrides.p1),
            ("p2", overrides.p2),
            ("p3", overrides.p3),
            ("p4", overrides.p4),
        ];
        for (key, value) in tiers {
            if let Some(hours) = value {
                merged.rules.insert(key.to_string(), hours);
            }
        }
        if let Some(hours) = overrides.default_hours {
            merged.default_hours = hours;
        }
        merged
    }

    /// Effective hours of the canonical tiers, as echoed in report payloads.
    pub fn by_priority_hours(&self) -> RuleHours {
        let fallback = RuleHours::default();
        RuleHours {
            p1: self.get("p1").unwrap_or(fallback.p1),
            p2: self.get("p2").unwrap_or(fallback.p2),
            p3: self.get("p3").unwrap_or(fallback.p3),
            p4: self.get("p4").unwrap_or(fallback.p4),
            default_hours: self.default_hours,
        }
    }
}

impl Default for SlaRuleSet {
    fn default() -> Self {
        SlaRuleSet::standard()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleHours {
    pub p1: u32,
    pub p2: u32,
    pub p3: u32,
    pub p4: u32,
    #[serde(rename = "default")]
    pub default_hours: u32,
}

impl Default for RuleHours {
    fn default() -> Self {
        RuleHours {
            p1: 4,
            p2: 8,
            p3: 24,
            p4: 72,
            default_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RulesEcho {
    pub by_priority_hours: RuleHours,
}

impl From<&SlaRuleSet> for RulesEcho {
    fn from(rules: &SlaRuleSet) -> Self {
        RulesEcho {
            by_priority_hours: rules.by_priority_hours(),
        }
    }
}

/// Per-request tier overrides (`p1h`..`p4h`, `defh`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlaOverrides {
    pub p1: Option<u32>,
    pub p2: Option<u32>,
    pub p3: Option<u32>,
    pub p4: Option<u32>,
    pub default_hours: Option<u32>,
}

impl SlaOverrides {
    /// Values that are absent, blank, negative or not integers are dropped.
    pub fn parse(
        p1h: Option<&str>,
        p2h: Option<&str>,
        p3h: Option<&str>,
        p4h: Option<&str>,
        defh: Option<&str>,
    ) -> Self {
        SlaOverrides {
            p1: parse_hours(p1h),
            p2: parse_hours(p2h),
            p3: parse_hours(p3h),
            p4: parse_hours(p4h),
            default_hours: parse_hours(defh),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == SlaOverrides::default()
    }
}

fn parse_hours(raw: Option<&str>) -> Option<u32> {
    raw.and_then(|s| s.trim().parse::<u32>().ok())
}

/// Outcome of comparing one ticket against its SLA target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SlaOutcome {
    ClosedAchieved { tat_h: f64 },
    ClosedBreached { tat_h: f64, closed_at: NaiveDateTime },
    OpenWithin { age_h: f64 },
    OpenBreached { age_h: f64 },
}

impl SlaOutcome {
    pub fn is_breached(&self) -> bool {
        matches!(
            self,
            SlaOutcome::ClosedBreached { .. } | SlaOutcome::OpenBreached { .. }
        )
    }
}

/// Classifies a ticket as achieved/breached (closed) or within/breached (open).
pub fn evaluate(
    sample: &TicketSample,
    target_h: u32,
    classifier: &CompletionClassifier,
    now: NaiveDateTime,
) -> SlaOutcome {
    let target = target_h as f64;
    match sample.closed_at(classifier) {
        Some(closed_at) => {
            let tat_h = elapsed_hours(sample.created_at, closed_at);
            if tat_h <= target {
                SlaOutcome::ClosedAchieved { tat_h }
            } else {
                SlaOutcome::ClosedBreached { tat_h, closed_at }
            }
        }
        None => {
            let age_h = elapsed_hours(sample.created_at, now);
            if age_h <= target {
                SlaOutcome::OpenWithin { age_h }
            } else {
                SlaOutcome::OpenBreached { age_h }
            }
        }
    }
}

/// A ticket that exceeded its SLA target.
#[derive(Debug, Clone, Serialize)]
pub struct OverdueSample {
    pub code: String,
    pub name: String,
    pub priority: String,
    pub status: String,
    pub created_at: String,
    pub resolved_at: String,
    pub target_h: u32,
    pub tat_h: f64,
    pub overdue_h: f64,
}

impl OverdueSample {
    /// `None` unless the outcome is a breach.
    pub fn from_outcome(sample: &TicketSample, target_h: u32, outcome: &SlaOutcome) -> Option<Self> {
        let (elapsed, resolved_at) = match outcome {
            SlaOutcome::ClosedBreached { tat_h, closed_at } => (*tat_h, display_datetime(*closed_at)),
            SlaOutcome::OpenBreached { age_h } => (*age_h, String::new()),
            _ => return None,
        };
        Some(OverdueSample {
            code: sample.code.clone(),
            name: sample.name.clone(),
            priority: sample.priority.clone().unwrap_or_default(),
            status: sample.status_label(),
            created_at: display_datetime(sample.created_at),
            resolved_at,
            target_h,
            tat_h: round2(elapsed),
            overdue_h: round2(elapsed - target_h as f64),
        })
    }
}

/// Sorts by `overdue_h` descending (stable) and keeps the worst `SAMPLE_LIMIT`.
pub fn rank_samples(mut samples: Vec<OverdueSample>) -> Vec<OverdueSample> {
    samples.sort_by(|a, b| {
        b.overdue_h
            .partial_cmp(&a.overdue_h)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    samples.truncate(SAMPLE_LIMIT);
    samples
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::sample::fixtures::*;

    #[test]
    fn test_resolve_exact_keys() {
        let r = SlaRuleSet::standard();
        assert_eq!(r.resolve(Some("p1")), 4);
        assert_eq!(r.resolve(Some(" P2 ")), 8);
        assert_eq!(r.resolve(Some("p3")), 24);
        assert_eq!(r.resolve(Some("p4")), 72);
    }

    #[test]
    fn test_resolve_aliases() {
        let r = SlaRuleSet::standard();
        assert_eq!(r.resolve(Some("Critical")), 4);
        assert_eq!(r.resolve(Some("urgent")), 4);
        assert_eq!(r.resolve(Some("HIGH")), 8);
        assert_eq!(r.resolve(Some("medium")), 24);
        assert_eq!(r.resolve(Some("normal")), 24);
        assert_eq!(r.resolve(Some("standard")), 24);
        assert_eq!(r.resolve(Some("low")), 72);
    }

    #[test]
    fn test_resolve_falls_back_to_default() {
        let r = SlaRuleSet::new(12).with_rule("p1", 4);
        assert_eq!(r.resolve(None), 12);
        assert_eq!(r.resolve(Some("")), 12);
        assert_eq!(r.resolve(Some("緊急")), 12);
        // alias whose target is missing from the rule set
        assert_eq!(r.resolve(Some("low")), 12);
    }

    #[test]
    fn test_exact_key_wins_over_alias() {
        let r = SlaRuleSet::standard().with_rule("high", 2);
        assert_eq!(r.resolve(Some("high")), 2);
        assert_eq!(r.resolve(Some("p2")), 8);
    }

    #[test]
    fn test_overrides_merge_without_mutating_base() {
        let base = SlaRuleSet::standard();
        let o = SlaOverrides::parse(Some("2"), None, Some(" 30 "), None, Some("48"));
        let merged = base.with_overrides(&o);
        assert_eq!(merged.resolve(Some("p1")), 2);
        assert_eq!(merged.resolve(Some("critical")), 4);
        assert_eq!(merged.resolve(Some("urgent")), 4);
        assert_eq!(merged.resolve(Some("p2")), 8);
        assert_eq!(merged.resolve(Some("p3")), 30);
        assert_eq!(merged.resolve(Some("medium")), 24);
        assert_eq!(merged.resolve(Some("normal")), 30);
        assert_eq!(merged.resolve(Some("standard")), 30);
        assert_eq!(merged.resolve(Some("whatever")), 48);
        assert_eq!(base, SlaRuleSet::standard());
    }

    #[test]
    fn test_base_synonyms_follow_stored_tier_hours() {
        let r = SlaRuleSet::from_hours(RuleHours {
            p1: 1,
            p2: 3,
            p3: 12,
            p4: 48,
            default_hours: 6,
        });
        assert_eq!(r.get("critical"), Some(1));
        assert_eq!(r.get("urgent"), Some(1));
        assert_eq!(r.get("high"), Some(3));
        assert_eq!(r.get("medium"), Some(12));
        assert_eq!(r.get("low"), Some(48));
        assert_eq!(r.get("normal"), None);
        assert_eq!(r.resolve(Some("normal")), 12);
    }

    #[test]
    fn test_malformed_overrides_ignored() {
        let o = SlaOverrides::parse(Some("abc"), Some("-3"), Some("2.5"), Some(""), None);
        assert!(o.is_empty());
        let merged = SlaRuleSet::standard().with_overrides(&o);
        assert_eq!(merged, SlaRuleSet::standard());
    }

    #[test]
    fn test_zero_override_is_valid() {
        let o = SlaOverrides::parse(None, None, None, Some("0"), None);
        assert_eq!(o.p4, Some(0));
        let merged = SlaRuleSet::standard().with_overrides(&o);
        assert_eq!(merged.resolve(Some("p4")), 0);
        assert_eq!(merged.resolve(Some("low")), 72);
    }

    #[test]
    fn test_by_priority_hours_serializes_default_key() {
        let echo = RulesEcho::from(&SlaRuleSet::standard());
        let json = serde_json::to_value(&echo).unwrap();
        assert_eq!(json["by_priority_hours"]["p1"], 4);
        assert_eq!(json["by_priority_hours"]["default"], 24);
    }

    #[test]
    fn test_evaluate_closed_and_open() {
        let c = CompletionClassifier::default();
        let now = dt("2024-01-11 00:00:00");

        let ok = closed(1, Some("p1"), "2024-01-01 00:00:00", "2024-01-01 02:00:00");
        assert_eq!(evaluate(&ok, 4, &c, now), SlaOutcome::ClosedAchieved { tat_h: 2.0 });

        let late = closed(2, Some("p1"), "2024-01-01 00:00:00", "2024-01-01 06:00:00");
        assert!(evaluate(&late, 4, &c, now).is_breached());

        let open = ticket(3, None, "2024-01-01 00:00:00");
        assert_eq!(evaluate(&open, 24, &c, now), SlaOutcome::OpenBreached { age_h: 240.0 });
        assert_eq!(evaluate(&open, 300, &c, now), SlaOutcome::OpenWithin { age_h: 240.0 });
    }

    #[test]
    fn test_evaluate_exact_target_is_achieved() {
        let c = CompletionClassifier::default();
        let t = closed(1, Some("p1"), "2024-01-01 00:00:00", "2024-01-01 04:00:00");
        assert!(!evaluate(&t, 4, &c, dt("2024-02-01 00:00:00")).is_breached());
    }

    #[test]
    fn test_overdue_sample_fields() {
        let c = CompletionClassifier::default();
        let t = closed(7, Some("P1"), "2024-01-01 00:00:00", "2024-01-01 06:00:00");
        let outcome = evaluate(&t, 4, &c, dt("2024-02-01 00:00:00"));
        let s = OverdueSample::from_outcome(&t, 4, &outcome).unwrap();
        assert_eq!(s.code, "T00007");
        assert_eq!(s.priority, "P1");
        assert_eq!(s.status, "closed");
        assert_eq!(s.created_at, "2024-01-01 00:00");
        assert_eq!(s.resolved_at, "2024-01-01 06:00");
        assert_eq!(s.tat_h, 6.0);
        assert_eq!(s.overdue_h, 2.0);

        let achieved = SlaOutcome::ClosedAchieved { tat_h: 1.0 };
        assert!(OverdueSample::from_outcome(&t, 4, &achieved).is_none());
    }

    #[test]
    fn test_rank_samples_sorted_and_capped() {
        let c = CompletionClassifier::default();
        let now = dt("2024-03-01 00:00:00");
        let samples: Vec<OverdueSample> = (0..70)
            .map(|i| {
                let t = ticket(i, None, &format!("2024-01-{:02} 00:00:00", (i % 28) + 1));
                let o = evaluate(&t, 24, &c, now);
                OverdueSample::from_outcome(&t, 24, &o).unwrap()
            })
            .collect();
        let ranked = rank_samples(samples);
        assert_eq!(ranked.len(), SAMPLE_LIMIT);
        assert!(ranked.windows(2).all(|w| w[0].overdue_h >= w[1].overdue_h));
    }
}
