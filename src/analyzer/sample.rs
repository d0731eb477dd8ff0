use chrono::NaiveDateTime;
use serde::Serialize;

use super::classifier::CompletionClassifier;

/// Placeholder label for tickets without a priority or status.
pub const UNSET_LABEL: &str = "未設定";

/// Placeholder label for tickets whose category is unknown.
pub const UNCATEGORIZED_LABEL: &str = "未分類";

const DISPLAY_DT_FMT: &str = "%Y-%m-%d %H:%M";

/// Read-only projection of a ticket row consumed by the aggregators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketSample {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub priority: Option<String>,
    pub status: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: Option<NaiveDateTime>,
    pub project_id: Option<i64>,
    pub category_id: Option<i64>,
}

impl TicketSample {
    /// Completion timestamp: status classified done AND `updated_at` present.
    pub fn closed_at(&self, classifier: &CompletionClassifier) -> Option<NaiveDateTime> {
        if classifier.is_done(self.status.as_deref()) {
            self.updated_at
        } else {
            None
        }
    }

    pub fn is_closed(&self, classifier: &CompletionClassifier) -> bool {
        self.closed_at(classifier).is_some()
    }

    /// Raw (signed) resolution time in seconds for closed tickets.
    pub fn resolution_seconds(&self, classifier: &CompletionClassifier) -> Option<f64> {
        self.closed_at(classifier)
            .map(|closed| (closed - self.created_at).num_milliseconds() as f64 / 1000.0)
    }

    pub fn status_label(&self) -> String {
        self.status.clone().unwrap_or_default()
    }
}

/// Hours elapsed between two instants, clamped at zero.
pub fn elapsed_hours(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    ((to - from).num_milliseconds() as f64 / 3_600_000.0).max(0.0)
}

pub fn display_datetime(ts: NaiveDateTime) -> String {
    ts.format(DISPLAY_DT_FMT).to_string()
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn test_closed_requires_updated_at() {
        let c = CompletionClassifier::default();
        let mut t = closed(1, Some("p1"), "2024-01-01 00:00:00", "2024-01-01 02:00:00");
        assert!(t.is_closed(&c));
        t.updated_at = None;
        assert!(!t.is_closed(&c));
        assert_eq!(t.resolution_seconds(&c), None);
    }

    #[test]
    fn test_updated_open_ticket_is_not_closed() {
        let c = CompletionClassifier::default();
        let mut t = ticket(1, None, "2024-01-01 00:00:00");
        t.updated_at = Some(dt("2024-01-02 00:00:00"));
        assert!(!t.is_closed(&c));
    }

    #[test]
    fn test_resolution_seconds_signed() {
        let c = CompletionClassifier::default();
        let t = closed(1, None, "2024-01-01 03:00:00", "2024-01-01 02:00:00");
        assert_eq!(t.resolution_seconds(&c), Some(-3600.0));
    }

    #[test]
    fn test_elapsed_hours_clamped() {
        assert_eq!(
            elapsed_hours(dt("2024-01-01 00:00:00"), dt("2024-01-01 06:30:00")),
            6.5
        );
        assert_eq!(
            elapsed_hours(dt("2024-01-02 00:00:00"), dt("2024-01-01 00:00:00")),
            0.0
        );
    }

    #[test]
    fn test_display_datetime() {
        assert_eq!(display_datetime(dt("2024-05-06 07:08:09")), "2024-05-06 07:08");
    }
}
