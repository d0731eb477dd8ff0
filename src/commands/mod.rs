pub mod config;
pub mod export;
pub mod projects;
pub mod satisfaction;
pub mod sla;
pub mod tickets;

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use chrono::{Datelike, Days, NaiveDate, NaiveDateTime};
use serde::Deserialize;

use crate::analyzer::rollup::DateRange;
use crate::analyzer::{Interval, SlaOverrides};
use crate::config::{get_config_from_db, AppConfig};
use crate::error::AppError;
use crate::state::{AppState, DbAccess};

/// Report routes, mounted by `build_router`.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/reports/sla/achievement", get(sla::sla_achievement))
        .route("/reports/sla/overdue", get(sla::sla_overdue))
        .route("/reports/sla/achievement/export", get(export::export_sla_achievement))
        .route("/reports/tickets/status", get(tickets::ticket_status))
        .route("/reports/tickets/trend", get(tickets::ticket_trend))
        .route("/reports/tickets/efficiency", get(tickets::ticket_efficiency))
        .route("/reports/projects/overview", get(projects::projects_overview))
        .route("/reports/projects/progress", get(projects::project_progress))
        .route("/reports/projects/category", get(projects::project_category))
        .route("/reports/satisfaction/stats", get(satisfaction::satisfaction_stats))
        .route("/config", get(config::get_config).put(config::update_config))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Query string shared by every report. All fields are kept as raw text so a
/// malformed value falls back to its default instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub project_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub interval: Option<String>,
    pub p1h: Option<String>,
    pub p2h: Option<String>,
    pub p3h: Option<String>,
    pub p4h: Option<String>,
    pub defh: Option<String>,
    pub status: Option<String>,
    pub kw: Option<String>,
    pub type_group: Option<String>,
}

/// Years accepted in query dates; anything else counts as absent.
const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1..=9999;

fn parse_day(s: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s?.trim(), "%Y-%m-%d")
        .ok()
        .filter(|d| YEAR_RANGE.contains(&d.year()))
}

fn start_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_time(chrono::NaiveTime::MIN)
}

fn end_of_day(d: NaiveDate) -> NaiveDateTime {
    d.and_hms_micro_opt(23, 59, 59, 999_999)
        .unwrap_or_else(|| start_of_day(d))
}

fn non_blank(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl ReportQuery {
    pub fn project_id(&self) -> Option<i64> {
        non_blank(&self.project_id).and_then(|s| s.parse().ok())
    }

    /// Explicit bounds only: `date_from` at 00:00, `date_to` at end of day.
    pub fn bounds(&self) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
        (
            parse_day(self.date_from.as_deref()).map(start_of_day),
            parse_day(self.date_to.as_deref()).map(end_of_day),
        )
    }

    /// Requested range; a missing end is the end of today and a missing
    /// start covers `days` calendar days up to the end, inclusive.
    pub fn window(&self, days: i64, now: NaiveDateTime) -> DateRange {
        let (from, to) = self.bounds();
        let to = to.unwrap_or_else(|| end_of_day(now.date()));
        let from = from.unwrap_or_else(|| {
            let span = Days::new(days.saturating_sub(1).max(0) as u64);
            start_of_day(to.date().checked_sub_days(span).unwrap_or(to.date()))
        });
        DateRange::new(from, to)
    }

    pub fn interval(&self) -> Interval {
        Interval::parse(self.interval.as_deref())
    }

    pub fn overrides(&self) -> SlaOverrides {
        SlaOverrides::parse(
            self.p1h.as_deref(),
            self.p2h.as_deref(),
            self.p3h.as_deref(),
            self.p4h.as_deref(),
            self.defh.as_deref(),
        )
    }

    pub fn statuses(&self) -> Vec<String> {
        non_blank(&self.status)
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn keyword(&self) -> Option<&str> {
        non_blank(&self.kw)
    }

    pub fn type_group(&self) -> Option<String> {
        non_blank(&self.type_group).map(str::to_string)
    }
}

/// Stored report configuration, read once per request.
pub(crate) fn load_config(state: &AppState) -> Result<AppConfig, AppError> {
    state.db(get_config_from_db)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::sample::fixtures::dt;

    fn query(pairs: &[(&str, &str)]) -> ReportQuery {
        let mut q = ReportQuery::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "project_id" => q.project_id = v,
                "date_from" => q.date_from = v,
                "date_to" => q.date_to = v,
                "interval" => q.interval = v,
                "p1h" => q.p1h = v,
                "status" => q.status = v,
                "kw" => q.kw = v,
                _ => unreachable!(),
            }
        }
        q
    }

    #[test]
    fn test_default_window_is_trailing_days_including_today() {
        let now = dt("2024-03-15 10:00:00");
        let r = ReportQuery::default().window(30, now);
        assert_eq!(r.from, dt("2024-02-15 00:00:00"));
        assert_eq!(r.to.date(), now.date());
        assert_eq!(r.to.format("%H:%M:%S%.6f").to_string(), "23:59:59.999999");
    }

    #[test]
    fn test_window_relative_to_explicit_end() {
        let now = dt("2024-03-15 10:00:00");
        let r = query(&[("date_to", "2024-01-10")]).window(7, now);
        assert_eq!(r.from, dt("2024-01-04 00:00:00"));
        assert_eq!(r.to.date(), NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
    }

    #[test]
    fn test_malformed_dates_fall_back() {
        let now = dt("2024-03-15 10:00:00");
        let q = query(&[("date_from", "15/03/2024"), ("date_to", "nope")]);
        assert_eq!(q.bounds(), (None, None));
        let r = q.window(1, now);
        assert_eq!(r.from, dt("2024-03-15 00:00:00"));
    }

    #[test]
    fn test_out_of_range_dates_fall_back() {
        let now = dt("2024-03-15 10:00:00");
        for extreme in ["-262143-01-10", "+262142-12-31", "0000-06-01", "10000-01-01"] {
            let q = query(&[("date_from", extreme), ("date_to", extreme)]);
            assert_eq!(q.bounds(), (None, None));
            let r = q.window(30, now);
            assert_eq!(r.from, dt("2024-02-15 00:00:00"));
            assert_eq!(r.to.date(), now.date());
        }

        let q = query(&[("date_from", "0001-01-01"), ("date_to", "9999-12-31")]);
        let (from, to) = q.bounds();
        assert_eq!(from, Some(dt("0001-01-01 00:00:00")));
        assert_eq!(to.map(|t| t.date()), NaiveDate::from_ymd_opt(9999, 12, 31));
    }

    #[test]
    fn test_window_near_earliest_year_does_not_overflow() {
        let now = dt("2024-03-15 10:00:00");
        let r = query(&[("date_to", "0001-01-05")]).window(30, now);
        assert_eq!(r.to.date(), NaiveDate::from_ymd_opt(1, 1, 5).unwrap());
        assert!(r.from < r.to);
    }

    #[test]
    fn test_scalar_params() {
        let q = query(&[
            ("project_id", " 12 "),
            ("interval", "WEEK"),
            ("p1h", "2"),
            ("status", "active, ,closed"),
            ("kw", "  "),
        ]);
        assert_eq!(q.project_id(), Some(12));
        assert_eq!(q.interval(), Interval::Week);
        assert_eq!(q.overrides().p1, Some(2));
        assert_eq!(q.statuses(), vec!["active", "closed"]);
        assert_eq!(q.keyword(), None);

        let bad = query(&[("project_id", "abc"), ("interval", "year")]);
        assert_eq!(bad.project_id(), None);
        assert_eq!(bad.interval(), Interval::Day);
    }
}
