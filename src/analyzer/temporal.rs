use std::collections::HashMap;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Bucket width of a time series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interval {
    #[default]
    Day,
    Week,
    Month,
}

impl Interval {
    /// Lenient parse: anything other than `week` or `month` is `day`.
    pub fn parse(s: Option<&str>) -> Self {
        match s.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("week") => Interval::Week,
            Some("month") => Interval::Month,
            _ => Interval::Day,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::Day => "day",
            Interval::Week => "week",
            Interval::Month => "month",
        }
    }
}

// The week containing the earliest representable date has no Monday in range.
fn monday_of(d: NaiveDate) -> NaiveDate {
    d.checked_sub_days(Days::new(d.weekday().num_days_from_monday() as u64))
        .unwrap_or(d)
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    d.with_day(1).unwrap_or(d)
}

/// Start dates of every bucket covering `[date_from, date_to]`, in order and
/// without gaps. Returns an empty list when `date_from > date_to`.
pub fn iter_buckets(
    date_from: NaiveDateTime,
    date_to: NaiveDateTime,
    interval: Interval,
) -> Vec<NaiveDate> {
    let mut result = Vec::new();
    if date_from > date_to {
        return result;
    }

    match interval {
        Interval::Day => {
            let mut current = date_from.date();
            let end = date_to.date();
            while current <= end {
                result.push(current);
                match current.checked_add_days(Days::new(1)) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
        Interval::Week => {
            let mut current = monday_of(date_from.date());
            let end = monday_of(date_to.date());
            while current <= end {
                result.push(current);
                match current.checked_add_days(Days::new(7)) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
        Interval::Month => {
            let mut current = first_of_month(date_from.date());
            let end = first_of_month(date_to.date());
            while current <= end {
                result.push(current);
                match current.checked_add_months(Months::new(1)) {
                    Some(next) => current = next,
                    None => break,
                }
            }
        }
    }

    result
}

/// Start date of the bucket containing `ts`.
pub fn bucket_key(ts: NaiveDateTime, interval: Interval) -> NaiveDate {
    match interval {
        Interval::Day => ts.date(),
        Interval::Week => monday_of(ts.date()),
        Interval::Month => first_of_month(ts.date()),
    }
}

/// `YYYY-MM-DD`, `YYYY-MM-DD (Wxx)` or `YYYY-MM`.
pub fn format_label(bucket_start: NaiveDate, interval: Interval) -> String {
    match interval {
        Interval::Day => bucket_start.format("%Y-%m-%d").to_string(),
        Interval::Week => format!(
            "{} (W{:02})",
            bucket_start.format("%Y-%m-%d"),
            bucket_start.iso_week().week()
        ),
        Interval::Month => bucket_start.format("%Y-%m").to_string(),
    }
}

/// Ordered buckets of a report window with a lookup from bucket start to
/// series position.
#[derive(Debug, Clone)]
pub struct Buckets {
    interval: Interval,
    starts: Vec<NaiveDate>,
    index: HashMap<NaiveDate, usize>,
}

impl Buckets {
    pub fn new(date_from: NaiveDateTime, date_to: NaiveDateTime, interval: Interval) -> Self {
        let starts = iter_buckets(date_from, date_to, interval);
        let index = starts.iter().enumerate().map(|(i, d)| (*d, i)).collect();
        Buckets {
            interval,
            starts,
            index,
        }
    }

    pub fn interval(&self) -> Interval {
        self.interval
    }

    pub fn len(&self) -> usize {
        self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    pub fn starts(&self) -> &[NaiveDate] {
        &self.starts
    }

    pub fn labels(&self) -> Vec<String> {
        self.starts
            .iter()
            .map(|d| format_label(*d, self.interval))
            .collect()
    }

    /// Series position of `ts`, or `None` when it falls outside the window.
    pub fn position(&self, ts: NaiveDateTime) -> Option<usize> {
        self.index.get(&bucket_key(ts, self.interval)).copied()
    }

    /// Zero-filled counter series, one slot per bucket.
    pub fn zeros(&self) -> Vec<usize> {
        vec![0; self.starts.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_interval_parse_lenient() {
        assert_eq!(Interval::parse(Some("week")), Interval::Week);
        assert_eq!(Interval::parse(Some(" MONTH ")), Interval::Month);
        assert_eq!(Interval::parse(Some("day")), Interval::Day);
        assert_eq!(Interval::parse(Some("quarter")), Interval::Day);
        assert_eq!(Interval::parse(None), Interval::Day);
    }

    #[test]
    fn test_day_buckets_inclusive() {
        let b = iter_buckets(
            dt("2024-01-30 10:00:00"),
            dt("2024-02-02 23:59:59"),
            Interval::Day,
        );
        assert_eq!(
            b,
            vec![d("2024-01-30"), d("2024-01-31"), d("2024-02-01"), d("2024-02-02")]
        );
    }

    #[test]
    fn test_week_buckets_aligned_to_monday() {
        // 2024-01-03 is a Wednesday, 2024-01-21 a Sunday
        let b = iter_buckets(
            dt("2024-01-03 00:00:00"),
            dt("2024-01-21 23:59:59"),
            Interval::Week,
        );
        assert_eq!(b, vec![d("2024-01-01"), d("2024-01-08"), d("2024-01-15")]);
    }

    #[test]
    fn test_month_buckets_year_rollover() {
        let b = iter_buckets(
            dt("2023-11-15 00:00:00"),
            dt("2024-02-01 00:00:00"),
            Interval::Month,
        );
        assert_eq!(
            b,
            vec![d("2023-11-01"), d("2023-12-01"), d("2024-01-01"), d("2024-02-01")]
        );
    }

    #[test]
    fn test_inverted_range_is_empty() {
        let b = Buckets::new(
            dt("2024-02-01 00:00:00"),
            dt("2024-01-01 00:00:00"),
            Interval::Day,
        );
        assert!(b.is_empty());
        assert!(b.labels().is_empty());
        assert!(b.zeros().is_empty());
    }

    #[test]
    fn test_bucket_key_per_interval() {
        let ts = dt("2024-03-14 18:30:00"); // Thursday
        assert_eq!(bucket_key(ts, Interval::Day), d("2024-03-14"));
        assert_eq!(bucket_key(ts, Interval::Week), d("2024-03-11"));
        assert_eq!(bucket_key(ts, Interval::Month), d("2024-03-01"));
    }

    #[test]
    fn test_format_label() {
        assert_eq!(format_label(d("2024-01-08"), Interval::Day), "2024-01-08");
        assert_eq!(format_label(d("2024-01-08"), Interval::Week), "2024-01-08 (W02)");
        assert_eq!(format_label(d("2024-01-01"), Interval::Month), "2024-01");
        // ISO week of a late-December Monday belongs to the next ISO year
        assert_eq!(format_label(d("2024-12-30"), Interval::Week), "2024-12-30 (W01)");
    }

    #[test]
    fn test_position_inside_and_outside() {
        let b = Buckets::new(
            dt("2024-01-01 00:00:00"),
            dt("2024-01-31 23:59:59"),
            Interval::Week,
        );
        assert_eq!(b.len(), 5);
        assert_eq!(b.position(dt("2024-01-01 00:00:00")), Some(0));
        assert_eq!(b.position(dt("2024-01-10 12:00:00")), Some(1));
        assert_eq!(b.position(dt("2024-02-10 12:00:00")), None);
        assert_eq!(b.interval(), Interval::Week);
    }

    #[test]
    fn test_buckets_strictly_increasing_and_bounding() {
        for interval in [Interval::Day, Interval::Week, Interval::Month] {
            let from = dt("2023-12-20 08:00:00");
            let to = dt("2024-03-05 20:00:00");
            let b = iter_buckets(from, to, interval);
            assert!(!b.is_empty());
            assert!(b.windows(2).all(|w| w[0] < w[1]));
            assert_eq!(b[0], bucket_key(from, interval));
            assert_eq!(*b.last().unwrap(), bucket_key(to, interval));
        }
    }

    #[test]
    fn test_buckets_at_calendar_limits_stop_without_overflow() {
        let last = NaiveDate::MAX;
        let from = last.pred_opt().unwrap().and_hms_opt(0, 0, 0).unwrap();
        let to = last.and_hms_opt(23, 59, 59).unwrap();
        assert_eq!(iter_buckets(from, to, Interval::Day), vec![last.pred_opt().unwrap(), last]);
        // the last representable day is a Monday
        assert_eq!(
            iter_buckets(from, to, Interval::Week),
            vec![last - Days::new(7), last]
        );
        assert_eq!(iter_buckets(from, to, Interval::Month).len(), 1);

        let first = NaiveDate::MIN.and_hms_opt(0, 0, 0).unwrap();
        for interval in [Interval::Day, Interval::Week, Interval::Month] {
            let b = Buckets::new(first, first, interval);
            assert_eq!(b.len(), 1);
            assert_eq!(b.position(first), Some(0));
        }
    }
}
