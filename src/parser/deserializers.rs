use chrono::{NaiveDate, NaiveDateTime};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses the timestamp layouts exported by ticket trackers. A bare date
/// means midnight. Returns None for empty or unparseable strings.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Parse an ID string that may contain spaces or non-breaking spaces ("5 732 943" → 5732943).
pub fn parse_spaced_i64(s: &str) -> Option<i64> {
    let cleaned: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    cleaned.parse::<i64>().ok()
}

/// "" → Ok(None), "5" → Ok(Some(5)), "x" → Err.
pub fn parse_opt_i64(s: &str) -> Result<Option<i64>, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    parse_spaced_i64(trimmed)
        .map(Some)
        .ok_or_else(|| format!("not an integer: {:?}", trimmed))
}

/// Trimmed cell, None when blank.
pub fn non_blank(s: Option<&str>) -> Option<String> {
    s.map(str::trim).filter(|s| !s.is_empty()).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_datetime_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(16, 24, 0)
            .unwrap();
        assert_eq!(parse_datetime("2024-03-05 16:24:00"), Some(expected));
        assert_eq!(parse_datetime("2024-03-05T16:24:00"), Some(expected));
        assert_eq!(parse_datetime(" 2024-03-05 16:24 "), Some(expected));
        assert_eq!(parse_datetime("2024/03/05 16:24"), Some(expected));
        assert_eq!(
            parse_datetime("2024-03-05"),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(0, 0, 0)
        );
        assert!(parse_datetime("2024-03-05 16:24:00.250").is_some());
    }

    #[test]
    fn test_parse_datetime_invalid() {
        assert!(parse_datetime("").is_none());
        assert!(parse_datetime("   ").is_none());
        assert!(parse_datetime("05-03-2024").is_none());
        assert!(parse_datetime("2024-13-01").is_none());
    }

    #[test]
    fn test_parse_spaced_i64() {
        assert_eq!(parse_spaced_i64("5 732 943"), Some(5_732_943));
        assert_eq!(parse_spaced_i64("5\u{00A0}732\u{00A0}943"), Some(5_732_943));
        assert_eq!(parse_spaced_i64("abc"), None);
    }

    #[test]
    fn test_parse_opt_i64() {
        assert_eq!(parse_opt_i64(""), Ok(None));
        assert_eq!(parse_opt_i64(" 12 "), Ok(Some(12)));
        assert!(parse_opt_i64("twelve").is_err());
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  P1 ")), Some("P1".to_string()));
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(None), None);
    }
}
