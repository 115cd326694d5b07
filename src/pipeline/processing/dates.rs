use chrono::{DateTime, NaiveDate, NaiveDateTime};

const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d %B %Y", "%Y/%m/%d"];

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a cell into a calendar date, dropping any time of day.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_date_dialects() {
        assert_eq!(parse_date("2026-10-01"), Some(day(2026, 10, 1)));
        assert_eq!(parse_date("2026-10-01 23:59:59"), Some(day(2026, 10, 1)));
        assert_eq!(parse_date("2026-10-01 08:15"), Some(day(2026, 10, 1)));
        assert_eq!(parse_date("2026-10-01T08:15:00"), Some(day(2026, 10, 1)));
        assert_eq!(parse_date("2026-10-01T08:15:00.250"), Some(day(2026, 10, 1)));
        assert_eq!(parse_date("2026-10-01T08:15:00+08:00"), Some(day(2026, 10, 1)));
        assert_eq!(parse_date("10/01/2026"), Some(day(2026, 10, 1)));
        assert_eq!(parse_date("10/01/2026 14:30"), Some(day(2026, 10, 1)));
        assert_eq!(parse_date("01 October 2026"), Some(day(2026, 10, 1)));
    }

    #[test]
    fn test_parse_date_rejects_garbage() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("   "), None);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2026-13-40"), None);
    }
}
