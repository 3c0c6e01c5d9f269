//! Date and time utilities

use chrono::{DateTime, Datelike, Duration, Local, Months, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One bucket of an activity chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub date: NaiveDate,
    pub count: i64,
}

/// Parse a human duration such as `30d`, `4h`, `5m`, `90s`, `1y` or `2w`.
///
/// Plain integers are taken as seconds. Compound forms (`1h30m`) are summed.
pub fn parse_duration(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(secs) = value.parse::<i64>() {
        return Some(Duration::seconds(secs));
    }

    let mut total = Duration::zero();
    let mut number = String::new();
    for c in value.chars() {
        if c.is_ascii_digit() {
            number.push(c);
            continue;
        }
        let n: i64 = number.parse().ok()?;
        number.clear();
        let part = match c {
            's' => Duration::seconds(n),
            'm' => Duration::minutes(n),
            'h' => Duration::hours(n),
            'd' => Duration::days(n),
            'w' => Duration::weeks(n),
            'y' => Duration::days(365 * n),
            _ => return None,
        };
        total = total + part;
    }
    if !number.is_empty() {
        return None;
    }
    Some(total)
}

/// Format a duration back into the compact string form.
pub fn format_duration(d: &Duration) -> String {
    let secs = d.num_seconds();
    if secs != 0 && secs % (365 * 86400) == 0 {
        format!("{}y", secs / (365 * 86400))
    } else if secs != 0 && secs % 86400 == 0 {
        format!("{}d", secs / 86400)
    } else if secs != 0 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs != 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// serde adapter for duration strings in configuration files
pub mod duration_str {
    use super::*;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format_duration(d))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Seconds(i64),
        }
        match Raw::deserialize(d)? {
            Raw::Seconds(n) => Ok(Duration::seconds(n)),
            Raw::Text(s) => parse_duration(&s)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid duration '{}'", s))),
        }
    }
}

/// Interpret a client supplied timestamp in the server's time zone.
///
/// The instant is kept; only the offset changes, so clients sending UTC and
/// clients sending local offsets both land on the same chart day.
pub fn localize(date: DateTime<Utc>) -> DateTime<Local> {
    date.with_timezone(&Local)
}

/// Midnight (local) at the start of `day`, as UTC.
pub fn start_of(day: NaiveDate) -> DateTime<Utc> {
    day.and_hms_opt(0, 0, 0)
        .and_then(|dt| Local.from_local_datetime(&dt).earliest())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&day.and_hms_opt(0, 0, 0).unwrap_or_default()))
}

/// Last instant (local) of `day`, as UTC.
pub fn end_of(day: NaiveDate) -> DateTime<Utc> {
    start_of(day) + Duration::days(1) - Duration::milliseconds(1)
}

/// Parse `YYYY-MM-DD`, `YYYY-MM` or `YYYY`.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(d) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(d) = NaiveDate::parse_from_str(&format!("{}-01", value), "%Y-%m-%d") {
        return Some(d);
    }
    if value.len() == 4 {
        if let Ok(y) = value.parse::<i32>() {
            return NaiveDate::from_ymd_opt(y, 1, 1);
        }
    }
    None
}

/// Parse a catalogue date, accepting full RFC 3339 timestamps as well.
pub fn parse_catalog_date(value: &str) -> Option<DateTime<Utc>> {
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_day(value).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|dt| Utc.from_utc_datetime(&dt))
}

fn first_of_month(d: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(d.year(), d.month(), 1).unwrap_or(d)
}

/// Return one point per calendar day from `start` to `end` inclusive.
///
/// Days present in `counts` keep their count, all others get zero.
pub fn fill_day_gaps(start: NaiveDate, end: NaiveDate, counts: &[ChartPoint]) -> Vec<ChartPoint> {
    let mut points = Vec::new();
    let mut day = start;
    while day <= end {
        let count = counts
            .iter()
            .filter(|p| p.date == day)
            .map(|p| p.count)
            .sum();
        points.push(ChartPoint { date: day, count });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    points
}

/// Return one point per calendar month from `start` to `end` inclusive.
///
/// Points are dated on the first of each month.
pub fn fill_month_gaps(start: NaiveDate, end: NaiveDate, counts: &[ChartPoint]) -> Vec<ChartPoint> {
    let mut points = Vec::new();
    let mut month = first_of_month(start);
    let last = first_of_month(end);
    while month <= last {
        let count = counts
            .iter()
            .filter(|p| first_of_month(p.date) == month)
            .map(|p| p.count)
            .sum();
        points.push(ChartPoint { date: month, count });
        match month.checked_add_months(Months::new(1)) {
            Some(next) => month = next,
            None => break,
        }
    }
    points
}

/// Number of calendar days between two dates, inclusive.
pub fn days_inclusive(start: NaiveDate, end: NaiveDate) -> i64 {
    (end - start).num_days() + 1
}

/// Start and end of the month before `now`'s day, used by "last month" queries
pub fn last_month_range(now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    (now - Duration::days(30), now)
}

/// Return true when `day` falls within the `MM-DD` range `from..=to`.
///
/// Ranges may wrap the end of the year (`12-20` to `01-05`).
pub fn day_in_range(day: NaiveDate, from: &str, to: &str) -> bool {
    let key = format!("{:02}-{:02}", day.month(), day.day());
    if from <= to {
        key.as_str() >= from && key.as_str() <= to
    } else {
        key.as_str() >= from || key.as_str() <= to
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("4h"), Some(Duration::hours(4)));
        assert_eq!(parse_duration("30d"), Some(Duration::days(30)));
        assert_eq!(parse_duration("5m"), Some(Duration::minutes(5)));
        assert_eq!(parse_duration("1y"), Some(Duration::days(365)));
        assert_eq!(parse_duration("1h30m"), Some(Duration::minutes(90)));
        assert_eq!(parse_duration("120"), Some(Duration::seconds(120)));
        assert_eq!(parse_duration("4x"), None);
        assert_eq!(parse_duration("h"), None);
        assert_eq!(parse_duration("12"), Some(Duration::seconds(12)));
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(&Duration::hours(4)), "4h");
        assert_eq!(format_duration(&Duration::days(30)), "30d");
        assert_eq!(format_duration(&Duration::days(365)), "1y");
        assert_eq!(format_duration(&Duration::seconds(61)), "61s");
    }

    #[test]
    fn test_fill_day_gaps() {
        let counts = vec![
            ChartPoint { date: d("2024-12-02"), count: 3 },
            ChartPoint { date: d("2024-12-05"), count: 1 },
        ];
        let points = fill_day_gaps(d("2024-12-01"), d("2024-12-07"), &counts);
        assert_eq!(points.len() as i64, days_inclusive(d("2024-12-01"), d("2024-12-07")));
        assert_eq!(points[0].count, 0);
        assert_eq!(points[1].count, 3);
        assert_eq!(points[4].count, 1);
        for pair in points.windows(2) {
            assert_eq!(pair[0].date.succ_opt().unwrap(), pair[1].date);
        }
    }

    #[test]
    fn test_fill_day_gaps_single_day() {
        let points = fill_day_gaps(d("2024-02-29"), d("2024-02-29"), &[]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].count, 0);
    }

    #[test]
    fn test_fill_month_gaps() {
        let counts = vec![
            ChartPoint { date: d("2024-03-15"), count: 2 },
            ChartPoint { date: d("2024-03-20"), count: 1 },
            ChartPoint { date: d("2025-01-02"), count: 4 },
        ];
        let points = fill_month_gaps(d("2024-01-10"), d("2025-02-01"), &counts);
        assert_eq!(points.len(), 14);
        assert_eq!(points[0].date, d("2024-01-01"));
        assert_eq!(points[2].count, 3);
        assert_eq!(points[12].count, 4);
        assert_eq!(points[13].date, d("2025-02-01"));
    }

    #[test]
    fn test_parse_day() {
        assert_eq!(parse_day("2024-12-01"), Some(d("2024-12-01")));
        assert_eq!(parse_day("2024-12"), Some(d("2024-12-01")));
        assert_eq!(parse_day("1999"), Some(d("1999-01-01")));
        assert_eq!(parse_day("nope"), None);
    }

    #[test]
    fn test_day_in_range() {
        assert!(day_in_range(d("2024-10-31"), "10-01", "10-31"));
        assert!(!day_in_range(d("2024-11-01"), "10-01", "10-31"));
        assert!(day_in_range(d("2025-01-02"), "12-20", "01-05"));
        assert!(day_in_range(d("2024-12-24"), "12-20", "01-05"));
    }
}
