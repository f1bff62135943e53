//! Date parsing, formatting and range utilities
//!
//! Upstream providers encode dates compactly (`YYYYMMDD`, `YYYYMM`,
//! `YYYYMMDDHH`); the canonical series always uses ISO 8601 strings.

use crate::types::{Resolution, WeatherDataPoint};
use chrono::{Datelike, NaiveDate};
use std::collections::HashSet;

/// Canonical request date format
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum DateError {
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// Parse a `YYYY-MM-DD` date
pub fn parse_iso_date(s: &str) -> Result<NaiveDate, DateError> {
    NaiveDate::parse_from_str(s.trim(), ISO_DATE_FORMAT)
        .map_err(|_| DateError::InvalidDate(s.to_string()))
}

pub fn is_valid_date_range(start: NaiveDate, end: NaiveDate) -> bool {
    start <= end
}

/// Parse both ends of a request range and check their ordering
pub fn parse_date_range(start: &str, end: &str) -> Result<(NaiveDate, NaiveDate), DateError> {
    let start = parse_iso_date(start)?;
    let end = parse_iso_date(end)?;
    if !is_valid_date_range(start, end) {
        return Err(DateError::InvertedRange { start, end });
    }
    Ok((start, end))
}

/// Convert a provider-native compact date into the canonical string.
///
/// Returns `None` for malformed input and for the `YYYY13` annual
/// aggregate that monthly upstream series append to each year.
pub fn format_compact_date(raw: &str, resolution: Resolution) -> Option<String> {
    if !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match resolution {
        Resolution::Monthly => {
            if raw.len() != 6 {
                return None;
            }
            let year: i32 = raw[0..4].parse().ok()?;
            let month: u32 = raw[4..6].parse().ok()?;
            NaiveDate::from_ymd_opt(year, month, 1)
                .map(|d| d.format(ISO_DATE_FORMAT).to_string())
        }
        Resolution::Daily => compact_day(raw, 8).map(|d| d.format(ISO_DATE_FORMAT).to_string()),
        Resolution::Hourly => {
            let day = compact_day(raw, 10)?;
            let hour: u32 = raw[8..10].parse().ok()?;
            if hour > 23 {
                return None;
            }
            Some(format!("{}T{:02}:00", day.format(ISO_DATE_FORMAT), hour))
        }
    }
}

fn compact_day(raw: &str, expected_len: usize) -> Option<NaiveDate> {
    if raw.len() != expected_len {
        return None;
    }
    NaiveDate::parse_from_str(&raw[0..8], "%Y%m%d").ok()
}

/// Subsequence of `series` whose calendar day lies in `[start, end]`
pub fn filter_by_date_range(
    series: &[WeatherDataPoint],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<WeatherDataPoint> {
    if start > end {
        return Vec::new();
    }
    series
        .iter()
        .filter(|p| {
            p.calendar_day()
                .map(|d| d >= start && d <= end)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// Clip a provider series to a requested range.
///
/// Monthly points are dated on the first of their month, so the month that
/// contains `start` is kept as well.
pub fn clip_to_range(
    series: &[WeatherDataPoint],
    start: NaiveDate,
    end: NaiveDate,
    resolution: Resolution,
) -> Vec<WeatherDataPoint> {
    let from = match resolution {
        Resolution::Monthly => start.with_day(1).unwrap_or(start),
        Resolution::Daily | Resolution::Hourly => start,
    };
    filter_by_date_range(series, from, end)
}

/// Sort ascending by date, keep the first point per date, zero non-finite values
pub fn normalize_series(series: Vec<WeatherDataPoint>) -> Vec<WeatherDataPoint> {
    let mut series = series;
    series.sort_by(|a, b| a.date.cmp(&b.date));
    let mut seen = HashSet::with_capacity(series.len());
    series.retain(|p| seen.insert(p.date.clone()));
    for point in &mut series {
        point.sanitize();
    }
    series
}

/// Every calendar day in `[start, end]`, inclusive
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    start.iter_days().take_while(|d| *d <= end).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn points(dates: &[&str]) -> Vec<WeatherDataPoint> {
        dates.iter().map(|d| WeatherDataPoint::zeroed(*d)).collect()
    }

    #[test]
    fn test_format_daily_compact_date() {
        assert_eq!(
            format_compact_date("20240115", Resolution::Daily).as_deref(),
            Some("2024-01-15")
        );
        assert_eq!(format_compact_date("2024011", Resolution::Daily), None);
        assert_eq!(format_compact_date("20241340", Resolution::Daily), None);
    }

    #[test]
    fn test_format_monthly_compact_date() {
        assert_eq!(
            format_compact_date("202401", Resolution::Monthly).as_deref(),
            Some("2024-01-01")
        );
        // Annual aggregate row
        assert_eq!(format_compact_date("202413", Resolution::Monthly), None);
    }

    #[test]
    fn test_format_hourly_compact_date() {
        assert_eq!(
            format_compact_date("2024011503", Resolution::Hourly).as_deref(),
            Some("2024-01-15T03:00")
        );
        assert_eq!(format_compact_date("2024011524", Resolution::Hourly), None);
        assert_eq!(format_compact_date("2024-01-15", Resolution::Hourly), None);
    }

    #[test]
    fn test_filter_by_date_range_inclusive() {
        let series = points(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]);
        let filtered = filter_by_date_range(&series, day(2024, 1, 2), day(2024, 1, 3));
        let dates: Vec<_> = filtered.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-02", "2024-01-03"]);
    }

    #[test]
    fn test_filter_by_date_range_inverted_is_empty() {
        let series = points(&["2024-01-01", "2024-01-02"]);
        assert!(filter_by_date_range(&series, day(2024, 1, 2), day(2024, 1, 1)).is_empty());
    }

    #[test]
    fn test_filter_keeps_hours_of_end_day() {
        let series = points(&["2024-01-01T23:00", "2024-01-02T00:00", "2024-01-03T00:00"]);
        let filtered = filter_by_date_range(&series, day(2024, 1, 1), day(2024, 1, 2));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_normalize_sorts_and_dedups() {
        let mut series = points(&["2024-01-03", "2024-01-01", "2024-01-03", "2024-01-02"]);
        series[0].pressure = 1000.0;
        series[2].pressure = 1.0;
        series[1].precipitation = f64::NAN;
        let normalized = normalize_series(series);
        let dates: Vec<_> = normalized.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(normalized[0].precipitation, 0.0);
        assert_eq!(normalized[2].pressure, 1000.0);
    }

    #[test]
    fn test_parse_date_range() {
        assert!(parse_date_range("2024-01-01", "2024-01-31").is_ok());
        assert!(matches!(
            parse_date_range("2024-02-01", "2024-01-31"),
            Err(DateError::InvertedRange { .. })
        ));
        assert!(matches!(
            parse_date_range("2024/01/01", "2024-01-31"),
            Err(DateError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_days_in_range() {
        let days = days_in_range(day(2024, 2, 27), day(2024, 3, 1));
        assert_eq!(days.len(), 4); // leap year
        assert!(days_in_range(day(2024, 3, 1), day(2024, 2, 1)).is_empty());
    }

    #[test]
    fn test_clip_monthly_keeps_start_month() {
        let months: Vec<_> = (1..=12)
            .map(|m| WeatherDataPoint::zeroed(format!("2024-{m:02}-01")))
            .collect();
        let clipped = clip_to_range(&months, day(2024, 3, 15), day(2024, 4, 30), Resolution::Monthly);
        let dates: Vec<_> = clipped.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-03-01", "2024-04-01"]);

        let daily = clip_to_range(&months, day(2024, 3, 15), day(2024, 4, 30), Resolution::Daily);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].date, "2024-04-01");
    }
}
