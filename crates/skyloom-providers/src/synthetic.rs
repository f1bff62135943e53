//! Deterministic synthetic weather generator
//!
//! Produces a reproducible daily series from a seeded linear-congruential
//! generator. Used as the terminal fallback tier and for offline/demo mode.

use chrono::{Datelike, NaiveDate};
use skyloom_core::{
    filter_by_date_range, Humidity, Temperature, WeatherDataPoint, Wind, ISO_DATE_FORMAT,
};
use std::f64::consts::{FRAC_PI_2, PI};
use std::sync::OnceLock;

/// Default pre-generated span (inclusive years)
pub const DEFAULT_SYNTHETIC_SPAN: (i32, i32) = (1990, 2030);

/// Numerical Recipes LCG over u32
#[derive(Debug, Clone)]
struct Lcg {
    state: u32,
}

impl Lcg {
    fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Next value in `[0, 1)`
    fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
        f64::from(self.state) / 4_294_967_296.0
    }
}

fn seed_for(start_year: i32, end_year: i32) -> u32 {
    (i64::from(start_year) * 1000 + i64::from(end_year)) as u32
}

/// One point per calendar day from Jan 1 `start_year` to Dec 31 `end_year`.
///
/// Pure function of its inputs: the same range always yields the same
/// values, bit for bit.
pub fn generate(start_year: i32, end_year: i32) -> Vec<WeatherDataPoint> {
    if start_year > end_year {
        return Vec::new();
    }
    let (Some(first), Some(last)) = (
        NaiveDate::from_ymd_opt(start_year, 1, 1),
        NaiveDate::from_ymd_opt(end_year, 12, 31),
    ) else {
        return Vec::new();
    };

    let mut rng = Lcg::new(seed_for(start_year, end_year));
    first
        .iter_days()
        .take_while(|d| *d <= last)
        .map(|date| synthesize_day(date, &mut rng))
        .collect()
}

fn synthesize_day(date: NaiveDate, rng: &mut Lcg) -> WeatherDataPoint {
    let phase = f64::from(date.ordinal()) / 365.0 * 2.0 * PI;
    let seasonal_temp = 15.0 + 15.0 * (phase - FRAC_PI_2).sin();
    let seasonal_rain = 50.0 + 30.0 * phase.sin();

    let avg = seasonal_temp + (rng.next_f64() - 0.5) * 10.0;
    let min = avg - 5.0 - rng.next_f64() * 5.0;
    let max = avg + 5.0 + rng.next_f64() * 5.0;
    let relative = 50.0 + rng.next_f64() * 40.0;
    let specific = 5.0 + rng.next_f64() * 15.0;
    let speed = 2.0 + rng.next_f64() * 8.0;
    let direction = rng.next_f64() * 360.0;
    let precipitation = (seasonal_rain + (rng.next_f64() - 0.5) * 40.0).max(0.0);
    let pressure = 1010.0 + (rng.next_f64() - 0.5) * 20.0;
    let solar_radiation = 200.0 + rng.next_f64() * 400.0;

    WeatherDataPoint {
        date: date.format(ISO_DATE_FORMAT).to_string(),
        temperature: Temperature { avg, min, max },
        humidity: Humidity { relative, specific },
        wind: Wind { speed, direction },
        precipitation,
        pressure,
        solar_radiation,
    }
}

/// Generator holding a lazily built series over a fixed span of years
#[derive(Debug)]
pub struct SyntheticGenerator {
    span_start: i32,
    span_end: i32,
    span: OnceLock<Vec<WeatherDataPoint>>,
}

impl SyntheticGenerator {
    pub fn new(span_start: i32, span_end: i32) -> Self {
        Self {
            span_start,
            span_end,
            span: OnceLock::new(),
        }
    }

    pub fn span_years(&self) -> (i32, i32) {
        (self.span_start, self.span_end)
    }

    fn span_series(&self) -> &[WeatherDataPoint] {
        self.span
            .get_or_init(|| generate(self.span_start, self.span_end))
    }

    fn covers(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start.year() >= self.span_start && end.year() <= self.span_end
    }

    /// Series restricted to `[start, end]`; never fails
    pub fn range(&self, start: NaiveDate, end: NaiveDate) -> Vec<WeatherDataPoint> {
        if start > end {
            return Vec::new();
        }
        if !self.covers(start, end) {
            return filter_by_date_range(&generate(start.year(), end.year()), start, end);
        }

        let series = self.span_series();
        let Some(origin) = NaiveDate::from_ymd_opt(self.span_start, 1, 1) else {
            return Vec::new();
        };
        // One point per day from `origin`, so day offsets are indices
        let from = (start - origin).num_days() as usize;
        let to = ((end - origin).num_days() as usize + 1).min(series.len());
        series.get(from..to).map(<[_]>::to_vec).unwrap_or_default()
    }

    /// Synthetic stand-in for a single day
    pub fn day(&self, date: NaiveDate) -> WeatherDataPoint {
        self.range(date, date)
            .into_iter()
            .next()
            .unwrap_or_else(|| WeatherDataPoint::zeroed(date.format(ISO_DATE_FORMAT).to_string()))
    }

    /// First `days` points of the span, used as location sample data
    pub fn sample(&self, days: usize) -> Vec<WeatherDataPoint> {
        self.span_series().iter().take(days).cloned().collect()
    }
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SYNTHETIC_SPAN.0, DEFAULT_SYNTHETIC_SPAN.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_generate_is_deterministic() {
        let a = generate(2020, 2020);
        let b = generate(2020, 2020);
        assert_eq!(a, b);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.temperature.avg.to_bits(), y.temperature.avg.to_bits());
            assert_eq!(x.solar_radiation.to_bits(), y.solar_radiation.to_bits());
        }
    }

    #[test]
    fn test_generate_covers_every_day() {
        let series = generate(2019, 2020);
        let expected = (day(2020, 12, 31) - day(2019, 1, 1)).num_days() as usize + 1;
        assert_eq!(series.len(), expected);
        assert_eq!(series.first().unwrap().date, "2019-01-01");
        assert_eq!(series.last().unwrap().date, "2020-12-31");
        for pair in series.windows(2) {
            let a = pair[0].calendar_day().unwrap();
            let b = pair[1].calendar_day().unwrap();
            assert_eq!(b - a, chrono::Duration::days(1));
        }
    }

    #[test]
    fn test_generate_inverted_years_is_empty() {
        assert!(generate(2021, 2020).is_empty());
    }

    #[test]
    fn test_generated_values_are_plausible() {
        for p in generate(2020, 2020) {
            assert!(p.temperature.min < p.temperature.avg);
            assert!(p.temperature.max > p.temperature.avg);
            assert!(p.precipitation >= 0.0);
            assert!((0.0..360.0).contains(&p.wind.direction));
            assert!((1000.0..=1020.0).contains(&p.pressure));
        }
    }

    #[test]
    fn test_range_within_span_matches_filter() {
        let generator = SyntheticGenerator::new(2020, 2021);
        let got = generator.range(day(2021, 2, 27), day(2021, 3, 2));
        let expected = filter_by_date_range(&generate(2020, 2021), day(2021, 2, 27), day(2021, 3, 2));
        assert_eq!(got, expected);
        assert_eq!(got.len(), 4);
    }

    #[test]
    fn test_range_outside_span_still_succeeds() {
        let generator = SyntheticGenerator::new(2020, 2020);
        let got = generator.range(day(1970, 1, 1), day(1970, 1, 10));
        assert_eq!(got.len(), 10);
        assert_eq!(got[0].date, "1970-01-01");
        assert!(generator.range(day(2020, 2, 1), day(2020, 1, 1)).is_empty());
    }

    #[test]
    fn test_day_and_sample() {
        let generator = SyntheticGenerator::new(2020, 2020);
        assert_eq!(generator.day(day(2020, 6, 1)).date, "2020-06-01");
        let sample = generator.sample(30);
        assert_eq!(sample.len(), 30);
        assert_eq!(sample[0].date, "2020-01-01");
    }
}
