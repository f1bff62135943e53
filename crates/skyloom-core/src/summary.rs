//! Summary statistics and trend calculations over a weather series

use crate::types::WeatherDataPoint;
use serde::{Deserialize, Serialize};

/// Trends within this band (in the field's display unit) count as stable
pub const STABLE_TREND_THRESHOLD: f64 = 0.1;

/// Min/max/average and first-half-vs-second-half trend of one field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub trend: f64,
}

impl FieldStats {
    pub fn direction(&self) -> TrendDirection {
        TrendDirection::classify(self.trend)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PrecipitationStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub trend: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HumiditySummary {
    pub relative: FieldStats,
    pub specific: FieldStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindSummary {
    pub speed: FieldStats,
    /// Plain arithmetic mean, no circular correction
    pub direction: FieldStats,
}

/// Aggregate over a series; never persisted
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSummary {
    pub temperature: FieldStats,
    pub humidity: HumiditySummary,
    pub wind: WindSummary,
    pub precipitation: PrecipitationStats,
    pub pressure: FieldStats,
    pub solar_radiation: FieldStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Up,
    Down,
    Stable,
}

impl TrendDirection {
    pub fn classify(trend: f64) -> Self {
        if trend > STABLE_TREND_THRESHOLD {
            TrendDirection::Up
        } else if trend < -STABLE_TREND_THRESHOLD {
            TrendDirection::Down
        } else {
            TrendDirection::Stable
        }
    }
}

/// Accumulator collecting one field's values in series order
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    observations: Vec<f64>,
}

impl Accumulator {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            observations: Vec::with_capacity(capacity),
        }
    }

    pub fn add(&mut self, value: f64) {
        self.observations.push(value);
    }

    pub fn sum(&self) -> f64 {
        self.observations.iter().sum()
    }

    /// Stats of the collected values; all zero when empty
    pub fn stats(&self) -> FieldStats {
        if self.observations.is_empty() {
            return FieldStats::default();
        }

        let min = self
            .observations
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        let max = self
            .observations
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);

        FieldStats {
            min,
            max,
            avg: mean(&self.observations),
            trend: self.trend(),
        }
    }

    /// Mean of the second half minus mean of the first half.
    ///
    /// The split is at `floor(n / 2)`, so for odd `n` the second half holds
    /// the extra element. Fewer than two values yield zero.
    pub fn trend(&self) -> f64 {
        let half = self.observations.len() / 2;
        if half == 0 {
            return 0.0;
        }
        let (first, second) = self.observations.split_at(half);
        mean(second) - mean(first)
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Reduce a series into trend-annotated summary statistics
pub fn summarize(series: &[WeatherDataPoint]) -> WeatherSummary {
    let n = series.len();
    let mut temperature = Accumulator::with_capacity(n);
    let mut relative = Accumulator::with_capacity(n);
    let mut specific = Accumulator::with_capacity(n);
    let mut wind_speed = Accumulator::with_capacity(n);
    let mut wind_direction = Accumulator::with_capacity(n);
    let mut precipitation = Accumulator::with_capacity(n);
    let mut pressure = Accumulator::with_capacity(n);
    let mut solar = Accumulator::with_capacity(n);

    for point in series {
        temperature.add(point.temperature.avg);
        relative.add(point.humidity.relative);
        specific.add(point.humidity.specific);
        wind_speed.add(point.wind.speed);
        wind_direction.add(point.wind.direction);
        precipitation.add(point.precipitation);
        pressure.add(point.pressure);
        solar.add(point.solar_radiation);
    }

    let rain = precipitation.stats();
    WeatherSummary {
        temperature: temperature.stats(),
        humidity: HumiditySummary {
            relative: relative.stats(),
            specific: specific.stats(),
        },
        wind: WindSummary {
            speed: wind_speed.stats(),
            direction: wind_direction.stats(),
        },
        precipitation: PrecipitationStats {
            min: rain.min,
            max: rain.max,
            avg: rain.avg,
            trend: rain.trend,
            total: precipitation.sum(),
        },
        pressure: pressure.stats(),
        solar_radiation: solar.stats(),
    }
}
