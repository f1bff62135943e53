//! Core data types for weather series

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Geographic point, the join key into every provider request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Temperature in °C
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Relative humidity (%) and specific humidity (g/kg)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Humidity {
    pub relative: f64,
    pub specific: f64,
}

/// Wind speed (m/s) and direction (degrees, 0-360)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    pub direction: f64,
}

/// One observation for one calendar day (or hour/month, depending on resolution)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherDataPoint {
    /// `YYYY-MM-DD` for daily and monthly series, `YYYY-MM-DDTHH:00` for hourly
    pub date: String,
    pub temperature: Temperature,
    pub humidity: Humidity,
    pub wind: Wind,
    /// Accumulated depth (mm)
    pub precipitation: f64,
    /// Surface pressure (hPa)
    pub pressure: f64,
    /// Downward shortwave flux (W/m²)
    pub solar_radiation: f64,
}

impl WeatherDataPoint {
    /// All-zero point for the given date
    pub fn zeroed(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Default::default()
        }
    }

    /// Calendar day this point belongs to, parsed from the leading `YYYY-MM-DD`
    pub fn calendar_day(&self) -> Option<NaiveDate> {
        let day = self.date.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Replace every non-finite value with zero
    pub fn sanitize(&mut self) {
        for value in [
            &mut self.temperature.avg,
            &mut self.temperature.min,
            &mut self.temperature.max,
            &mut self.humidity.relative,
            &mut self.humidity.specific,
            &mut self.wind.speed,
            &mut self.wind.direction,
            &mut self.precipitation,
            &mut self.pressure,
            &mut self.solar_radiation,
        ] {
            if !value.is_finite() {
                *value = 0.0;
            }
        }
    }
}

/// A point of interest with a sample of its series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub name: String,
    pub coordinates: Coordinates,
    pub data: Vec<WeatherDataPoint>,
}

/// Time granularity of a series
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    Hourly,
    #[default]
    Daily,
    Monthly,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hourly => "hourly",
            Resolution::Daily => "daily",
            Resolution::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown resolution '{0}', expected hourly, daily or monthly")]
pub struct UnknownResolution(pub String);

impl FromStr for Resolution {
    type Err = UnknownResolution;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hourly" => Ok(Resolution::Hourly),
            "daily" => Ok(Resolution::Daily),
            "monthly" => Ok(Resolution::Monthly),
            _ => Err(UnknownResolution(s.to_string())),
        }
    }
}
