//! Weather data provider adapters
//!
//! Each provider wraps one upstream weather API and translates its payload
//! into the canonical series. The synthetic generator is the infallible
//! terminal source used when every upstream fails.

pub mod cache;
pub mod nasa;
pub mod openweather;
pub mod synthetic;

pub use cache::*;
pub use nasa::*;
pub use openweather::*;
pub use synthetic::*;

use chrono::NaiveDate;
use skyloom_core::{Coordinates, Resolution, WeatherDataPoint};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid payload: {0}")]
    Parse(String),

    #[error("Location not found: {0}")]
    LocationNotFound(String),

    #[error("Missing credentials for {0}")]
    MissingCredentials(&'static str),

    #[error("Unsupported request: {0}")]
    Unsupported(String),

    #[error("All {0} per-day requests failed")]
    AllUnitsFailed(usize),
}

impl ProviderError {
    pub fn is_location_not_found(&self) -> bool {
        matches!(self, ProviderError::LocationNotFound(_))
    }
}

pub type ProviderResult<T> = Result<T, ProviderError>;

/// What a request is about: a place name still to be resolved, or a point
#[derive(Debug, Clone, PartialEq)]
pub enum Place {
    Named(String),
    Coordinates(Coordinates),
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Place::Named(name) => f.write_str(&name.trim().to_lowercase()),
            Place::Coordinates(c) => write!(f, "{:.4},{:.4}", c.latitude, c.longitude),
        }
    }
}

/// One provider request
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderQuery {
    pub place: Place,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub resolution: Resolution,
}

impl ProviderQuery {
    pub fn new(place: Place, start: NaiveDate, end: NaiveDate, resolution: Resolution) -> Self {
        Self {
            place,
            start,
            end,
            resolution,
        }
    }

    /// Composite cache key; `parameters` is the provider's upstream field list
    pub fn cache_key(&self, parameters: &[&str]) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.place,
            self.start,
            self.end,
            parameters.join(","),
            self.resolution
        )
    }
}

/// Trait for all upstream weather sources
#[async_trait::async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Provider name/identifier
    fn name(&self) -> &str;

    /// Fetch a canonical series, ascending by date
    async fn fetch(&self, query: &ProviderQuery) -> ProviderResult<Vec<WeatherDataPoint>>;
}

/// A geocoding hit
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodedPlace {
    pub name: String,
    pub coordinates: Coordinates,
}

/// Trait for name-to-coordinates resolution
#[async_trait::async_trait]
pub trait Geocoder: Send + Sync {
    /// Best match for `name`, or `LocationNotFound`
    async fn geocode(&self, name: &str) -> ProviderResult<Coordinates>;

    /// Up to `limit` candidates for a free-text query
    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<GeocodedPlace>>;
}
