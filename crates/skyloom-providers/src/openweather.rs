//! OpenWeatherMap live-weather client and geocoder
//!
//! The One Call endpoint has no range query, so a date range is approximated
//! with one request per day. A day whose request fails is filled in from the
//! synthetic generator instead of aborting the whole range.

use crate::nasa::truncate_body;
use crate::{
    CacheStats, GeocodedPlace, Geocoder, Place, ProviderError, ProviderQuery, ProviderResult,
    ResponseCache, SyntheticGenerator, WeatherProvider, DEFAULT_CACHE_TTL,
};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use skyloom_core::{
    days_in_range, Coordinates, Humidity, Resolution, Temperature, WeatherDataPoint, Wind,
    ISO_DATE_FORMAT,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Concurrent per-day requests in flight
pub const DEFAULT_FANOUT: usize = 4;

/// Upstream fields folded into each point, part of the cache key
const ONECALL_FIELDS: [&str; 7] = [
    "temp",
    "humidity",
    "wind_speed",
    "wind_deg",
    "rain",
    "pressure",
    "uvi",
];

#[derive(Debug, Deserialize)]
struct GeoEntry {
    name: String,
    lat: f64,
    lon: f64,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: Option<String>,
}

impl GeoEntry {
    fn into_place(self) -> GeocodedPlace {
        let name = [Some(self.name), self.state, self.country]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        GeocodedPlace {
            name,
            coordinates: Coordinates::new(self.lat, self.lon),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OneCallResponse {
    #[serde(default)]
    daily: Vec<OneCallDay>,
}

#[derive(Debug, Deserialize)]
struct OneCallDay {
    temp: OneCallTemp,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    wind_deg: f64,
    #[serde(default)]
    rain: Option<f64>,
    #[serde(default)]
    pressure: f64,
    #[serde(default)]
    uvi: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct OneCallTemp {
    day: f64,
    min: f64,
    max: f64,
}

impl OneCallDay {
    fn into_point(self, date: NaiveDate) -> WeatherDataPoint {
        let mut point = WeatherDataPoint {
            date: date.format(ISO_DATE_FORMAT).to_string(),
            temperature: Temperature {
                avg: self.temp.day,
                min: self.temp.min,
                max: self.temp.max,
            },
            humidity: Humidity {
                relative: self.humidity,
                specific: specific_humidity(self.temp.day, self.humidity, self.pressure),
            },
            wind: Wind {
                speed: self.wind_speed,
                direction: self.wind_deg,
            },
            precipitation: self.rain.unwrap_or(0.0),
            pressure: self.pressure,
            // Rough estimate from the UV index
            solar_radiation: self.uvi.unwrap_or(0.0) * 25.0,
        };
        point.sanitize();
        point
    }
}

/// Specific humidity (g/kg) from temperature (°C), relative humidity (%) and
/// pressure (hPa), using the Magnus approximation for saturation pressure.
pub fn specific_humidity(temp_c: f64, relative: f64, pressure_hpa: f64) -> f64 {
    if pressure_hpa <= 0.0 {
        return 0.0;
    }
    let saturation = 6.112 * (17.67 * temp_c / (temp_c + 243.5)).exp();
    let vapour = relative / 100.0 * saturation;
    622.0 * vapour / (pressure_hpa - 0.378 * vapour)
}

pub struct OpenWeatherClient {
    http: Client,
    base_url: String,
    api_key: String,
    fanout: usize,
    synthetic: Arc<SyntheticGenerator>,
    cache: ResponseCache<Vec<WeatherDataPoint>>,
}

impl OpenWeatherClient {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        synthetic: Arc<SyntheticGenerator>,
    ) -> ProviderResult<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(ProviderError::MissingCredentials("openweathermap"));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            fanout: DEFAULT_FANOUT,
            synthetic,
            cache: ResponseCache::new(DEFAULT_CACHE_TTL),
        })
    }

    pub fn with_cache(mut self, cache: ResponseCache<Vec<WeatherDataPoint>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_fanout(mut self, fanout: usize) -> Self {
        self.fanout = fanout.max(1);
        self
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> ProviderResult<T> {
        let res = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .query(params)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }
        serde_json::from_str(&body).map_err(|e| ProviderError::Parse(e.to_string()))
    }

    async fn fetch_day(&self, at: Coordinates, date: NaiveDate) -> ProviderResult<WeatherDataPoint> {
        let noon = date
            .and_hms_opt(12, 0, 0)
            .ok_or_else(|| ProviderError::Parse(format!("invalid date {date}")))?;
        let params = [
            ("lat", at.latitude.to_string()),
            ("lon", at.longitude.to_string()),
            ("dt", noon.and_utc().timestamp().to_string()),
            ("units", "metric".to_string()),
            ("exclude", "current,minutely,hourly,alerts".to_string()),
        ];
        let response: OneCallResponse = self.get_json("/data/3.0/onecall", &params).await?;
        let day = response
            .daily
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Parse("response contained no daily data".to_string()))?;
        Ok(day.into_point(date))
    }

    async fn resolve(&self, place: &Place) -> ProviderResult<Coordinates> {
        match place {
            Place::Coordinates(at) => Ok(*at),
            Place::Named(name) => self.geocode(name).await,
        }
    }
}

#[async_trait::async_trait]
impl WeatherProvider for OpenWeatherClient {
    fn name(&self) -> &str {
        "openweathermap"
    }

    #[instrument(skip(self), fields(provider = "openweathermap"))]
    async fn fetch(&self, query: &ProviderQuery) -> ProviderResult<Vec<WeatherDataPoint>> {
        if query.resolution != Resolution::Daily {
            return Err(ProviderError::Unsupported(format!(
                "{} resolution is not available from One Call",
                query.resolution
            )));
        }

        let key = query.cache_key(&ONECALL_FIELDS);
        if let Some(series) = self.cache.get(&key).await {
            debug!(%key, "returning cached OpenWeatherMap series");
            return Ok(series);
        }

        let at = self.resolve(&query.place).await?;
        let days = days_in_range(query.start, query.end);

        let outcomes: Vec<(NaiveDate, ProviderResult<WeatherDataPoint>)> =
            stream::iter(days.iter().copied())
                .map(|date| async move { (date, self.fetch_day(at, date).await) })
                .buffered(self.fanout)
                .collect()
                .await;

        let mut failures = 0usize;
        let series: Vec<WeatherDataPoint> = outcomes
            .into_iter()
            .map(|(date, outcome)| match outcome {
                Ok(point) => point,
                Err(e) => {
                    warn!(%date, error = %e, "day request failed, substituting synthetic data");
                    failures += 1;
                    self.synthetic.day(date)
                }
            })
            .collect();

        // An all-synthetic series would mask the outage; failing here lets the
        // reanalysis tier answer instead.
        if !days.is_empty() && failures == days.len() {
            return Err(ProviderError::AllUnitsFailed(failures));
        }

        if failures == 0 {
            self.cache.insert(key, series.clone()).await;
        } else {
            info!(failures, total = days.len(), "partial series not cached");
        }
        Ok(series)
    }
}

#[async_trait::async_trait]
impl Geocoder for OpenWeatherClient {
    async fn geocode(&self, name: &str) -> ProviderResult<Coordinates> {
        self.search(name, 1)
            .await?
            .into_iter()
            .next()
            .map(|place| place.coordinates)
            .ok_or_else(|| ProviderError::LocationNotFound(name.to_string()))
    }

    async fn search(&self, query: &str, limit: usize) -> ProviderResult<Vec<GeocodedPlace>> {
        let params = [("q", query.to_string()), ("limit", limit.to_string())];
        let entries: Vec<GeoEntry> = self.get_json("/geo/1.0/direct", &params).await?;
        Ok(entries.into_iter().map(GeoEntry::into_place).collect())
    }
}

impl std::fmt::Debug for OpenWeatherClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenWeatherClient")
            .field("base_url", &self.base_url)
            .field("fanout", &self.fanout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_is_rejected() {
        let err = OpenWeatherClient::new(
            "  ",
            OPENWEATHER_BASE_URL,
            Duration::from_secs(1),
            Arc::new(SyntheticGenerator::default()),
        )
        .unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredentials(_)));
    }

    #[test]
    fn test_specific_humidity_magnus() {
        // 20 °C, 50 % RH at sea level is roughly 7.3 g/kg
        let q = specific_humidity(20.0, 50.0, 1013.25);
        assert!((q - 7.3).abs() < 0.2, "got {q}");
        assert_eq!(specific_humidity(20.0, 50.0, 0.0), 0.0);
    }

    #[test]
    fn test_one_call_day_conversion() {
        let json = r#"{
            "dt": 1705320000,
            "temp": {"day": 3.5, "min": -1.0, "max": 6.0, "night": 0.0},
            "humidity": 70,
            "wind_speed": 4.2,
            "wind_deg": 250,
            "pressure": 1012,
            "uvi": 2.0
        }"#;
        let day: OneCallDay = serde_json::from_str(json).unwrap();
        let point = day.into_point(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(point.date, "2024-01-15");
        assert_eq!(point.temperature.min, -1.0);
        assert_eq!(point.wind.direction, 250.0);
        assert_eq!(point.precipitation, 0.0);
        assert_eq!(point.solar_radiation, 50.0);
        assert!(point.humidity.specific > 0.0);
    }

    #[test]
    fn test_geo_entry_display_name() {
        let entry: GeoEntry = serde_json::from_str(
            r#"{"name": "Portland", "lat": 45.5, "lon": -122.7, "state": "Oregon", "country": "US"}"#,
        )
        .unwrap();
        let place = entry.into_place();
        assert_eq!(place.name, "Portland, Oregon, US");
        assert_eq!(place.coordinates, Coordinates::new(45.5, -122.7));
    }
}
