//! NASA POWER reanalysis client
//!
//! Point/temporal queries by coordinates, date range and parameter codes.
//! See: https://power.larc.nasa.gov/docs/services/api/temporal/

use crate::{
    CacheStats, Place, ProviderError, ProviderQuery, ProviderResult, ResponseCache,
    WeatherProvider, DEFAULT_CACHE_TTL,
};
use reqwest::Client;
use serde::Deserialize;
use skyloom_core::{
    format_compact_date, normalize_series, Coordinates, Humidity, Resolution, Temperature,
    WeatherDataPoint, Wind,
};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::time::Duration;
use tracing::{debug, instrument};

pub const NASA_POWER_BASE_URL: &str = "https://power.larc.nasa.gov/api";
pub const NASA_DEFAULT_COMMUNITY: &str = "AG";

/// Upstream marker for "no value"
const FILL_VALUE: f64 = -999.0;

/// Parameter codes requested from the temporal endpoint
pub const NASA_PARAMETERS: [&str; 10] = [
    "T2M",
    "T2M_MAX",
    "T2M_MIN",
    "RH2M",
    "QV2M",
    "WS2M",
    "WD2M",
    "PRECTOTCORR",
    "PS",
    "ALLSKY_SFC_SW_DWN",
];

#[derive(Debug, Deserialize)]
struct PowerResponse {
    properties: PowerProperties,
}

#[derive(Debug, Deserialize)]
struct PowerProperties {
    #[serde(default)]
    parameter: HashMap<String, BTreeMap<String, Option<f64>>>,
}

#[derive(Debug)]
pub struct NasaPowerClient {
    http: Client,
    base_url: String,
    community: String,
    cache: ResponseCache<Vec<WeatherDataPoint>>,
}

impl NasaPowerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ProviderResult<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            community: NASA_DEFAULT_COMMUNITY.to_string(),
            cache: ResponseCache::new(DEFAULT_CACHE_TTL),
        })
    }

    pub fn with_cache(mut self, cache: ResponseCache<Vec<WeatherDataPoint>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_community(mut self, community: impl Into<String>) -> Self {
        self.community = community.into();
        self
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    fn endpoint(&self, resolution: Resolution) -> String {
        format!("{}/temporal/{}/point", self.base_url, resolution.as_str())
    }

    fn query_params(&self, at: Coordinates, query: &ProviderQuery) -> Vec<(&'static str, String)> {
        // Monthly endpoint takes whole years
        let date_format = match query.resolution {
            Resolution::Monthly => "%Y",
            Resolution::Daily | Resolution::Hourly => "%Y%m%d",
        };
        vec![
            ("parameters", NASA_PARAMETERS.join(",")),
            ("community", self.community.clone()),
            ("longitude", at.longitude.to_string()),
            ("latitude", at.latitude.to_string()),
            ("start", query.start.format(date_format).to_string()),
            ("end", query.end.format(date_format).to_string()),
            ("format", "JSON".to_string()),
        ]
    }

    async fn request(&self, at: Coordinates, query: &ProviderQuery) -> ProviderResult<String> {
        let res = self
            .http
            .get(self.endpoint(query.resolution))
            .query(&self.query_params(at, query))
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
        Ok(body)
    }
}

#[async_trait::async_trait]
impl WeatherProvider for NasaPowerClient {
    fn name(&self) -> &str {
        "nasa-power"
    }

    #[instrument(skip(self), fields(provider = "nasa-power"))]
    async fn fetch(&self, query: &ProviderQuery) -> ProviderResult<Vec<WeatherDataPoint>> {
        let Place::Coordinates(at) = query.place else {
            return Err(ProviderError::Unsupported(
                "NASA POWER requires coordinates".to_string(),
            ));
        };

        let key = query.cache_key(&NASA_PARAMETERS);
        if let Some(series) = self.cache.get(&key).await {
            debug!(%key, "returning cached NASA POWER series");
            return Ok(series);
        }

        let body = self.request(at, query).await?;
        let series = parse_power_response(&body, query.resolution)?;
        debug!(points = series.len(), "fetched NASA POWER series");

        self.cache.insert(key, series.clone()).await;
        Ok(series)
    }
}

/// Translate a POWER JSON body into the canonical series
pub fn parse_power_response(
    body: &str,
    resolution: Resolution,
) -> ProviderResult<Vec<WeatherDataPoint>> {
    let response: PowerResponse =
        serde_json::from_str(body).map_err(|e| ProviderError::Parse(e.to_string()))?;
    let parameters = response.properties.parameter;
    if parameters.is_empty() {
        return Err(ProviderError::Parse(
            "response carries no parameter data".to_string(),
        ));
    }

    let dates: BTreeSet<&String> = parameters.values().flat_map(|m| m.keys()).collect();
    let value = |code: &str, date: &str| -> Option<f64> {
        parameters
            .get(code)
            .and_then(|series| series.get(date))
            .copied()
            .flatten()
            .filter(|v| v.is_finite() && *v != FILL_VALUE)
    };
    let or_zero = |code: &str, date: &str| value(code, date).unwrap_or(0.0);

    let series = dates
        .into_iter()
        .filter_map(|raw| {
            let raw = raw.as_str();
            let date = format_compact_date(raw, resolution)?;
            Some(WeatherDataPoint {
                date,
                temperature: Temperature {
                    avg: or_zero("T2M", raw),
                    min: or_zero("T2M_MIN", raw),
                    max: or_zero("T2M_MAX", raw),
                },
                humidity: Humidity {
                    relative: or_zero("RH2M", raw),
                    specific: or_zero("QV2M", raw),
                },
                wind: Wind {
                    speed: or_zero("WS2M", raw),
                    direction: or_zero("WD2M", raw),
                },
                precipitation: value("PRECTOTCORR", raw)
                    .or_else(|| value("PRECTOT", raw))
                    .unwrap_or(0.0),
                pressure: kpa_to_hpa(or_zero("PS", raw)),
                solar_radiation: or_zero("ALLSKY_SFC_SW_DWN", raw),
            })
        })
        .collect();

    Ok(normalize_series(series))
}

/// POWER reports surface pressure in kPa
fn kpa_to_hpa(kpa: f64) -> f64 {
    kpa * 10.0
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAILY_BODY: &str = r#"{
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [-0.1278, 51.5074, 20.0]},
        "properties": {
            "parameter": {
                "T2M": {"20240116": 5.5, "20240115": 4.0},
                "T2M_MIN": {"20240115": 1.0, "20240116": 2.0},
                "T2M_MAX": {"20240115": 7.0, "20240116": 8.0},
                "RH2M": {"20240115": 80.0, "20240116": -999.0},
                "PRECTOTCORR": {"20240115": 1.2, "20240116": 0.0},
                "PS": {"20240115": 101.3, "20240116": 100.9}
            }
        }
    }"#;

    #[test]
    fn test_parse_daily_response() {
        let series = parse_power_response(DAILY_BODY, Resolution::Daily).unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].date, "2024-01-15");
        assert_eq!(series[1].date, "2024-01-16");
        assert_eq!(series[0].temperature.avg, 4.0);
        assert_eq!(series[0].temperature.min, 1.0);
        assert_eq!(series[0].precipitation, 1.2);
        assert!((series[0].pressure - 1013.0).abs() < 1e-9);
    }

    #[test]
    fn test_missing_and_fill_values_become_zero() {
        let series = parse_power_response(DAILY_BODY, Resolution::Daily).unwrap();
        assert_eq!(series[1].humidity.relative, 0.0);
        // WS2M absent entirely
        assert_eq!(series[0].wind.speed, 0.0);
        assert_eq!(series[0].solar_radiation, 0.0);
    }

    #[test]
    fn test_monthly_annual_rows_are_dropped() {
        let body = r#"{"properties": {"parameter": {
            "T2M": {"202401": 3.0, "202402": 4.0, "202413": 11.0}
        }}}"#;
        let series = parse_power_response(body, Resolution::Monthly).unwrap();
        let dates: Vec<_> = series.iter().map(|p| p.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-02-01"]);
    }

    #[test]
    fn test_empty_or_invalid_payload_is_parse_error() {
        let empty = r#"{"properties": {"parameter": {}}}"#;
        assert!(matches!(
            parse_power_response(empty, Resolution::Daily),
            Err(ProviderError::Parse(_))
        ));
        assert!(matches!(
            parse_power_response("<html>", Resolution::Daily),
            Err(ProviderError::Parse(_))
        ));
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short"), "short");
        assert!(truncate_body(&"x".repeat(500)).len() < 210);
    }
}
