//! Provider fallback orchestration
//!
//! Named requests try the live provider, then the reanalysis provider (via
//! the catalog), then the synthetic generator, which cannot fail. Coordinate
//! requests never reach the synthetic tier.

use crate::{LocationCatalog, ServiceError, ServiceResult};
use chrono::NaiveDate;
use skyloom_core::{
    clip_to_range, is_valid_date_range, summarize, Coordinates, LocationData, Resolution,
    WeatherDataPoint, WeatherSummary,
};
use skyloom_providers::{
    Geocoder, Place, ProviderError, ProviderQuery, SyntheticGenerator, WeatherProvider,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_SAMPLE_DAYS: usize = 30;
pub const DEFAULT_NEARBY_RADIUS_M: f64 = 50_000.0;
pub const MIN_SEARCH_LEN: usize = 2;
pub const MAX_SEARCH_RESULTS: usize = 10;
/// Longest accepted request range, in days (about ten years)
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 3660;

pub struct WeatherService {
    live: Option<Arc<dyn WeatherProvider>>,
    reanalysis: Option<Arc<dyn WeatherProvider>>,
    geocoder: Option<Arc<dyn Geocoder>>,
    synthetic: Arc<SyntheticGenerator>,
    catalog: LocationCatalog,
    use_reanalysis: AtomicBool,
    sample_days: usize,
    max_range_days: u32,
}

impl WeatherService {
    /// Synthetic-only service; add tiers with the `with_*` builders
    pub fn new(synthetic: Arc<SyntheticGenerator>, catalog: LocationCatalog) -> Self {
        Self {
            live: None,
            reanalysis: None,
            geocoder: None,
            synthetic,
            catalog,
            use_reanalysis: AtomicBool::new(true),
            sample_days: DEFAULT_SAMPLE_DAYS,
            max_range_days: DEFAULT_MAX_RANGE_DAYS,
        }
    }

    pub fn with_live(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.live = Some(provider);
        self
    }

    pub fn with_reanalysis(mut self, provider: Arc<dyn WeatherProvider>) -> Self {
        self.reanalysis = Some(provider);
        self
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn Geocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }

    pub fn with_max_range_days(mut self, days: u32) -> Self {
        self.max_range_days = days.max(1);
        self
    }

    pub fn with_sample_days(mut self, days: usize) -> Self {
        self.sample_days = days;
        self
    }

    /// Enable or disable the reanalysis tier for subsequent calls
    pub fn set_use_nasa_api(&self, enabled: bool) {
        self.use_reanalysis.store(enabled, Ordering::SeqCst);
        info!(enabled, "reanalysis tier toggled");
    }

    pub fn uses_nasa_api(&self) -> bool {
        self.use_reanalysis.load(Ordering::SeqCst)
    }

    fn check_range(&self, start: NaiveDate, end: NaiveDate) -> ServiceResult<()> {
        if !is_valid_date_range(start, end) {
            return Err(ServiceError::Validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        let days = (end - start).num_days() + 1;
        if days > i64::from(self.max_range_days) {
            return Err(ServiceError::Validation(format!(
                "date range spans {days} days, the limit is {}",
                self.max_range_days
            )));
        }
        Ok(())
    }

    pub fn catalog(&self) -> &LocationCatalog {
        &self.catalog
    }

    fn reanalysis_tier(&self) -> Option<&Arc<dyn WeatherProvider>> {
        self.reanalysis.as_ref().filter(|_| self.uses_nasa_api())
    }

    /// Series for a named location; always succeeds for a valid request
    #[instrument(skip(self))]
    pub async fn get_weather_data(
        &self,
        location: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> ServiceResult<Vec<WeatherDataPoint>> {
        let location = location.trim();
        if location.is_empty() {
            return Err(ServiceError::Validation("location is required".into()));
        }
        self.check_range(start, end)?;

        if let Some(live) = &self.live {
            let query =
                ProviderQuery::new(Place::Named(location.to_string()), start, end, resolution);
            match live.fetch(&query).await {
                Ok(series) => return Ok(clip_to_range(&series, start, end, resolution)),
                Err(e) => log_tier_failure(live.as_ref(), &e),
            }
        }

        if let Some(reanalysis) = self.reanalysis_tier() {
            match self.catalog.lookup(location) {
                Some(entry) => {
                    let query = ProviderQuery::new(
                        Place::Coordinates(entry.coordinates),
                        start,
                        end,
                        resolution,
                    );
                    match reanalysis.fetch(&query).await {
                        Ok(series) => return Ok(clip_to_range(&series, start, end, resolution)),
                        Err(e) => log_tier_failure(reanalysis.as_ref(), &e),
                    }
                }
                None => info!(
                    tier = reanalysis.name(),
                    location, "location not in catalog, skipping tier"
                ),
            }
        }

        debug!(location, "serving synthetic series");
        Ok(self.synthetic.range(start, end))
    }

    pub async fn get_weather_summary(
        &self,
        location: &str,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> ServiceResult<WeatherSummary> {
        let series = self.get_weather_data(location, start, end, resolution).await?;
        Ok(summarize(&series))
    }

    /// Series for an explicit point; no catalog lookup and no synthetic fallback
    #[instrument(skip(self))]
    pub async fn get_weather_data_by_coordinates(
        &self,
        latitude: f64,
        longitude: f64,
        start: NaiveDate,
        end: NaiveDate,
        resolution: Resolution,
    ) -> ServiceResult<Vec<WeatherDataPoint>> {
        let at = checked_coordinates(latitude, longitude)?;
        self.check_range(start, end)?;

        let query = ProviderQuery::new(Place::Coordinates(at), start, end, resolution);
        let tiers = [self.live.as_ref(), self.reanalysis_tier()];
        let mut last_error: Option<ProviderError> = None;

        for provider in tiers.into_iter().flatten() {
            match provider.fetch(&query).await {
                Ok(series) => return Ok(clip_to_range(&series, start, end, resolution)),
                Err(e) => {
                    log_tier_failure(provider.as_ref(), &e);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(ServiceError::Provider(e)),
            None => Err(ServiceError::Configuration(
                "no coordinate-capable provider is enabled".into(),
            )),
        }
    }

    /// Featured catalog entries with a synthetic sample series
    pub fn locations(&self) -> Vec<LocationData> {
        let sample = self.synthetic.sample(self.sample_days);
        self.catalog
            .featured()
            .iter()
            .map(|entry| LocationData {
                data: sample.clone(),
                ..entry.to_location()
            })
            .collect()
    }

    /// Catalog substring match; the geocoder fills in when the catalog has nothing
    pub async fn search_locations(&self, query: &str) -> ServiceResult<Vec<LocationData>> {
        let query = query.trim();
        if query.chars().count() < MIN_SEARCH_LEN {
            return Err(ServiceError::Validation(format!(
                "search query must be at least {MIN_SEARCH_LEN} characters"
            )));
        }

        let hits: Vec<LocationData> = self
            .catalog
            .search(query, MAX_SEARCH_RESULTS)
            .into_iter()
            .map(|e| e.to_location())
            .collect();
        if !hits.is_empty() {
            return Ok(hits);
        }

        let Some(geocoder) = &self.geocoder else {
            return Ok(hits);
        };
        match geocoder.search(query, MAX_SEARCH_RESULTS).await {
            Ok(places) => Ok(places
                .into_iter()
                .take(MAX_SEARCH_RESULTS)
                .map(|p| LocationData {
                    name: p.name,
                    coordinates: p.coordinates,
                    data: Vec::new(),
                })
                .collect()),
            Err(e) => {
                warn!(error = %e, query, "geocoder search failed");
                Ok(hits)
            }
        }
    }

    /// Catalog entries within `radius_m` metres, nearest first
    pub fn nearby_places(
        &self,
        latitude: f64,
        longitude: f64,
        radius_m: Option<f64>,
    ) -> ServiceResult<Vec<LocationData>> {
        let at = checked_coordinates(latitude, longitude)?;
        let radius = radius_m.unwrap_or(DEFAULT_NEARBY_RADIUS_M);
        if !radius.is_finite() || radius <= 0.0 {
            return Err(ServiceError::Validation(format!(
                "radius must be a positive number of metres, got {radius}"
            )));
        }
        Ok(self
            .catalog
            .nearby(at, radius)
            .into_iter()
            .map(|(entry, _)| entry.to_location())
            .collect())
    }
}

impl std::fmt::Debug for WeatherService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherService")
            .field("live", &self.live.as_ref().map(|p| p.name().to_string()))
            .field("reanalysis", &self.reanalysis.as_ref().map(|p| p.name().to_string()))
            .field("geocoder", &self.geocoder.is_some())
            .field("use_reanalysis", &self.uses_nasa_api())
            .field("catalog_size", &self.catalog.len())
            .finish_non_exhaustive()
    }
}

fn log_tier_failure(provider: &dyn WeatherProvider, error: &ProviderError) {
    warn!(tier = provider.name(), error = %error, "provider tier failed, falling through");
}


fn checked_coordinates(latitude: f64, longitude: f64) -> ServiceResult<Coordinates> {
    let at = Coordinates::new(latitude, longitude);
    if !at.is_valid() {
        return Err(ServiceError::Validation(format!(
            "coordinates out of range: {latitude}, {longitude}"
        )));
    }
    Ok(at)
}
