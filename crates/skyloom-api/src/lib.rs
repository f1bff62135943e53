use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Result;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use opentelemetry::metrics::{Counter, MeterProvider};
use opentelemetry::KeyValue;
use opentelemetry_prometheus::exporter;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use prometheus::{Encoder, Registry, TextEncoder};
use serde::{Deserialize, Serialize};
use skyloom_core::{parse_date_range, Resolution};
use skyloom_service::{ServiceError, WeatherService};

/// Response envelope shared by every `/api` route
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }
}

/// Client-facing text for `provider_error`
pub const PROVIDER_FAILURE_MESSAGE: &str = "all weather providers failed";

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "validation_error",
            message: message.into(),
        }
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        let (status, code) = match &e {
            ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ServiceError::LocationNotFound(_) => (StatusCode::NOT_FOUND, "location_not_found"),
            ServiceError::Provider(_) => (StatusCode::INTERNAL_SERVER_ERROR, "provider_error"),
            ServiceError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
            }
        };
        if status.is_server_error() {
            tracing::error!(error = %e, code, "request failed");
        }
        // Upstream bodies stay in the logs
        let message = match e {
            ServiceError::Provider(_) => PROVIDER_FAILURE_MESSAGE.to_string(),
            other => other.to_string(),
        };
        Self {
            status,
            code,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(self.code.to_string()),
            message: Some(self.message),
        };
        (self.status, Json(body)).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

pub struct AppState {
    ready: AtomicBool,
    registry: Registry,
    #[allow(dead_code)]
    provider: SdkMeterProvider,
    requests_total: Counter<u64>,
    service: Arc<WeatherService>,
}

impl AppState {
    fn count(&self, route: &'static str) {
        self.requests_total.add(1, &[KeyValue::new("route", route)]);
    }
}

pub fn build_app(service: Arc<WeatherService>) -> Result<(Router, Arc<AppState>)> {
    // Prometheus exporter via OpenTelemetry
    let registry = Registry::new();
    let reader = exporter().with_registry(registry.clone()).build()?;
    let provider = SdkMeterProvider::builder().with_reader(reader).build();
    let meter = provider.meter("skyloom-api");

    let requests_total = meter
        .u64_counter("skyloom_requests_total")
        .with_description("Total HTTP requests served")
        .init();

    let state = Arc::new(AppState {
        ready: AtomicBool::new(false),
        registry,
        provider,
        requests_total,
        service,
    });

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/api/weather/data", get(weather_data))
        .route("/api/weather/summary", get(weather_summary))
        .route("/api/weather/coordinates", get(weather_by_coordinates))
        .route("/api/weather/locations", get(locations))
        .route("/api/weather/search-locations", get(search_locations))
        .route("/api/weather/nearby-places", get(nearby_places))
        .fallback(not_found)
        .with_state(Arc::clone(&state));

    Ok((router, state))
}

pub fn set_ready(state: &Arc<AppState>, is_ready: bool) {
    state.ready.store(is_ready, Ordering::Relaxed);
}

async fn healthz(State(state): State<Arc<AppState>>) -> StatusCode {
    state.count("healthz");
    StatusCode::OK
}

async fn readyz(State(state): State<Arc<AppState>>) -> StatusCode {
    if state.ready.load(Ordering::Relaxed) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

async fn metrics(
    State(state): State<Arc<AppState>>,
) -> (
    [(axum::http::header::HeaderName, axum::http::HeaderValue); 1],
    String,
) {
    let encoder = TextEncoder::new();
    let metric_families = state.registry.gather();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buf) {
        tracing::warn!(error=?e, "failed to encode metrics");
    }
    let body = String::from_utf8(buf).unwrap_or_default();
    let header = (
        header::CONTENT_TYPE,
        axum::http::HeaderValue::from_static("text/plain; version=0.0.4; charset=utf-8"),
    );
    ([header], body)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError {
        status: StatusCode::NOT_FOUND,
        code: "route_not_found",
        message: format!("Cannot GET {}", uri.path()),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RangeQuery {
    location: Option<String>,
    lat: Option<String>,
    lng: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    resolution: Option<String>,
}

/// Parsed date range and resolution shared by the series routes
struct Range {
    start: chrono::NaiveDate,
    end: chrono::NaiveDate,
    resolution: Resolution,
}

impl RangeQuery {
    fn location(&self) -> std::result::Result<&str, ApiError> {
        non_empty(&self.location).ok_or_else(|| {
            ApiError::validation("location, startDate, and endDate are required")
        })
    }

    fn range(&self) -> std::result::Result<Range, ApiError> {
        let (Some(start), Some(end)) = (non_empty(&self.start_date), non_empty(&self.end_date))
        else {
            return Err(ApiError::validation("startDate and endDate are required"));
        };
        let (start, end) = parse_date_range(start, end).map_err(ServiceError::from)?;
        let resolution = match non_empty(&self.resolution) {
            Some(raw) => raw
                .parse()
                .map_err(|e: skyloom_core::UnknownResolution| ApiError::validation(e.to_string()))?,
            None => Resolution::default(),
        };
        Ok(Range {
            start,
            end,
            resolution,
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(name: &str, value: &Option<String>) -> std::result::Result<Option<f64>, ApiError> {
    match non_empty(value) {
        None => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .map(Some)
            .map_err(|_| ApiError::validation(format!("{name} must be a number, got '{raw}'"))),
    }
}

fn required_number(name: &str, value: &Option<String>) -> std::result::Result<f64, ApiError> {
    parse_number(name, value)?.ok_or_else(|| ApiError::validation(format!("{name} is required")))
}

async fn weather_data(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Vec<skyloom_core::WeatherDataPoint>> {
    state.count("data");
    let location = q.location()?;
    let range = q.range()?;
    let series = state
        .service
        .get_weather_data(location, range.start, range.end, range.resolution)
        .await?;
    Ok(Json(ApiResponse::ok(series)))
}

async fn weather_summary(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<skyloom_core::WeatherSummary> {
    state.count("summary");
    let location = q.location()?;
    let range = q.range()?;
    let summary = state
        .service
        .get_weather_summary(location, range.start, range.end, range.resolution)
        .await?;
    Ok(Json(ApiResponse::ok(summary)))
}

async fn weather_by_coordinates(
    State(state): State<Arc<AppState>>,
    Query(q): Query<RangeQuery>,
) -> ApiResult<Vec<skyloom_core::WeatherDataPoint>> {
    state.count("coordinates");
    let lat = required_number("lat", &q.lat)?;
    let lng = required_number("lng", &q.lng)?;
    let range = q.range()?;
    let series = state
        .service
        .get_weather_data_by_coordinates(lat, lng, range.start, range.end, range.resolution)
        .await?;
    Ok(Json(ApiResponse::ok(series)))
}

async fn locations(State(state): State<Arc<AppState>>) -> ApiResult<Vec<skyloom_core::LocationData>> {
    state.count("locations");
    Ok(Json(ApiResponse::ok(state.service.locations())))
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    q: Option<String>,
}

async fn search_locations(
    State(state): State<Arc<AppState>>,
    Query(q): Query<SearchQuery>,
) -> ApiResult<Vec<skyloom_core::LocationData>> {
    state.count("search-locations");
    let hits = state
        .service
        .search_locations(q.q.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(ApiResponse::ok(hits)))
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    lat: Option<String>,
    lng: Option<String>,
    radius: Option<String>,
}

async fn nearby_places(
    State(state): State<Arc<AppState>>,
    Query(q): Query<NearbyQuery>,
) -> ApiResult<Vec<skyloom_core::LocationData>> {
    state.count("nearby-places");
    let lat = required_number("lat", &q.lat)?;
    let lng = required_number("lng", &q.lng)?;
    let radius = parse_number("radius", &q.radius)?;
    let places = state.service.nearby_places(lat, lng, radius)?;
    Ok(Json(ApiResponse::ok(places)))
}
