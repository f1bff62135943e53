use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use skyloom_core::{summarize, WeatherDataPoint, WeatherSummary};
use skyloom_providers::{
    ProviderError, ProviderQuery, ProviderResult, SyntheticGenerator, WeatherProvider,
};
use skyloom_service::{LocationCatalog, WeatherService};
use tower::ServiceExt;

struct FixedProvider(Vec<WeatherDataPoint>);

#[async_trait::async_trait]
impl WeatherProvider for FixedProvider {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn fetch(&self, _query: &ProviderQuery) -> ProviderResult<Vec<WeatherDataPoint>> {
        Ok(self.0.clone())
    }
}

struct DownProvider;

#[async_trait::async_trait]
impl WeatherProvider for DownProvider {
    fn name(&self) -> &str {
        "down"
    }

    async fn fetch(&self, _query: &ProviderQuery) -> ProviderResult<Vec<WeatherDataPoint>> {
        Err(ProviderError::Status {
            status: 502,
            body: "bad gateway".into(),
        })
    }
}

fn synthetic_app() -> Router {
    let service = WeatherService::new(
        Arc::new(SyntheticGenerator::new(2024, 2024)),
        LocationCatalog::builtin(),
    );
    skyloom_api::build_app(Arc::new(service)).unwrap().0
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let res = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = res.status();
    let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

#[tokio::test]
async fn weather_data_returns_synthetic_series() {
    let app = synthetic_app();
    let (status, json) = get(
        &app,
        "/api/weather/data?location=London&startDate=2024-01-01&endDate=2024-01-07",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);

    let series: Vec<WeatherDataPoint> = serde_json::from_value(json["data"].clone()).unwrap();
    assert_eq!(series.len(), 7);
    assert_eq!(series[0].date, "2024-01-01");
    assert!(json["data"][0].get("solarRadiation").is_some());
    assert!(json.get("error").is_none());
}

#[tokio::test]
async fn weather_summary_matches_series() {
    let app = synthetic_app();
    let query = "location=Tokyo&startDate=2024-03-01&endDate=2024-03-31";

    let (_, data) = get(&app, &format!("/api/weather/data?{query}")).await;
    let series: Vec<WeatherDataPoint> = serde_json::from_value(data["data"].clone()).unwrap();

    let (status, json) = get(&app, &format!("/api/weather/summary?{query}")).await;
    assert_eq!(status, StatusCode::OK);
    let summary: WeatherSummary = serde_json::from_value(json["data"].clone()).unwrap();
    assert_eq!(summary, summarize(&series));
    assert!(json["data"]["precipitation"].get("total").is_some());
}

#[tokio::test]
async fn missing_or_invalid_parameters_are_400() {
    let app = synthetic_app();
    for uri in [
        "/api/weather/data?startDate=2024-01-01&endDate=2024-01-07",
        "/api/weather/data?location=London&startDate=2024-01-01",
        "/api/weather/data?location=London&startDate=01/01/2024&endDate=2024-01-07",
        "/api/weather/summary?location=London&startDate=2024-02-01&endDate=2024-01-01",
        "/api/weather/data?location=London&startDate=2024-01-01&endDate=2024-01-07&resolution=weekly",
        "/api/weather/search-locations?q=a",
        "/api/weather/search-locations",
        "/api/weather/nearby-places?lat=abc&lng=0",
        "/api/weather/nearby-places?lat=95&lng=0",
        "/api/weather/data?location=x&startDate=0001-01-01&endDate=9999-12-31",
        "/api/weather/coordinates?lat=0&lng=0&startDate=0001-01-01&endDate=9999-12-31",
    ] {
        let (status, json) = get(&app, uri).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "validation_error");
        assert!(json["message"].is_string());
    }
}

#[tokio::test]
async fn locations_search_and_nearby() {
    let app = synthetic_app();

    let (status, json) = get(&app, "/api/weather/locations").await;
    assert_eq!(status, StatusCode::OK);
    let locations = json["data"].as_array().unwrap();
    assert_eq!(locations.len(), 5);
    assert_eq!(locations[0]["name"], "New York, USA");
    assert_eq!(locations[0]["data"].as_array().unwrap().len(), 30);

    let (status, json) = get(&app, "/api/weather/search-locations?q=lon").await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = json["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|l| l["name"].as_str())
        .collect();
    assert!(names.contains(&"London, UK"));
    assert!(names.contains(&"Barcelona, Spain"));

    let (status, json) = get(&app, "/api/weather/nearby-places?lat=35.68&lng=139.65").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"][0]["name"], "Tokyo, Japan");
    assert_eq!(json["data"][0]["coordinates"]["latitude"], 35.6762);

    let (_, json) = get(
        &app,
        "/api/weather/nearby-places?lat=35.68&lng=139.65&radius=1000000",
    )
    .await;
    assert!(json["data"].as_array().unwrap().len() > 1);
}

#[tokio::test]
async fn coordinates_without_providers_is_configuration_error() {
    let app = synthetic_app();
    let (status, json) = get(
        &app,
        "/api/weather/coordinates?lat=51.5&lng=-0.12&startDate=2024-01-01&endDate=2024-01-02",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "configuration_error");
}

#[tokio::test]
async fn coordinates_use_configured_provider() {
    let series = vec![WeatherDataPoint::zeroed("2024-01-01")];
    let service = WeatherService::new(
        Arc::new(SyntheticGenerator::new(2024, 2024)),
        LocationCatalog::builtin(),
    )
    .with_live(Arc::new(FixedProvider(series.clone())));
    let app = skyloom_api::build_app(Arc::new(service)).unwrap().0;

    let (status, json) = get(
        &app,
        "/api/weather/coordinates?lat=51.5&lng=-0.12&startDate=2024-01-01&endDate=2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let got: Vec<WeatherDataPoint> = serde_json::from_value(json["data"].clone()).unwrap();
    assert_eq!(got, series);

    let (status, _) = get(
        &app,
        "/api/weather/coordinates?lng=-0.12&startDate=2024-01-01&endDate=2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn coordinates_with_failing_provider_is_provider_error() {
    let service = WeatherService::new(
        Arc::new(SyntheticGenerator::new(2024, 2024)),
        LocationCatalog::builtin(),
    )
    .with_reanalysis(Arc::new(DownProvider));
    let app = skyloom_api::build_app(Arc::new(service)).unwrap().0;

    let (status, json) = get(
        &app,
        "/api/weather/coordinates?lat=10&lng=10&startDate=2024-01-01&endDate=2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["error"], "provider_error");
    let message = json["message"].as_str().unwrap();
    assert_eq!(message, skyloom_api::PROVIDER_FAILURE_MESSAGE);
    assert!(!message.contains("bad gateway"));
    assert!(!message.contains("502"));

    // Named requests still recover through the synthetic tier
    let (status, json) = get(
        &app,
        "/api/weather/data?location=Paris&startDate=2024-01-01&endDate=2024-01-01",
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
}
