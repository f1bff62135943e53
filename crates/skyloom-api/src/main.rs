use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use skyloom_providers::{NasaPowerClient, OpenWeatherClient, ResponseCache, SyntheticGenerator};
use skyloom_service::{LocationCatalog, WeatherService};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Observability
    skyloom_obs::init("skyloomd");

    // Config
    let cfg = match skyloom_config::AppConfig::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            tracing::warn!(error = %e, "invalid configuration, using defaults");
            skyloom_config::AppConfig::default()
        }
    };

    let (span_start, span_end) = cfg.synthetic_span();
    let synthetic = Arc::new(SyntheticGenerator::new(span_start, span_end));
    let mut service = WeatherService::new(synthetic.clone(), LocationCatalog::builtin())
        .with_sample_days(cfg.sample_days())
        .with_max_range_days(cfg.max_range_days());

    match cfg.openweather_api_key() {
        Some(key) => {
            let client = Arc::new(
                OpenWeatherClient::new(
                    key,
                    cfg.openweather_base_url(),
                    cfg.openweather_timeout(),
                    synthetic.clone(),
                )?
                .with_fanout(cfg.openweather_fanout())
                .with_cache(ResponseCache::new(cfg.cache_ttl())),
            );
            service = service.with_live(client.clone()).with_geocoder(client);
            tracing::info!("OpenWeatherMap tier enabled");
        }
        None => tracing::info!("OPENWEATHERMAP_API_KEY not set, live tier disabled"),
    }

    let nasa = NasaPowerClient::new(cfg.nasa_base_url(), cfg.nasa_timeout())?
        .with_community(cfg.nasa_community())
        .with_cache(ResponseCache::new(cfg.cache_ttl()));
    let service = service.with_reanalysis(Arc::new(nasa));
    service.set_use_nasa_api(cfg.nasa_enabled());

    // Build app and state
    let (app, state) = skyloom_api::build_app(Arc::new(service))?;

    // Start HTTP server
    let http_bind = cfg.http_bind();
    let addr: SocketAddr = http_bind
        .parse()
        .with_context(|| format!("invalid HTTP bind address {http_bind}"))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    // Mark ready just before serving
    skyloom_api::set_ready(&state, true);

    tracing::info!(%addr, "HTTP server listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
