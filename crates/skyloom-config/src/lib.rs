use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

pub const DEFAULT_HTTP_BIND: &str = "0.0.0.0:3002";
pub const DEFAULT_OPENWEATHER_URL: &str = "https://api.openweathermap.org";
pub const DEFAULT_NASA_URL: &str = "https://power.larc.nasa.gov/api";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 30 * 60;
pub const DEFAULT_FANOUT: usize = 4;
pub const DEFAULT_SYNTHETIC_SPAN: (i32, i32) = (1990, 2030);
pub const DEFAULT_SAMPLE_DAYS: usize = 30;
pub const DEFAULT_MAX_RANGE_DAYS: u32 = 3660;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Concurrent per-day requests
    pub fanout: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NasaConfig {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub community: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    pub openweather: Option<OpenWeatherConfig>,
    pub nasa: Option<NasaConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub sample_days: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Longest request range accepted, in days
    pub max_range_days: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub server: Option<ServerConfig>,
    pub providers: Option<ProvidersConfig>,
    pub cache: Option<CacheConfig>,
    pub synthetic: Option<SyntheticConfig>,
    pub limits: Option<LimitsConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid URL for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        source: url::ParseError,
    },
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl AppConfig {
    /// Load configuration from SKYLOOM_CONFIG path (TOML) if present, then
    /// apply environment overrides
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("SKYLOOM_CONFIG").unwrap_or_else(|_| "config.toml".to_string());
        let mut cfg = Self::from_path(&path)?;
        cfg.apply_overrides(|key| std::env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Parse a TOML file; a missing file yields the defaults
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(AppConfig::default());
        }
        let s = fs::read_to_string(path)?;
        Ok(toml::from_str::<AppConfig>(&s)?)
    }

    /// Apply `OPENWEATHERMAP_API_KEY`, `USE_NASA_API`, `SKYLOOM_BIND` and `PORT`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup("OPENWEATHERMAP_API_KEY") {
            self.openweather_mut().api_key = Some(key);
        }
        if let Some(flag) = lookup("USE_NASA_API") {
            let enabled = matches!(flag.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on");
            self.nasa_mut().enabled = Some(enabled);
        }
        let bind = lookup("SKYLOOM_BIND").or_else(|| lookup("PORT").map(|p| format!("0.0.0.0:{}", p.trim())));
        if let Some(bind) = bind {
            self.server.get_or_insert_with(ServerConfig::default).bind = Some(bind);
        }
    }

    /// Check URLs and numeric ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.openweather_base_url()).map_err(|source| ConfigError::InvalidUrl {
            field: "providers.openweather.base_url",
            source,
        })?;
        Url::parse(&self.nasa_base_url()).map_err(|source| ConfigError::InvalidUrl {
            field: "providers.nasa.base_url",
            source,
        })?;
        let (start, end) = self.synthetic_span();
        if start > end {
            return Err(ConfigError::Invalid(format!(
                "synthetic.start_year {start} is after synthetic.end_year {end}"
            )));
        }
        if self.max_range_days() == 0 {
            return Err(ConfigError::Invalid("limits.max_range_days must be positive".into()));
        }
        if self.cache_ttl().is_zero() {
            return Err(ConfigError::Invalid("cache.ttl_secs must be positive".into()));
        }
        Ok(())
    }

    fn openweather(&self) -> Option<&OpenWeatherConfig> {
        self.providers.as_ref().and_then(|p| p.openweather.as_ref())
    }

    fn nasa(&self) -> Option<&NasaConfig> {
        self.providers.as_ref().and_then(|p| p.nasa.as_ref())
    }

    fn openweather_mut(&mut self) -> &mut OpenWeatherConfig {
        self.providers
            .get_or_insert_with(ProvidersConfig::default)
            .openweather
            .get_or_insert_with(OpenWeatherConfig::default)
    }

    fn nasa_mut(&mut self) -> &mut NasaConfig {
        self.providers
            .get_or_insert_with(ProvidersConfig::default)
            .nasa
            .get_or_insert_with(NasaConfig::default)
    }

    /// Get HTTP bind address (default 0.0.0.0:3002)
    pub fn http_bind(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.bind.clone())
            .unwrap_or_else(|| DEFAULT_HTTP_BIND.to_string())
    }

    /// OpenWeatherMap key; `None` disables the live tier
    pub fn openweather_api_key(&self) -> Option<String> {
        self.openweather()
            .and_then(|o| o.api_key.clone())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn openweather_base_url(&self) -> String {
        self.openweather()
            .and_then(|o| o.base_url.clone())
            .unwrap_or_else(|| DEFAULT_OPENWEATHER_URL.to_string())
    }

    pub fn openweather_timeout(&self) -> Duration {
        Duration::from_secs(
            self.openweather()
                .and_then(|o| o.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn openweather_fanout(&self) -> usize {
        self.openweather()
            .and_then(|o| o.fanout)
            .unwrap_or(DEFAULT_FANOUT)
            .max(1)
    }

    /// Whether the reanalysis tier starts enabled (default true)
    pub fn nasa_enabled(&self) -> bool {
        self.nasa().and_then(|n| n.enabled).unwrap_or(true)
    }

    pub fn nasa_base_url(&self) -> String {
        self.nasa()
            .and_then(|n| n.base_url.clone())
            .unwrap_or_else(|| DEFAULT_NASA_URL.to_string())
    }

    pub fn nasa_community(&self) -> String {
        self.nasa()
            .and_then(|n| n.community.clone())
            .unwrap_or_else(|| "AG".to_string())
    }

    pub fn nasa_timeout(&self) -> Duration {
        Duration::from_secs(
            self.nasa()
                .and_then(|n| n.timeout_secs)
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(
            self.cache
                .as_ref()
                .and_then(|c| c.ttl_secs)
                .unwrap_or(DEFAULT_CACHE_TTL_SECS),
        )
    }

    /// Inclusive years pre-generated by the synthetic tier
    pub fn synthetic_span(&self) -> (i32, i32) {
        let s = self.synthetic.as_ref();
        (
            s.and_then(|s| s.start_year).unwrap_or(DEFAULT_SYNTHETIC_SPAN.0),
            s.and_then(|s| s.end_year).unwrap_or(DEFAULT_SYNTHETIC_SPAN.1),
        )
    }

    pub fn max_range_days(&self) -> u32 {
        self.limits
            .as_ref()
            .and_then(|l| l.max_range_days)
            .unwrap_or(DEFAULT_MAX_RANGE_DAYS)
    }

    pub fn sample_days(&self) -> usize {
        self.synthetic
            .as_ref()
            .and_then(|s| s.sample_days)
            .unwrap_or(DEFAULT_SAMPLE_DAYS)
    }
}
