use serde::Deserialize;
use std::fs;

use crate::rollup::{consumption, weather};

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub uri: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_bind_addr")]
    pub bind_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_http_bind_addr(),
        }
    }
}

fn default_http_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConsumptionConfig {
    /// Valid readings per day for an `OK` day.
    pub ok_threshold: usize,
    /// Decimal places of the daily mean.
    pub scale: u32,
}

impl Default for ConsumptionConfig {
    fn default() -> Self {
        Self {
            ok_threshold: consumption::DEFAULT_OK_THRESHOLD,
            scale: consumption::DEFAULT_SCALE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Temperature observations per day for an `OK` day.
    pub ok_threshold: usize,
    pub scale: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            ok_threshold: weather::DEFAULT_OK_THRESHOLD,
            scale: weather::DEFAULT_SCALE,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    pub bind_addr: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub consumption: ConsumptionConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("AGGREGATION_CONFIG").unwrap_or_else(|_| "aggregation-config.toml".to_string());
        let contents = fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read config {path}: {e}"))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}
