use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::weather::Units;

const GEOCODING_URL: &str = "https://api.openweathermap.org/geo/1.0/direct";
const CURRENT_WEATHER_URL: &str = "https://api.openweathermap.org/data/2.5/weather";
const FORECAST_URL: &str = "https://api.openweathermap.org/data/2.5/forecast";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub openweather_api_key: String,
    pub port: u16,
    pub geocoding_url: String,
    pub current_weather_url: String,
    pub forecast_url: String,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub cache_max_entries: u64,
    pub default_location: String,
    pub default_units: Units,
    pub default_forecast_hours: u32,
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let openweather_api_key = env::var("OPENWEATHER_API_KEY")
            .ok()
            .filter(|key| !key.is_empty() && key != "your_api_key_here")
            .context("OPENWEATHER_API_KEY is not configured")?;

        let port = env::var("PORT")
            .unwrap_or_else(|_| "5001".to_string())
            .parse()
            .unwrap_or(5001);

        let request_timeout_secs = env::var("REQUEST_TIMEOUT")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);

        let cache_ttl_secs = env::var("CACHE_TTL")
            .unwrap_or_else(|_| "300".to_string())
            .parse()
            .unwrap_or(300);

        Ok(Self {
            openweather_api_key,
            port,
            geocoding_url: GEOCODING_URL.to_string(),
            current_weather_url: CURRENT_WEATHER_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
            request_timeout_secs,
            cache_ttl_secs,
            cache_max_entries: 100,
            default_location: "New York, USA".to_string(),
            default_units: Units::Metric,
            default_forecast_hours: 24,
        })
    }
}
