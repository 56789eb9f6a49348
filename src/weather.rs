use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::Config;

/// Provider cadence: forecast entries arrive in 3-hour steps.
pub const FORECAST_STEP_HOURS: u32 = 3;
/// Supported forecast horizon range, in hours.
pub const HORIZON_HOURS_MIN: u32 = 24;
pub const HORIZON_HOURS_MAX: u32 = 120;

#[derive(Debug, Clone, Error)]
pub enum WeatherError {
    /// The provider reports no match for the requested location
    #[error("location not found: {0}")]
    NotFound(String),

    /// The provider signalled quota exhaustion (HTTP 429)
    #[error("rate limit exceeded")]
    RateLimited,

    /// Network failure, timeout, or any other non-2xx response
    #[error("upstream error: {0}")]
    Upstream(String),

    /// The response could not be normalized into a weather record
    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

impl Units {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }

    pub fn temperature_symbol(self) -> &'static str {
        match self {
            Self::Metric => "°C",
            Self::Imperial => "°F",
        }
    }

    pub fn wind_speed_unit(self) -> &'static str {
        match self {
            Self::Metric => "m/s",
            Self::Imperial => "mph",
        }
    }
}

impl std::fmt::Display for Units {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A resolved place. Immutable once produced by `WeatherClient::resolve`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub name: String,
    pub country: Option<String>,
    pub state: Option<String>,
}

impl Location {
    /// Normalized form used as a cache key component: coordinates rounded
    /// to four decimals, so equivalent queries share an entry.
    pub fn cache_key(&self) -> String {
        format!("{:.4},{:.4}", self.latitude, self.longitude)
    }

    /// "City, State, Country" with missing parts skipped.
    pub fn label(&self) -> String {
        let mut parts = vec![self.name.clone()];
        if let Some(state) = &self.state {
            if state != &self.name {
                parts.push(state.clone());
            }
        }
        if let Some(country) = &self.country {
            parts.push(country.clone());
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    /// Direction in degrees, meteorological convention.
    pub direction: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// OpenWeatherMap condition id (e.g. 800 = clear sky).
    pub id: u16,
    pub text: String,
    /// Provider icon code, e.g. "01d"; the trailing letter encodes day/night.
    pub icon: String,
}

impl Condition {
    pub fn is_day(&self) -> bool {
        self.icon.ends_with('d')
    }
}

/// Normalized weather snapshot. Immutable after construction; sunrise and
/// sunset are present for current conditions only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind: Option<Wind>,
    pub condition: Condition,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Raw OpenWeatherMap response shapes. Required fields are required here, so
// a payload missing one fails deserialization instead of producing a
// partially populated record.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GeoPlace {
    lat: f64,
    lon: f64,
    name: String,
    country: Option<String>,
    state: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MainReadings {
    temp: f64,
    feels_like: f64,
    humidity: u8,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    id: u16,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct RawWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
}

#[derive(Debug, Deserialize)]
struct RawSun {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct CurrentResponse {
    dt: i64,
    main: MainReadings,
    weather: Vec<RawCondition>,
    wind: Option<RawWind>,
    sys: RawSun,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: MainReadings,
    weather: Vec<RawCondition>,
    wind: Option<RawWind>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
}

// ---------------------------------------------------------------------------
// Normalization: one translation function per endpoint.
// ---------------------------------------------------------------------------

fn timestamp(secs: i64) -> Result<DateTime<Utc>, WeatherError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| WeatherError::Malformed(format!("timestamp out of range: {secs}")))
}

fn condition(mut weather: Vec<RawCondition>) -> Result<Condition, WeatherError> {
    if weather.is_empty() {
        return Err(WeatherError::Malformed("empty weather block".to_string()));
    }
    let raw = weather.swap_remove(0);
    Ok(Condition {
        id: raw.id,
        text: raw.description,
        icon: raw.icon,
    })
}

fn wind(raw: Option<RawWind>) -> Option<Wind> {
    raw.map(|w| Wind {
        speed: w.speed,
        direction: (w.deg.rem_euclid(360.0).round() as u16) % 360,
    })
}

fn normalize_place(places: Vec<GeoPlace>, query: &str) -> Result<Location, WeatherError> {
    let place = places
        .into_iter()
        .next()
        .ok_or_else(|| WeatherError::NotFound(query.to_string()))?;
    Ok(Location {
        latitude: place.lat,
        longitude: place.lon,
        name: place.name,
        country: place.country,
        state: place.state,
    })
}

fn normalize_current(raw: CurrentResponse) -> Result<WeatherRecord, WeatherError> {
    Ok(WeatherRecord {
        timestamp: timestamp(raw.dt)?,
        temperature: raw.main.temp,
        feels_like: raw.main.feels_like,
        humidity: raw.main.humidity,
        pressure: raw.main.pressure,
        wind: wind(raw.wind),
        condition: condition(raw.weather)?,
        sunrise: Some(timestamp(raw.sys.sunrise)?),
        sunset: Some(timestamp(raw.sys.sunset)?),
    })
}

fn normalize_forecast(
    raw: ForecastResponse,
    max_entries: usize,
) -> Result<Vec<WeatherRecord>, WeatherError> {
    raw.list
        .into_iter()
        .take(max_entries)
        .map(|entry| {
            Ok(WeatherRecord {
                timestamp: timestamp(entry.dt)?,
                temperature: entry.main.temp,
                feels_like: entry.main.feels_like,
                humidity: entry.main.humidity,
                pressure: entry.main.pressure,
                wind: wind(entry.wind),
                condition: condition(entry.weather)?,
                sunrise: None,
                sunset: None,
            })
        })
        .collect()
}

/// Number of 3-hour entries that fit inside the requested horizon, after
/// clamping the horizon to the provider's supported range. The final
/// partial step is truncated.
fn forecast_entry_count(horizon_hours: u32) -> u32 {
    horizon_hours.clamp(HORIZON_HOURS_MIN, HORIZON_HOURS_MAX) / FORECAST_STEP_HOURS
}

/// Parse a bare "lat,lon" query, validating coordinate ranges.
fn parse_coordinates(query: &str) -> Option<(f64, f64)> {
    let (lat, lon) = query.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lon: f64 = lon.trim().parse().ok()?;
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Some((lat, lon))
    } else {
        None
    }
}

/// OpenWeatherMap client: geocoding, current conditions and 5-day/3-hour
/// forecast. Stateless beyond the HTTP connection pool.
#[derive(Debug, Clone)]
pub struct WeatherClient {
    http: Client,
    api_key: String,
    geocoding_url: String,
    current_url: String,
    forecast_url: String,
}

impl WeatherClient {
    pub fn new(config: &Config) -> Result<Self, WeatherError> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| WeatherError::Upstream(e.to_string()))?;

        Ok(Self {
            http,
            api_key: config.openweather_api_key.clone(),
            geocoding_url: config.geocoding_url.clone(),
            current_url: config.current_weather_url.clone(),
            forecast_url: config.forecast_url.clone(),
        })
    }

    /// Resolve a free-form query (city name, ZIP, airport code) to a
    /// location. A parseable "lat,lon" pair is passed through without a
    /// network call.
    pub async fn resolve(&self, query: &str) -> Result<Location, WeatherError> {
        let query = query.trim();
        if let Some((lat, lon)) = parse_coordinates(query) {
            return Ok(Location {
                latitude: lat,
                longitude: lon,
                name: format!("{lat:.4}, {lon:.4}"),
                country: None,
                state: None,
            });
        }

        info!("🌍 Resolving location '{}'", query);
        let response = self
            .http
            .get(&self.geocoding_url)
            .query(&[("q", query), ("limit", "1"), ("appid", &self.api_key)])
            .send()
            .await
            .map_err(|e| WeatherError::Upstream(e.to_string()))?;

        let body = read_body(response, query).await?;
        normalize_place(decode(&body)?, query)
    }

    /// Current conditions for a resolved location.
    pub async fn current(
        &self,
        location: &Location,
        units: Units,
    ) -> Result<WeatherRecord, WeatherError> {
        info!("🌤️  Fetching current weather for {}", location.cache_key());
        let response = self
            .http
            .get(&self.current_url)
            .query(&self.weather_params(location, units))
            .send()
            .await
            .map_err(|e| WeatherError::Upstream(e.to_string()))?;

        let body = read_body(response, &location.name).await?;
        normalize_current(decode(&body)?)
    }

    /// Forecast at the provider's 3-hour cadence up to `horizon_hours`
    /// (clamped to 24..=120), truncating the final partial step.
    pub async fn forecast(
        &self,
        location: &Location,
        units: Units,
        horizon_hours: u32,
    ) -> Result<Vec<WeatherRecord>, WeatherError> {
        let entries = forecast_entry_count(horizon_hours);
        info!(
            "📅 Fetching {}h forecast ({} entries) for {}",
            horizon_hours,
            entries,
            location.cache_key()
        );

        let mut params = self.weather_params(location, units);
        params.push(("cnt", entries.to_string()));

        let response = self
            .http
            .get(&self.forecast_url)
            .query(&params)
            .send()
            .await
            .map_err(|e| WeatherError::Upstream(e.to_string()))?;

        let body = read_body(response, &location.name).await?;
        normalize_forecast(decode(&body)?, entries as usize)
    }

    fn weather_params(&self, location: &Location, units: Units) -> Vec<(&'static str, String)> {
        vec![
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
            ("units", units.as_str().to_string()),
            ("appid", self.api_key.clone()),
        ]
    }
}

/// Classify the HTTP status, then hand back the body for decoding.
async fn read_body(response: reqwest::Response, context: &str) -> Result<String, WeatherError> {
    let status = response.status();
    if status == StatusCode::NOT_FOUND {
        return Err(WeatherError::NotFound(context.to_string()));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(WeatherError::RateLimited);
    }
    if !status.is_success() {
        return Err(WeatherError::Upstream(format!("HTTP {status}")));
    }
    debug!(status = %status, "provider response");
    response
        .text()
        .await
        .map_err(|e| WeatherError::Upstream(e.to_string()))
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, WeatherError> {
    serde_json::from_str(body).map_err(|e| WeatherError::Malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_current() -> serde_json::Value {
        serde_json::json!({
            "dt": 1_700_000_000_i64,
            "main": { "temp": 12.3, "feels_like": 11.0, "humidity": 81, "pressure": 1012 },
            "weather": [{ "id": 500, "main": "Rain", "description": "light rain", "icon": "10d" }],
            "wind": { "speed": 4.1, "deg": 250 },
            "sys": { "sunrise": 1_699_970_000_i64, "sunset": 1_700_003_000_i64 }
        })
    }

    #[test]
    fn entry_count_truncates_partial_step() {
        // Largest multiple of 3h that fits in the horizon.
        assert_eq!(forecast_entry_count(24), 8);
        assert_eq!(forecast_entry_count(30), 10);
        assert_eq!(forecast_entry_count(31), 10);
        assert_eq!(forecast_entry_count(120), 40);
    }

    #[test]
    fn entry_count_clamps_horizon() {
        assert_eq!(forecast_entry_count(0), 8);
        assert_eq!(forecast_entry_count(6), 8);
        assert_eq!(forecast_entry_count(500), 40);
    }

    #[test]
    fn coordinates_pass_through() {
        assert_eq!(
            parse_coordinates("40.7128,-74.0060"),
            Some((40.7128, -74.0060))
        );
        assert_eq!(parse_coordinates(" 51.5 , -0.12 "), Some((51.5, -0.12)));
        assert_eq!(parse_coordinates("London"), None);
        assert_eq!(parse_coordinates("91.0,0.0"), None);
        assert_eq!(parse_coordinates("0.0,181.0"), None);
    }

    #[test]
    fn location_cache_key_rounds_coordinates() {
        let loc = Location {
            latitude: 51.507_42,
            longitude: -0.127_83,
            name: "London".to_string(),
            country: Some("GB".to_string()),
            state: None,
        };
        assert_eq!(loc.cache_key(), "51.5074,-0.1278");
    }

    #[test]
    fn location_label_skips_missing_parts() {
        let loc = Location {
            latitude: 48.85,
            longitude: 2.35,
            name: "Paris".to_string(),
            country: Some("FR".to_string()),
            state: None,
        };
        assert_eq!(loc.label(), "Paris, FR");
    }

    #[test]
    fn normalize_current_produces_full_record() {
        let raw: CurrentResponse = serde_json::from_value(sample_current()).unwrap();
        let record = normalize_current(raw).unwrap();
        assert!((record.temperature - 12.3).abs() < f64::EPSILON);
        assert_eq!(record.humidity, 81);
        assert_eq!(record.pressure, 1012);
        assert_eq!(record.condition.id, 500);
        assert_eq!(record.condition.text, "light rain");
        assert!(record.condition.is_day());
        assert!(record.sunrise.is_some());
        assert!(record.sunset.is_some());
        let w = record.wind.unwrap();
        assert_eq!(w.direction, 250);
    }

    #[test]
    fn missing_temperature_is_malformed() {
        let mut value = sample_current();
        value["main"].as_object_mut().unwrap().remove("temp");
        let body = value.to_string();
        let result: Result<CurrentResponse, _> = decode(&body);
        assert!(matches!(result, Err(WeatherError::Malformed(_))));
    }

    #[test]
    fn missing_wind_is_not_malformed() {
        let mut value = sample_current();
        value.as_object_mut().unwrap().remove("wind");
        let raw: CurrentResponse = serde_json::from_value(value).unwrap();
        let record = normalize_current(raw).unwrap();
        assert!(record.wind.is_none());
    }

    #[test]
    fn empty_weather_block_is_malformed() {
        let mut value = sample_current();
        value["weather"] = serde_json::json!([]);
        let raw: CurrentResponse = serde_json::from_value(value).unwrap();
        assert!(matches!(
            normalize_current(raw),
            Err(WeatherError::Malformed(_))
        ));
    }

    #[test]
    fn empty_geocoder_result_is_not_found() {
        let result = normalize_place(Vec::new(), "nowhereville");
        match result {
            Err(WeatherError::NotFound(q)) => assert_eq!(q, "nowhereville"),
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn forecast_entries_have_no_sun_times() {
        let raw = ForecastResponse {
            list: (0..4)
                .map(|i| ForecastEntry {
                    dt: 1_700_000_000 + i * 10_800,
                    main: MainReadings {
                        temp: 10.0,
                        feels_like: 9.0,
                        humidity: 70,
                        pressure: 1010,
                    },
                    weather: vec![RawCondition {
                        id: 801,
                        description: "few clouds".to_string(),
                        icon: "02n".to_string(),
                    }],
                    wind: None,
                })
                .collect(),
        };
        let records = normalize_forecast(raw, 3).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records
            .iter()
            .all(|r| r.sunrise.is_none() && r.sunset.is_none()));
        let step = records[1].timestamp - records[0].timestamp;
        assert_eq!(step.num_hours(), 3);
    }

    #[test]
    fn wind_direction_wraps_to_compass_range() {
        let w = wind(Some(RawWind {
            speed: 3.0,
            deg: 360.0,
        }))
        .unwrap();
        assert_eq!(w.direction, 0);
    }

    #[test]
    fn units_default_to_metric() {
        assert_eq!(Units::default(), Units::Metric);
        assert_eq!(Units::Metric.temperature_symbol(), "°C");
        assert_eq!(Units::Imperial.wind_speed_unit(), "mph");
    }
}
