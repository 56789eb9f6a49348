use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{compression::CompressionLayer, cors::CorsLayer};
use tracing::warn;

use crate::cache::WeatherStore;
use crate::config::Config;
use crate::icons;
use crate::templates::DashboardTemplate;
use crate::weather::{
    Location, Units, WeatherClient, WeatherError, WeatherRecord, FORECAST_STEP_HOURS,
    HORIZON_HOURS_MAX, HORIZON_HOURS_MIN,
};

#[derive(Clone)]
pub struct AppState {
    client: WeatherClient,
    store: Arc<WeatherStore>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Arc<Config>) -> Result<Self, WeatherError> {
        let client = WeatherClient::new(&config)?;
        let store = Arc::new(WeatherStore::new(
            config.cache_max_entries,
            Duration::from_secs(config.cache_ttl_secs),
        ));
        Ok(Self {
            client,
            store,
            config,
        })
    }
}

#[derive(Deserialize)]
pub struct WeatherQuery {
    location: Option<String>,
    units: Option<Units>,
    hours: Option<u32>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// The taxonomy is recovered into user-facing messages here; nothing is
/// fatal to the process.
impl IntoResponse for WeatherError {
    fn into_response(self) -> Response {
        warn!("❌ {}", self);
        let (status, message) = match &self {
            WeatherError::NotFound(_) => (
                StatusCode::NOT_FOUND,
                "Location not found. Please try a different search term.",
            ),
            WeatherError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many requests. Please wait a moment and try again.",
            ),
            WeatherError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "Unable to fetch weather data. Please try again later.",
            ),
            WeatherError::Malformed(_) => (
                StatusCode::BAD_GATEWAY,
                "Weather service returned an unexpected response.",
            ),
        };
        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

/// A weather record enriched with its display descriptors.
#[derive(Serialize)]
struct RecordView {
    #[serde(flatten)]
    record: WeatherRecord,
    emoji: &'static str,
    gradient: &'static str,
    wind_compass: Option<&'static str>,
}

impl RecordView {
    fn new(record: WeatherRecord) -> Self {
        let is_day = record.condition.is_day();
        let emoji = icons::emoji(record.condition.id, is_day);
        let gradient = icons::gradient(record.condition.id, is_day);
        let wind_compass = record.wind.map(|w| icons::compass(w.direction));
        Self {
            record,
            emoji,
            gradient,
            wind_compass,
        }
    }
}

#[derive(Serialize)]
struct CurrentView {
    location: Location,
    label: String,
    units: Units,
    temperature_symbol: &'static str,
    wind_speed_unit: &'static str,
    weather: RecordView,
}

#[derive(Serialize)]
struct ForecastView {
    location: Location,
    label: String,
    units: Units,
    temperature_symbol: &'static str,
    horizon_hours: u32,
    step_hours: u32,
    entries: Vec<RecordView>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/weather/current", get(current_weather))
        .route("/api/weather/forecast", get(forecast_weather))
        .route("/api/cache/stats", get(cache_stats))
        .layer(CompressionLayer::new())
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn index(State(state): State<AppState>) -> impl IntoResponse {
    Html(DashboardTemplate::page(&state.config.default_location))
}

/// Resolve the query through the geocode cache; a bare "lat,lon" short-
/// circuits inside the client without touching the network.
async fn resolve_cached(state: &AppState, query: &str) -> Result<Location, WeatherError> {
    state.store.place(query, state.client.resolve(query)).await
}

async fn current_weather(
    Query(params): Query<WeatherQuery>,
    State(state): State<AppState>,
) -> Result<Json<CurrentView>, WeatherError> {
    let query = params
        .location
        .unwrap_or_else(|| state.config.default_location.clone());
    let units = params.units.unwrap_or(state.config.default_units);

    let location = resolve_cached(&state, &query).await?;
    let record = state
        .store
        .current(&location, units, state.client.current(&location, units))
        .await?;

    let label = location.label();
    Ok(Json(CurrentView {
        label,
        units,
        temperature_symbol: units.temperature_symbol(),
        wind_speed_unit: units.wind_speed_unit(),
        weather: RecordView::new(record),
        location,
    }))
}

async fn forecast_weather(
    Query(params): Query<WeatherQuery>,
    State(state): State<AppState>,
) -> Result<Json<ForecastView>, WeatherError> {
    let query = params
        .location
        .unwrap_or_else(|| state.config.default_location.clone());
    let units = params.units.unwrap_or(state.config.default_units);

    // Snap the horizon to the provider cadence before it becomes part of the
    // cache key, so equivalent horizons share an entry.
    let horizon_hours = params
        .hours
        .unwrap_or(state.config.default_forecast_hours)
        .clamp(HORIZON_HOURS_MIN, HORIZON_HOURS_MAX)
        / FORECAST_STEP_HOURS
        * FORECAST_STEP_HOURS;

    let location = resolve_cached(&state, &query).await?;
    let records = state
        .store
        .forecast(
            &location,
            units,
            horizon_hours,
            state.client.forecast(&location, units, horizon_hours),
        )
        .await?;

    let label = location.label();
    Ok(Json(ForecastView {
        label,
        units,
        temperature_symbol: units.temperature_symbol(),
        horizon_hours,
        step_hours: FORECAST_STEP_HOURS,
        entries: records.into_iter().map(RecordView::new).collect(),
        location,
    }))
}

async fn cache_stats(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.store.stats())
}
