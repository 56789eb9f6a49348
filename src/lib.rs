//! Weather dashboard backend: resolves free-form location queries through
//! the OpenWeatherMap geocoding endpoint and serves normalized current
//! conditions and 3-hourly forecasts behind an in-memory TTL cache.

pub mod cache;
pub mod config;
pub mod icons;
pub mod server;
pub mod templates;
pub mod weather;
