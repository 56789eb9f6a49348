use moka::future::Cache;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

use crate::weather::{Location, Units, WeatherError, WeatherRecord};

/// Thin wrapper around a moka future cache with a fixed time-to-live.
/// Entries past the TTL are never returned; eviction is lazy, moka checks
/// the entry age at read time.
pub struct TtlCache<V> {
    cache: Cache<String, V>,
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();
        Self { cache }
    }

    /// Return the cached value for `key` if it is still fresh; otherwise run
    /// `fetch`, store the result and return it. Concurrent callers for the
    /// same key are coalesced onto a single in-flight fetch; fetch errors
    /// propagate to every waiter and are not cached.
    pub async fn get_or_fetch<F>(&self, key: String, fetch: F) -> Result<V, WeatherError>
    where
        F: Future<Output = Result<V, WeatherError>>,
    {
        self.cache
            .try_get_with(key, fetch)
            .await
            .map_err(|e| (*e).clone())
    }

    pub async fn get(&self, key: &str) -> Option<V> {
        self.cache.get(key).await
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    pub fn keys(&self) -> Vec<String> {
        self.cache.iter().map(|(k, _)| (*k).clone()).collect()
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    #[cfg(test)]
    pub async fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks().await;
    }
}

#[derive(Debug, Serialize)]
pub struct CacheStats {
    pub ttl_seconds: u64,
    pub entry_count: u64,
    pub keys: Vec<String>,
}

/// Response cache sitting between the weather client and the handlers.
/// One cache per query kind; the key carries the normalized location, the
/// unit system and (for forecasts) the horizon, so equivalent queries share
/// a single entry per kind.
pub struct WeatherStore {
    places: TtlCache<Location>,
    current: TtlCache<WeatherRecord>,
    forecasts: TtlCache<Vec<WeatherRecord>>,
    ttl: Duration,
}

impl WeatherStore {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        Self {
            places: TtlCache::new(max_entries, ttl),
            current: TtlCache::new(max_entries, ttl),
            forecasts: TtlCache::new(max_entries, ttl),
            ttl,
        }
    }

    /// Geocoding results, keyed by the trimmed lowercased query.
    pub async fn place<F>(&self, query: &str, fetch: F) -> Result<Location, WeatherError>
    where
        F: Future<Output = Result<Location, WeatherError>>,
    {
        self.places
            .get_or_fetch(query.trim().to_lowercase(), fetch)
            .await
    }

    /// Current conditions, keyed by rounded coordinates and units.
    pub async fn current<F>(
        &self,
        location: &Location,
        units: Units,
        fetch: F,
    ) -> Result<WeatherRecord, WeatherError>
    where
        F: Future<Output = Result<WeatherRecord, WeatherError>>,
    {
        let key = format!("{}:{}", location.cache_key(), units);
        self.current.get_or_fetch(key, fetch).await
    }

    /// Forecasts, keyed by rounded coordinates, units and horizon.
    pub async fn forecast<F>(
        &self,
        location: &Location,
        units: Units,
        horizon_hours: u32,
        fetch: F,
    ) -> Result<Vec<WeatherRecord>, WeatherError>
    where
        F: Future<Output = Result<Vec<WeatherRecord>, WeatherError>>,
    {
        let key = format!("{}:{}:{}h", location.cache_key(), units, horizon_hours);
        self.forecasts.get_or_fetch(key, fetch).await
    }

    pub fn stats(&self) -> CacheStats {
        let mut keys = Vec::new();
        keys.extend(self.places.keys().into_iter().map(|k| format!("place:{k}")));
        keys.extend(
            self.current
                .keys()
                .into_iter()
                .map(|k| format!("current:{k}")),
        );
        keys.extend(
            self.forecasts
                .keys()
                .into_iter()
                .map(|k| format!("forecast:{k}")),
        );
        keys.sort();

        CacheStats {
            ttl_seconds: self.ttl.as_secs(),
            entry_count: self.places.entry_count()
                + self.current.entry_count()
                + self.forecasts.entry_count(),
            keys,
        }
    }

    pub fn clear(&self) {
        self.places.invalidate_all();
        self.current.invalidate_all();
        self.forecasts.invalidate_all();
    }
}
