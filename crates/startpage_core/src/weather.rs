//! crates/startpage_core/src/weather.rs
//!
//! Provider-independent weather helpers: WMO code descriptions and a caching
//! decorator for any `WeatherService`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::clock::Clock;
use crate::domain::WeatherReport;
use crate::ports::{PortResult, WeatherService};

/// Short description of a WMO weather interpretation code.
pub fn describe_weather_code(code: i32) -> &'static str {
    match code {
        0 => "晴",
        1 => "大部晴朗",
        2 => "多云",
        3 => "阴",
        45 | 48 => "雾",
        51 | 53 | 55 => "毛毛雨",
        56 | 57 => "冻毛毛雨",
        61 => "小雨",
        63 => "中雨",
        65 => "大雨",
        66 | 67 => "冻雨",
        71 => "小雪",
        73 => "中雪",
        75 => "大雪",
        77 => "雪粒",
        80..=82 => "阵雨",
        85 | 86 => "阵雪",
        95 => "雷暴",
        96 | 99 => "雷暴伴冰雹",
        _ => "未知",
    }
}

/// Upper bound on cached cities; city names are client-controlled.
pub const MAX_CACHED_CITIES: usize = 256;

/// Caches each city's report for a fixed time, like an edge cache in front of
/// the provider. Failures are never cached. Expired entries are dropped on
/// every insert and the map never holds more than `MAX_CACHED_CITIES`.
pub struct CachedWeatherService {
    inner: Arc<dyn WeatherService>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entries: RwLock<HashMap<String, (DateTime<Utc>, WeatherReport)>>,
}

impl CachedWeatherService {
    pub fn new(inner: Arc<dyn WeatherService>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner,
            clock,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of cached cities, expired ones included until the next insert.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl WeatherService for CachedWeatherService {
    async fn current(&self, city: &str) -> PortResult<WeatherReport> {
        let now = self.clock.now();
        if let Some((stored_at, report)) = self.entries.read().await.get(city) {
            if now - *stored_at < self.ttl {
                debug!(city, "Weather cache hit");
                return Ok(report.clone());
            }
        }

        let report = self.inner.current(city).await?;
        let mut entries = self.entries.write().await;
        entries.retain(|_, (stored_at, _)| now - *stored_at < self.ttl);
        if entries.len() >= MAX_CACHED_CITIES && !entries.contains_key(city) {
            let oldest = entries
                .iter()
                .min_by_key(|(_, (stored_at, _))| *stored_at)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(city.to_string(), (now, report.clone()));
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::ports::PortError;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingService {
        calls: AtomicU32,
        fail: bool,
    }

    #[async_trait]
    impl WeatherService for CountingService {
        async fn current(&self, city: &str) -> PortResult<WeatherReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(PortError::Timeout);
            }
            Ok(WeatherReport {
                text: describe_weather_code(0).to_string(),
                temperature: 20.0,
                windspeed: 3.0,
                weathercode: 0,
                time: "2024-01-01T00:00".to_string(),
                city: city.to_string(),
            })
        }
    }

    #[test]
    fn known_and_unknown_codes() {
        assert_eq!(describe_weather_code(0), "晴");
        assert_eq!(describe_weather_code(81), "阵雨");
        assert_eq!(describe_weather_code(1234), "未知");
    }

    #[tokio::test]
    async fn caches_until_ttl_elapses() {
        let inner = Arc::new(CountingService {
            calls: AtomicU32::new(0),
            fail: false,
        });
        let clock = Arc::new(ManualClock::default());
        let cache = CachedWeatherService::new(inner.clone(), clock.clone(), Duration::minutes(10));

        cache.current("北京").await.unwrap();
        cache.current("北京").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        cache.current("上海").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        clock.advance(Duration::minutes(11));
        cache.current("北京").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn expired_entries_are_dropped_on_insert() {
        let inner = Arc::new(CountingService {
            calls: AtomicU32::new(0),
            fail: false,
        });
        let clock = Arc::new(ManualClock::default());
        let cache = CachedWeatherService::new(inner, clock.clone(), Duration::minutes(10));

        for i in 0..100 {
            cache.current(&format!("city-{i}")).await.unwrap();
        }
        assert_eq!(cache.len().await, 100);

        clock.advance(Duration::days(30));
        cache.current("北京").await.unwrap();
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn cache_size_is_bounded() {
        let inner = Arc::new(CountingService {
            calls: AtomicU32::new(0),
            fail: false,
        });
        let clock = Arc::new(ManualClock::default());
        let cache = CachedWeatherService::new(inner.clone(), clock.clone(), Duration::minutes(10));

        cache.current("first").await.unwrap();
        for i in 0..MAX_CACHED_CITIES + 50 {
            clock.advance(Duration::milliseconds(1));
            cache.current(&format!("city-{i}")).await.unwrap();
        }
        assert_eq!(cache.len().await, MAX_CACHED_CITIES);

        // The oldest entry went first.
        let calls = inner.calls.load(Ordering::SeqCst);
        cache.current("first").await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), calls + 1);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = Arc::new(CountingService {
            calls: AtomicU32::new(0),
            fail: true,
        });
        let cache =
            CachedWeatherService::new(inner.clone(), Arc::new(ManualClock::default()), Duration::minutes(10));
        assert!(cache.current("北京").await.is_err());
        assert!(cache.current("北京").await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
