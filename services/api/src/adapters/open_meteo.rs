//! services/api/src/adapters/open_meteo.rs
//!
//! This module contains the adapter for the Open-Meteo weather provider.
//! It implements the `WeatherService` port from the `core` crate in two steps:
//! geocode the city name, then fetch current conditions for the coordinates.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use startpage_core::domain::WeatherReport;
use startpage_core::ports::{PortError, PortResult, WeatherService};
use startpage_core::retry::{retry_with_backoff, RetryPolicy};
use startpage_core::weather::describe_weather_code;
use std::time::Duration;
use tracing::{debug, warn};

//=========================================================================================
// Provider Payloads
//=========================================================================================

#[derive(Deserialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Vec<Place>,
}

#[derive(Deserialize, Clone)]
struct Place {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct ForecastResponse {
    current_weather: CurrentWeather,
}

#[derive(Deserialize)]
struct CurrentWeather {
    temperature: f64,
    windspeed: f64,
    weathercode: i32,
    time: String,
}

//=========================================================================================
// The Adapter Struct
//=========================================================================================

pub struct OpenMeteoWeatherAdapter {
    client: Client,
    geocoding_url: String,
    forecast_url: String,
    retry: RetryPolicy,
}

impl OpenMeteoWeatherAdapter {
    /// Every outbound request is aborted after `timeout`. Geocoding is
    /// attempted up to `max_attempts` times.
    pub fn new(
        geocoding_url: impl Into<String>,
        forecast_url: impl Into<String>,
        timeout: Duration,
        max_attempts: u32,
    ) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PortError::Unexpected(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            geocoding_url: geocoding_url.into(),
            forecast_url: forecast_url.into(),
            retry: RetryPolicy::new(max_attempts),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> PortResult<T> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PortError::upstream_retryable(format!("{url} returned {status}")));
        }
        if !status.is_success() {
            return Err(PortError::upstream_fatal(format!("{url} returned {status}")));
        }
        response.json::<T>().await.map_err(|e| {
            if e.is_timeout() {
                PortError::Timeout
            } else {
                PortError::upstream_fatal(format!("malformed response from {url}: {e}"))
            }
        })
    }

    async fn geocode(&self, city: &str) -> PortResult<Place> {
        let query = [
            ("name", city.to_string()),
            ("count", "1".to_string()),
            ("language", "zh".to_string()),
            ("format", "json".to_string()),
        ];
        let query = &query;
        let response: GeocodingResponse = retry_with_backoff(&self.retry, move |attempt| {
            if attempt > 0 {
                debug!(city, attempt, "Retrying geocoding request");
            }
            self.get_json(&self.geocoding_url, query)
        })
        .await?;

        response
            .results
            .first()
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("City '{city}' was not found")))
    }
}

/// Maps transport failures onto the port's retry classes.
fn classify(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout
    } else {
        PortError::upstream_retryable(e.to_string())
    }
}

#[async_trait]
impl WeatherService for OpenMeteoWeatherAdapter {
    async fn current(&self, city: &str) -> PortResult<WeatherReport> {
        let place = self.geocode(city).await.map_err(|e| {
            warn!(city, "Geocoding failed: {}", e);
            e
        })?;

        let query = [
            ("latitude", place.latitude.to_string()),
            ("longitude", place.longitude.to_string()),
            ("current_weather", "true".to_string()),
            ("timezone", "auto".to_string()),
        ];
        let forecast: ForecastResponse = self.get_json(&self.forecast_url, &query).await?;
        let current = forecast.current_weather;

        Ok(WeatherReport {
            text: describe_weather_code(current.weathercode).to_string(),
            temperature: current.temperature,
            windspeed: current.windspeed,
            weathercode: current.weathercode,
            time: current.time,
            city: city.to_string(),
        })
    }
}
