//! services/api/src/web/weather.rs
//!
//! The weather proxy endpoint. Cities are fetched concurrently and each
//! failure stays with its own city.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use startpage_core::domain::WeatherReport;
use startpage_core::normalise::split_cities;
use startpage_core::ports::PortError;
use std::sync::Arc;
use tracing::{error, warn};
use utoipa::{IntoParams, ToSchema};

use crate::error::ApiError;
use crate::web::state::AppState;

/// Most cities a single request will look up.
pub const MAX_CITIES_PER_REQUEST: usize = 8;

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherQuery {
    /// Comma-separated city names overriding the configured ones.
    pub city: Option<String>,
}

/// One entry of a multi-city answer.
#[derive(Serialize)]
#[serde(untagged)]
pub enum CityWeather {
    Report(WeatherReport),
    Failed { city: String, error: String },
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum WeatherData {
    Single(WeatherReport),
    Many(Vec<CityWeather>),
}

#[derive(Serialize, ToSchema)]
pub struct WeatherResponse {
    pub success: bool,
    /// A report object for one city, an array for several.
    #[schema(value_type = Object)]
    pub data: WeatherData,
}

fn upstream_error(e: &PortError) -> ApiError {
    match e {
        PortError::Timeout => ApiError::UpstreamTimeout,
        other => ApiError::BadGateway(other.to_string()),
    }
}

/// Current conditions for the configured cities.
#[utoipa::path(
    get,
    path = "/api/weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "One report, or an array when several cities are configured", body = WeatherResponse),
        (status = 400, description = "Too many cities requested"),
        (status = 502, description = "The weather provider failed for every city"),
        (status = 503, description = "The weather provider timed out for every city")
    )
)]
pub async fn weather_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<WeatherQuery>,
) -> Result<impl IntoResponse, ApiError> {
    // 1. Resolve the cities: query override, then the document, then the default
    let mut cities = query.city.as_deref().map(split_cities).unwrap_or_default();
    if cities.len() > MAX_CITIES_PER_REQUEST {
        return Err(ApiError::BadRequest(format!(
            "At most {MAX_CITIES_PER_REQUEST} cities can be requested at once"
        )));
    }
    if cities.is_empty() {
        let document = state.documents.load().await.map_err(|e| {
            error!("Failed to load document: {:?}", e);
            ApiError::from(e)
        })?;
        cities = document.settings.weather.city;
        if cities.len() > MAX_CITIES_PER_REQUEST {
            warn!(configured = cities.len(), "Only the first configured cities are looked up");
            cities.truncate(MAX_CITIES_PER_REQUEST);
        }
    }
    if cities.is_empty() {
        cities.push(state.config.core.default_weather_city.clone());
    }

    // 2. Fetch all cities concurrently
    let results = join_all(cities.iter().map(|city| state.weather.current(city))).await;

    // 3. Shape the answer
    if let [result] = results.as_slice() {
        return match result {
            Ok(report) => Ok(Json(WeatherResponse {
                success: true,
                data: WeatherData::Single(report.clone()),
            })),
            Err(e) => {
                warn!(city = %cities[0], "Weather lookup failed: {}", e);
                Err(upstream_error(e))
            }
        };
    }

    if results.iter().all(Result::is_err) {
        warn!(cities = cities.len(), "Weather lookup failed for every city");
        let all_timed_out = results
            .iter()
            .all(|r| matches!(r, Err(PortError::Timeout)));
        return Err(if all_timed_out {
            ApiError::UpstreamTimeout
        } else {
            ApiError::BadGateway("Weather lookup failed for every city".to_string())
        });
    }

    let entries = cities
        .into_iter()
        .zip(results)
        .map(|(city, result)| match result {
            Ok(report) => CityWeather::Report(report),
            Err(e) => {
                warn!(city = %city, "Weather lookup failed: {}", e);
                CityWeather::Failed {
                    city,
                    error: e.to_string(),
                }
            }
        })
        .collect();

    Ok(Json(WeatherResponse {
        success: true,
        data: WeatherData::Many(entries),
    }))
}
