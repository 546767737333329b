mod common;

use axum::{
    extract::State,
    http::{Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use common::{Outcome, ScriptedWeather, TestApp};
use serde_json::json;
use startpage_api::adapters::OpenMeteoWeatherAdapter;
use startpage_api::web::weather::MAX_CITIES_PER_REQUEST;
use startpage_core::ports::{PortError, WeatherService};
use startpage_core::retry::RetryPolicy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

//=========================================================================================
// GET /api/weather
//=========================================================================================

#[tokio::test]
async fn single_city_returns_one_report() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/api/weather", None, None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["city"], "北京");
    assert_eq!(body["data"]["text"], "晴");
    assert_eq!(body["data"]["weathercode"], 0);
}

#[tokio::test]
async fn several_cities_isolate_failures() {
    let app = TestApp::with_weather(ScriptedWeather::default().with("Oslo", Outcome::Fails));

    let (status, body) = app
        .send(Method::GET, "/api/weather?city=Paris,Oslo", None, None)
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["city"], "Paris");
    assert!(data[0]["temperature"].is_number());
    assert_eq!(data[1]["city"], "Oslo");
    assert!(data[1]["error"].as_str().unwrap().contains("Oslo"));
    assert_eq!(app.weather.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn configured_cities_come_from_the_document() {
    let app = TestApp::new();
    let token = app.login("admin123").await;
    let (status, _) = app
        .send(
            Method::PUT,
            "/api/data",
            Some(&token),
            Some(json!({ "settings": { "siteName": "Home", "weather": { "city": ["Lyon", "Nice"] } } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/api/weather", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["city"], "Lyon");
    assert_eq!(body["data"][1]["city"], "Nice");
}

#[tokio::test]
async fn total_failure_maps_to_gateway_errors() {
    let app = TestApp::with_weather(
        ScriptedWeather::default()
            .with("Paris", Outcome::TimesOut)
            .with("Oslo", Outcome::TimesOut)
            .with("Rome", Outcome::Fails),
    );

    let (status, body) = app
        .send(Method::GET, "/api/weather?city=Paris,Oslo", None, None)
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .send(Method::GET, "/api/weather?city=Paris,Rome", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    let (status, _) = app
        .send(Method::GET, "/api/weather?city=Rome", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn oversized_city_lists_are_rejected() {
    let app = TestApp::new();
    let cities = (0..=MAX_CITIES_PER_REQUEST)
        .map(|i| format!("c{i}"))
        .collect::<Vec<_>>()
        .join(",");

    let (status, body) = app
        .send(Method::GET, &format!("/api/weather?city={cities}"), None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(app.weather.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn long_configured_lists_are_truncated() {
    let app = TestApp::new();
    let token = app.login("admin123").await;
    let configured: Vec<String> = (0..MAX_CITIES_PER_REQUEST + 4).map(|i| format!("c{i}")).collect();
    let (status, _) = app
        .send(
            Method::PUT,
            "/api/data",
            Some(&token),
            Some(json!({ "settings": { "siteName": "Home", "weather": { "city": configured } } })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.send(Method::GET, "/api/weather", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), MAX_CITIES_PER_REQUEST);
    assert_eq!(app.weather.calls.load(Ordering::SeqCst), MAX_CITIES_PER_REQUEST);
}

//=========================================================================================
// Open-Meteo adapter against a local mock provider
//=========================================================================================

#[derive(Clone)]
struct Provider {
    geocoding_calls: Arc<AtomicUsize>,
    failures_before_success: usize,
    failure: StatusCode,
}

async fn geocoding(State(provider): State<Provider>) -> axum::response::Response {
    let call = provider.geocoding_calls.fetch_add(1, Ordering::SeqCst);
    if call < provider.failures_before_success {
        return provider.failure.into_response();
    }
    Json(json!({ "results": [{ "latitude": 48.85, "longitude": 2.35 }] })).into_response()
}

async fn forecast() -> Json<serde_json::Value> {
    Json(json!({
        "current_weather": {
            "temperature": 18.2,
            "windspeed": 7.5,
            "weathercode": 61,
            "time": "2024-05-01T12:00"
        }
    }))
}

async fn spawn_provider(failures_before_success: usize, failure: StatusCode) -> (String, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = Provider {
        geocoding_calls: calls.clone(),
        failures_before_success,
        failure,
    };
    let router = Router::new()
        .route("/geocode", get(geocoding))
        .route("/forecast", get(forecast))
        .with_state(provider);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (format!("http://{addr}"), calls)
}

fn adapter(base: &str) -> OpenMeteoWeatherAdapter {
    OpenMeteoWeatherAdapter::new(
        format!("{base}/geocode"),
        format!("{base}/forecast"),
        Duration::from_secs(5),
        3,
    )
    .unwrap()
    .with_retry_policy(RetryPolicy::new(3).with_initial_delay(Duration::from_millis(5)))
}

#[tokio::test]
async fn geocoding_retries_server_errors() {
    let (base, calls) = spawn_provider(2, StatusCode::SERVICE_UNAVAILABLE).await;

    let report = adapter(&base).current("Paris").await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(report.city, "Paris");
    assert_eq!(report.weathercode, 61);
    assert_eq!(report.temperature, 18.2);
    assert!(!report.text.is_empty());
}

#[tokio::test]
async fn geocoding_gives_up_after_the_last_attempt() {
    let (base, calls) = spawn_provider(10, StatusCode::INTERNAL_SERVER_ERROR).await;

    let err = adapter(&base).current("Paris").await.unwrap_err();
    assert!(matches!(err, PortError::Upstream { retryable: true, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn client_errors_fail_fast() {
    let (base, calls) = spawn_provider(10, StatusCode::BAD_REQUEST).await;

    let err = adapter(&base).current("Paris").await.unwrap_err();
    assert!(matches!(err, PortError::Upstream { retryable: false, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
