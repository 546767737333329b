//! Shared harness for the HTTP integration tests: an `AppState` wired with
//! a temporary data file, a manual clock and a scripted weather service.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use startpage_api::adapters::{
    FsDocumentBackend, InMemorySessionStore, KvDocumentBackend, KvSessionStore, MemoryKvNamespace,
};
use startpage_api::config::{Config, StorageBackend};
use startpage_api::web::{build_router, state::AppState};
use startpage_core::clock::{Clock, ManualClock};
use startpage_core::config::{CoreConfig, HashParams};
use startpage_core::credentials::CredentialHasher;
use startpage_core::domain::WeatherReport;
use startpage_core::events::RecordingEventSink;
use startpage_core::normalise::Normaliser;
use startpage_core::ports::{
    DocumentBackend, PortError, PortResult, SessionStore, WeatherService,
};
use startpage_core::store::DocumentStore;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

/// How the scripted weather service answers for one city.
#[derive(Clone, Copy)]
pub enum Outcome {
    Sunny,
    Fails,
    TimesOut,
}

#[derive(Default)]
pub struct ScriptedWeather {
    outcomes: HashMap<String, Outcome>,
    pub calls: AtomicUsize,
}

impl ScriptedWeather {
    pub fn with(mut self, city: &str, outcome: Outcome) -> Self {
        self.outcomes.insert(city.to_string(), outcome);
        self
    }
}

#[async_trait]
impl WeatherService for ScriptedWeather {
    async fn current(&self, city: &str) -> PortResult<WeatherReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcomes.get(city).copied().unwrap_or(Outcome::Sunny) {
            Outcome::Sunny => Ok(WeatherReport {
                text: "晴".to_string(),
                temperature: 21.5,
                windspeed: 3.0,
                weathercode: 0,
                time: "2024-05-01T12:00".to_string(),
                city: city.to_string(),
            }),
            Outcome::Fails => Err(PortError::upstream_fatal(format!("no weather for {city}"))),
            Outcome::TimesOut => Err(PortError::Timeout),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
    pub clock: Arc<ManualClock>,
    pub events: Arc<RecordingEventSink>,
    pub weather: Arc<ScriptedWeather>,
    pub data_path: PathBuf,
    _dir: TempDir,
}

pub fn test_config(data_path: PathBuf) -> Config {
    Config {
        data_path,
        core: CoreConfig {
            hash_params: HashParams::low_cost(),
            session_ttl: Duration::from_secs(60 * 60),
            ..CoreConfig::default()
        },
        ..Config::default()
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::build(StorageBackend::Filesystem, ScriptedWeather::default(), None)
    }

    pub fn with_weather(weather: ScriptedWeather) -> Self {
        Self::build(StorageBackend::Filesystem, weather, None)
    }

    pub fn with_kv() -> Self {
        Self::build(StorageBackend::KeyValue, ScriptedWeather::default(), None)
    }

    /// Serves the front end from `public_dir` next to the API.
    pub fn with_public_dir(public_dir: PathBuf) -> Self {
        Self::build(
            StorageBackend::Filesystem,
            ScriptedWeather::default(),
            Some(public_dir),
        )
    }

    fn build(storage: StorageBackend, weather: ScriptedWeather, public_dir: Option<PathBuf>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("data").join("navigation.json");
        let config = Config {
            storage: storage.clone(),
            public_dir,
            ..test_config(data_path.clone())
        };

        let clock = Arc::new(ManualClock::default());
        let dyn_clock: Arc<dyn Clock> = clock.clone();
        let events = Arc::new(RecordingEventSink::new());
        let weather = Arc::new(weather);
        let hasher = CredentialHasher::new(config.core.hash_params).unwrap();
        let normaliser = Normaliser::new(config.core.clone(), hasher);

        let (backend, sessions): (Arc<dyn DocumentBackend>, Arc<dyn SessionStore>) = match storage
        {
            StorageBackend::Filesystem => (
                Arc::new(FsDocumentBackend::new(data_path.clone())),
                Arc::new(InMemorySessionStore::new(config.core.session_ttl, dyn_clock).unwrap()),
            ),
            StorageBackend::KeyValue => {
                let kv = Arc::new(MemoryKvNamespace::new(dyn_clock.clone()));
                (
                    Arc::new(KvDocumentBackend::new(kv.clone(), "navigation")),
                    Arc::new(KvSessionStore::new(kv, config.core.session_ttl, dyn_clock)),
                )
            }
        };

        let state = Arc::new(AppState {
            documents: Arc::new(DocumentStore::new(backend, normaliser, events.clone())),
            sessions,
            weather: weather.clone(),
            config: Arc::new(config),
        });
        let router = build_router(state.clone()).unwrap();

        Self {
            router,
            state,
            clock,
            events,
            weather,
            data_path,
            _dir: dir,
        }
    }

    /// Sends a bodiless GET and returns the raw response text.
    pub async fn get_text(&self, uri: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method(Method::GET)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Sends one request through the router and decodes the JSON answer.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    pub async fn login(&self, password: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/api/login",
                None,
                Some(serde_json::json!({ "password": password })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["token"].as_str().unwrap().to_string()
    }

    /// The persisted document as raw JSON.
    pub async fn stored(&self) -> Value {
        let raw = tokio::fs::read_to_string(&self.data_path).await.unwrap();
        serde_json::from_str(&raw).unwrap()
    }
}
