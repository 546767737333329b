//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and how it is wired from configuration.

use crate::adapters::{
    FsDocumentBackend, InMemorySessionStore, KvDocumentBackend, KvSessionStore,
    MemoryKvNamespace, OpenMeteoWeatherAdapter,
};
use crate::config::{Config, StorageBackend};
use crate::error::ApiError;
use startpage_core::clock::{Clock, SystemClock};
use startpage_core::credentials::CredentialHasher;
use startpage_core::events::TracingEventSink;
use startpage_core::normalise::Normaliser;
use startpage_core::ports::{DocumentBackend, SessionStore, WeatherService};
use startpage_core::store::DocumentStore;
use startpage_core::weather::CachedWeatherService;
use std::sync::Arc;
use tracing::info;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub documents: Arc<DocumentStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub weather: Arc<dyn WeatherService>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Builds the adapters selected by `config.storage`.
    pub fn from_config(config: Config) -> Result<Self, ApiError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let hasher = CredentialHasher::new(config.core.hash_params)?;
        let normaliser = Normaliser::new(config.core.clone(), hasher);

        let (backend, sessions): (Arc<dyn DocumentBackend>, Arc<dyn SessionStore>) =
            match config.storage {
                StorageBackend::Filesystem => {
                    info!("Using file storage at {}", config.data_path.display());
                    (
                        Arc::new(FsDocumentBackend::new(config.data_path.clone())),
                        Arc::new(InMemorySessionStore::new(
                            config.core.session_ttl,
                            clock.clone(),
                        )?),
                    )
                }
                StorageBackend::KeyValue => {
                    info!("Using key-value storage under key '{}'", config.kv_document_key);
                    let kv = Arc::new(MemoryKvNamespace::new(clock.clone()));
                    (
                        Arc::new(KvDocumentBackend::new(kv.clone(), config.kv_document_key.clone())),
                        Arc::new(KvSessionStore::new(kv, config.core.session_ttl, clock.clone())),
                    )
                }
            };

        let documents = Arc::new(DocumentStore::new(
            backend,
            normaliser,
            Arc::new(TracingEventSink),
        ));

        let provider = OpenMeteoWeatherAdapter::new(
            config.geocoding_url.clone(),
            config.forecast_url.clone(),
            config.core.weather_timeout,
            config.core.weather_max_retries,
        )?;
        let cache_ttl = chrono::Duration::from_std(config.weather_cache_ttl)
            .map_err(|e| ApiError::Internal(format!("invalid weather cache ttl: {e}")))?;
        let weather = Arc::new(CachedWeatherService::new(Arc::new(provider), clock, cache_ttl));

        Ok(Self {
            documents,
            sessions,
            weather,
            config: Arc::new(config),
        })
    }
}
