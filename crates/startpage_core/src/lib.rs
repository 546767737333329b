pub mod clock;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod events;
pub mod mutation;
pub mod normalise;
pub mod ports;
pub mod retry;
pub mod store;
pub mod weather;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CoreConfig, HashParams};
pub use credentials::{CredentialHasher, HashError};
pub use domain::{
    AdminCredentials, AdminView, CollectionKind, Document, Item, PublicView, SessionRecord,
    Settings, Stats, WeatherPreference, WeatherReport,
};
pub use events::{EventSink, RecordingEventSink, StoreEvent, TracingEventSink};
pub use normalise::{Normalised, Normaliser, ValidationError};
pub use ports::{
    DocumentBackend, KeyValueNamespace, PortError, PortResult, SessionStore, WeatherService,
};
pub use store::{DocumentStore, StoreError, StoreResult};
