pub mod fs_document;
pub mod kv_document;
pub mod kv_sessions;
pub mod memory_kv;
pub mod memory_sessions;
pub mod open_meteo;

pub use fs_document::FsDocumentBackend;
pub use kv_document::KvDocumentBackend;
pub use kv_sessions::KvSessionStore;
pub use memory_kv::MemoryKvNamespace;
pub use memory_sessions::{spawn_session_sweeper, InMemorySessionStore};
pub use open_meteo::OpenMeteoWeatherAdapter;
