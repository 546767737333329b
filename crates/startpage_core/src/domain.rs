//! crates/startpage_core/src/domain.rs
//!
//! Defines the core data structures for the dashboard.
//! The serialized (camelCase) shape of `Document` is the persisted JSON schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder shown for items whose stored name is missing or blank.
pub const PLACEHOLDER_NAME: &str = "未命名";

/// The single persisted aggregate: settings, tiles, counters and credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub settings: Settings,
    pub apps: Vec<Item>,
    pub bookmarks: Vec<Item>,
    pub stats: Stats,
    pub admin: AdminCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub site_name: String,
    pub logo: String,
    pub greeting: String,
    /// Markdown; line endings are always `\n`.
    pub footer: String,
    pub weather: WeatherPreference,
}

/// One or more city names the weather widget reports on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeatherPreference {
    pub city: Vec<String>,
}

impl WeatherPreference {
    pub fn single(city: impl Into<String>) -> Self {
        Self {
            city: vec![city.into()],
        }
    }
}

/// An entry in the `apps` or `bookmarks` collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: String,
    pub icon: String,
    /// Only meaningful for bookmarks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
    pub visitor_count: u64,
}

// Never part of any client-facing projection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminCredentials {
    pub password_hash: String,
    pub password_salt: String,
}

/// Identifies which of the two item collections is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Apps,
    Bookmarks,
}

impl CollectionKind {
    /// The document key of the collection.
    pub fn key(self) -> &'static str {
        match self {
            CollectionKind::Apps => "apps",
            CollectionKind::Bookmarks => "bookmarks",
        }
    }

    /// Prefix used for generated ids, so they stay readable in the raw file.
    pub fn id_prefix(self) -> &'static str {
        match self {
            CollectionKind::Apps => "app",
            CollectionKind::Bookmarks => "bookmark",
        }
    }
}

/// The sanitised projection returned to clients. Contains no credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicView {
    pub settings: Settings,
    pub apps: Vec<Item>,
    pub bookmarks: Vec<Item>,
    pub visitor_count: u64,
}

/// The projection served to an authenticated admin: the public view plus the
/// city the weather widget will actually use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminView {
    #[serde(flatten)]
    pub view: PublicView,
    pub weather_city: String,
}

impl Document {
    pub fn public_view(&self) -> PublicView {
        PublicView {
            settings: self.settings.clone(),
            apps: self.apps.clone(),
            bookmarks: self.bookmarks.clone(),
            visitor_count: self.stats.visitor_count,
        }
    }

    /// Builds the admin projection, resolving the weather city against the
    /// configured fallback when the document lists none.
    pub fn admin_view(&self, default_city: &str) -> AdminView {
        let weather_city = self
            .settings
            .weather
            .city
            .first()
            .cloned()
            .unwrap_or_else(|| default_city.to_string());
        AdminView {
            view: self.public_view(),
            weather_city,
        }
    }
}

/// A server-tracked bearer-token grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// Current conditions for one city, as returned by `GET /api/weather`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReport {
    pub text: String,
    pub temperature: f64,
    pub windspeed: f64,
    pub weathercode: i32,
    pub time: String,
    pub city: String,
}
