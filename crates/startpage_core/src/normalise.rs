//! crates/startpage_core/src/normalise.rs
//!
//! Schema validation for the persisted document.
//!
//! The same per-entity validators run in two configurations:
//!
//! - `Strictness::Lenient` (read path): every defect is repaired in place and
//!   recorded, so a stored document can always be rendered.
//! - `Strictness::Strict` (write path): a defect in client input is reported
//!   as a `ValidationError` and nothing is persisted.
//!
//! Cosmetic fixes that are safe in both modes (trimming, adding a URL scheme,
//! regenerating a colliding id) are recorded as repairs and never fail.

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::LazyLock;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::credentials::{is_structurally_valid, CredentialHasher, HashError};
use crate::domain::{
    AdminCredentials, CollectionKind, Document, Item, Settings, Stats, WeatherPreference,
    PLACEHOLDER_NAME,
};

static URL_SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?:|mailto:|tel:|//)").expect("static regex is valid")
});

static CITY_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,，、]").expect("static regex is valid"));

const DOCUMENT_KEYS: &[&str] = &["settings", "apps", "bookmarks", "stats", "admin"];
const SETTINGS_KEYS: &[&str] = &["siteName", "logo", "greeting", "footer", "weather"];
const ITEM_KEYS: &[&str] = &["id", "name", "url", "description", "icon", "category"];

//=========================================================================================
// Validation Configuration
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    Lenient,
    Strict,
}

/// A rejected field in client input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

/// Tracks defects while walking a value. Lenient mode collects them as
/// repairs; strict mode turns them into errors.
#[derive(Debug)]
pub(crate) struct Checker {
    mode: Strictness,
    repairs: Vec<String>,
}

impl Checker {
    pub(crate) fn new(mode: Strictness) -> Self {
        Self {
            mode,
            repairs: Vec::new(),
        }
    }

    /// A defect: rejected in strict mode, repaired in lenient mode.
    fn defect(&mut self, field: &str, reason: &str) -> Result<(), ValidationError> {
        match self.mode {
            Strictness::Strict => Err(ValidationError {
                field: field.to_string(),
                reason: reason.to_string(),
            }),
            Strictness::Lenient => {
                self.repair(field, reason);
                Ok(())
            }
        }
    }

    /// A requirement that only client input must meet; stored data is left as is.
    fn require(&mut self, field: &str, reason: &str) -> Result<(), ValidationError> {
        match self.mode {
            Strictness::Strict => Err(ValidationError {
                field: field.to_string(),
                reason: reason.to_string(),
            }),
            Strictness::Lenient => Ok(()),
        }
    }

    /// A fix that is acceptable in either mode.
    fn repair(&mut self, field: &str, reason: &str) {
        self.repairs.push(format!("{field}: {reason}"));
    }

    pub(crate) fn into_repairs(self) -> Vec<String> {
        self.repairs
    }
}

//=========================================================================================
// Field Helpers
//=========================================================================================

fn as_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object)
}

fn flag_unknown_keys(c: &mut Checker, obj: &Map<String, Value>, known: &[&str], path: &str) {
    for key in obj.keys().filter(|k| !known.contains(&k.as_str())) {
        c.repair(&format!("{path}.{key}"), "unknown field dropped");
    }
}

/// Reads a string field, falling back when it is absent or mistyped.
fn string_field(
    c: &mut Checker,
    obj: &Map<String, Value>,
    key: &str,
    path: &str,
    fallback: &str,
) -> Result<String, ValidationError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        None => {
            c.repair(path, "missing, using default");
            Ok(fallback.to_string())
        }
        Some(_) => {
            c.defect(path, "must be a string")?;
            Ok(fallback.to_string())
        }
    }
}

/// Converts `\r\n` and lone `\r` to `\n`.
pub fn normalise_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Prefixes `https://` unless the URL already carries a recognised scheme.
pub fn normalise_url(url: &str) -> String {
    let url = url.trim();
    if url.is_empty() || URL_SCHEME.is_match(url) {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

fn generate_id(kind: CollectionKind) -> String {
    format!("{}-{}", kind.id_prefix(), Uuid::new_v4())
}

pub fn split_cities(text: &str) -> Vec<String> {
    CITY_SEPARATOR
        .split(text)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

//=========================================================================================
// Entity Validators
//=========================================================================================

fn validate_weather(
    c: &mut Checker,
    raw: Option<&Value>,
    fallback: &WeatherPreference,
) -> Result<WeatherPreference, ValidationError> {
    const PATH: &str = "settings.weather";
    let cities = match raw {
        None => {
            c.repair(PATH, "missing, using default");
            return Ok(fallback.clone());
        }
        Some(Value::String(s)) => {
            c.repair(PATH, "legacy string form migrated");
            split_cities(s)
        }
        Some(Value::Object(obj)) => match obj.get("city") {
            Some(Value::String(s)) => {
                c.repair(PATH, "city list stored as string");
                split_cities(s)
            }
            Some(Value::Array(list)) => {
                let mut cities = Vec::with_capacity(list.len());
                for entry in list {
                    match entry.as_str().map(str::trim) {
                        Some(city) if !city.is_empty() => {
                            if city.len() != entry.as_str().map_or(0, str::len) {
                                c.repair(PATH, "city name trimmed");
                            }
                            cities.push(city.to_string());
                        }
                        Some(_) => c.repair(PATH, "blank city dropped"),
                        None => c.defect(PATH, "cities must be strings")?,
                    }
                }
                if obj.len() > 1 {
                    c.repair(PATH, "unknown field dropped");
                }
                cities
            }
            _ => {
                c.defect(PATH, "city must be a string or a list of strings")?;
                Vec::new()
            }
        },
        Some(_) => {
            c.defect(PATH, "must be an object")?;
            Vec::new()
        }
    };

    if cities.is_empty() {
        c.defect(PATH, "at least one city is required")?;
        return Ok(fallback.clone());
    }
    Ok(WeatherPreference { city: cities })
}

/// Validates `settings`, taking absent sub-fields from `fallback`.
///
/// The site name is the one field that must be present and non-blank: strict
/// mode rejects a blank name, lenient mode substitutes the fallback's.
pub(crate) fn validate_settings(
    c: &mut Checker,
    raw: Option<&Value>,
    fallback: &Settings,
) -> Result<Settings, ValidationError> {
    let empty = Map::new();
    let obj = match raw {
        Some(Value::Object(obj)) => obj,
        None => {
            c.defect("settings", "missing")?;
            &empty
        }
        Some(_) => {
            c.defect("settings", "must be an object")?;
            &empty
        }
    };
    flag_unknown_keys(c, obj, SETTINGS_KEYS, "settings");

    let site_name = match obj.get("siteName").and_then(Value::as_str).map(str::trim) {
        Some(name) if !name.is_empty() => {
            if obj.get("siteName").and_then(Value::as_str) != Some(name) {
                c.repair("settings.siteName", "trimmed");
            }
            name.to_string()
        }
        _ => {
            c.defect("settings.siteName", "site name must not be empty")?;
            fallback.site_name.clone()
        }
    };

    let logo = string_field(c, obj, "logo", "settings.logo", &fallback.logo)?;
    let greeting = string_field(c, obj, "greeting", "settings.greeting", &fallback.greeting)?;
    let raw_footer = string_field(c, obj, "footer", "settings.footer", &fallback.footer)?;
    let footer = normalise_newlines(&raw_footer);
    if footer != raw_footer {
        c.repair("settings.footer", "line endings normalised");
    }
    let weather = validate_weather(c, obj.get("weather"), &fallback.weather)?;

    Ok(Settings {
        site_name,
        logo,
        greeting,
        footer,
        weather,
    })
}

fn validate_item(
    c: &mut Checker,
    raw: &Value,
    kind: CollectionKind,
    path: &str,
    seen: &mut HashSet<String>,
) -> Result<Option<Item>, ValidationError> {
    let Some(obj) = raw.as_object() else {
        c.defect(path, "item must be an object")?;
        return Ok(None);
    };
    flag_unknown_keys(c, obj, ITEM_KEYS, path);

    let name = match obj.get("name").and_then(Value::as_str).map(str::trim) {
        Some(name) if !name.is_empty() => {
            if obj.get("name").and_then(Value::as_str) != Some(name) {
                c.repair(&format!("{path}.name"), "trimmed");
            }
            name.to_string()
        }
        _ => {
            c.defect(&format!("{path}.name"), "name is required")?;
            PLACEHOLDER_NAME.to_string()
        }
    };

    let url = match obj.get("url") {
        Some(Value::String(raw_url)) => {
            let url = normalise_url(raw_url);
            if url.is_empty() {
                c.require(&format!("{path}.url"), "url is required")?;
            } else if url != *raw_url {
                c.repair(&format!("{path}.url"), "normalised");
            }
            url
        }
        _ => {
            c.defect(&format!("{path}.url"), "url is required")?;
            String::new()
        }
    };

    let description = string_field(c, obj, "description", &format!("{path}.description"), "")?;
    let icon = string_field(c, obj, "icon", &format!("{path}.icon"), "")?;

    let category = match (kind, obj.get("category")) {
        (CollectionKind::Bookmarks, None) => None,
        (CollectionKind::Bookmarks, Some(Value::String(s))) => Some(s.clone()),
        (CollectionKind::Bookmarks, Some(Value::Null)) => {
            c.repair(&format!("{path}.category"), "null category dropped");
            None
        }
        (CollectionKind::Bookmarks, Some(_)) => {
            c.defect(&format!("{path}.category"), "must be a string")?;
            None
        }
        (CollectionKind::Apps, Some(_)) => {
            c.repair(&format!("{path}.category"), "category only applies to bookmarks");
            None
        }
        (CollectionKind::Apps, None) => None,
    };

    let id = match obj.get("id").and_then(Value::as_str) {
        Some(id) if !id.is_empty() && !seen.contains(id) => id.to_string(),
        _ => {
            c.repair(&format!("{path}.id"), "missing or duplicate id regenerated");
            generate_id(kind)
        }
    };
    seen.insert(id.clone());

    Ok(Some(Item {
        id,
        name,
        url,
        description,
        icon,
        category,
    }))
}

/// Validates one collection. Ids are unique within the result.
pub(crate) fn validate_collection(
    c: &mut Checker,
    raw: Option<&Value>,
    kind: CollectionKind,
) -> Result<Vec<Item>, ValidationError> {
    let list = match raw {
        Some(Value::Array(list)) => list,
        _ => {
            c.defect(kind.key(), "must be an array")?;
            return Ok(Vec::new());
        }
    };

    let mut seen = HashSet::with_capacity(list.len());
    let mut items = Vec::with_capacity(list.len());
    for (index, raw_item) in list.iter().enumerate() {
        let path = format!("{}[{index}]", kind.key());
        if let Some(item) = validate_item(c, raw_item, kind, &path, &mut seen)? {
            items.push(item);
        }
    }
    Ok(items)
}

fn validate_stats(c: &mut Checker, root: &Map<String, Value>) -> Stats {
    let stats = as_object(root.get("stats"));
    let current = stats.and_then(|s| s.get("visitorCount"));

    let raw = match (current, stats.and_then(|s| s.get("visits")), root.get("visitorCount")) {
        (Some(v), _, _) => v,
        (None, Some(legacy), _) | (None, None, Some(legacy)) => {
            c.repair("stats.visitorCount", "legacy counter field migrated");
            legacy
        }
        (None, None, None) => {
            c.repair("stats.visitorCount", "missing, reset to 0");
            return Stats::default();
        }
    };
    if stats.is_some_and(|s| s.len() > 1) || root.contains_key("visitorCount") {
        c.repair("stats", "unknown field dropped");
    }

    let visitor_count = match (raw.as_u64(), raw.as_f64()) {
        (Some(n), _) => n,
        (None, Some(f)) if f.is_finite() && f >= 0.0 => {
            c.repair("stats.visitorCount", "truncated to an integer");
            f.trunc() as u64
        }
        _ => {
            c.repair("stats.visitorCount", "invalid value reset to 0");
            0
        }
    };
    Stats { visitor_count }
}

fn validate_admin(raw: Option<&Value>) -> Option<AdminCredentials> {
    let obj = as_object(raw)?;
    let hash = obj.get("passwordHash")?.as_str()?;
    let salt = obj.get("passwordSalt")?.as_str()?;
    if !is_structurally_valid(hash, salt) {
        return None;
    }
    Some(AdminCredentials {
        password_hash: hash.to_string(),
        password_salt: salt.to_string(),
    })
}

//=========================================================================================
// Document Normaliser
//=========================================================================================

/// The outcome of normalising an untrusted document.
#[derive(Debug, Clone)]
pub struct Normalised {
    pub document: Document,
    /// True when the output differs from the input and should be written back.
    pub mutated: bool,
    /// True when the admin credentials were regenerated from the default password.
    pub credentials_reset: bool,
    pub repairs: Vec<String>,
}

/// Repairs arbitrary parsed JSON into a valid `Document`.
#[derive(Debug, Clone)]
pub struct Normaliser {
    config: CoreConfig,
    hasher: CredentialHasher,
}

impl Normaliser {
    pub fn new(config: CoreConfig, hasher: CredentialHasher) -> Self {
        Self { config, hasher }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn hasher(&self) -> &CredentialHasher {
        &self.hasher
    }

    /// Settings used whenever stored settings are unusable.
    pub fn default_settings(&self) -> Settings {
        Settings {
            site_name: self.config.default_site_name.clone(),
            logo: String::new(),
            greeting: String::new(),
            footer: String::new(),
            weather: WeatherPreference::single(self.config.default_weather_city.clone()),
        }
    }

    /// The seed document written on first start or after corruption, with a
    /// freshly salted hash of the default password.
    pub fn default_document(&self) -> Result<Document, HashError> {
        let seed_item = |kind: CollectionKind, name: &str, url: &str, description: &str| Item {
            id: generate_id(kind),
            name: name.to_string(),
            url: url.to_string(),
            description: description.to_string(),
            icon: String::new(),
            category: match kind {
                CollectionKind::Bookmarks => Some("常用".to_string()),
                CollectionKind::Apps => None,
            },
        };

        Ok(Document {
            settings: Settings {
                greeting: "你好，欢迎回来".to_string(),
                footer: "Powered by startpage".to_string(),
                ..self.default_settings()
            },
            apps: vec![
                seed_item(CollectionKind::Apps, "GitHub", "https://github.com", "代码托管"),
                seed_item(CollectionKind::Apps, "Gmail", "https://mail.google.com", "邮件"),
            ],
            bookmarks: vec![
                seed_item(CollectionKind::Bookmarks, "Rust", "https://www.rust-lang.org", "Rust 官网"),
                seed_item(CollectionKind::Bookmarks, "docs.rs", "https://docs.rs", "文档"),
            ],
            stats: Stats::default(),
            admin: self
                .hasher
                .derive_credentials(&self.config.default_admin_password)?,
        })
    }

    /// Normalises a parsed document. Malformed input is always healed; the only
    /// possible failure is the key derivation for replacement credentials.
    pub fn normalise(&self, raw: &Value) -> Result<Normalised, HashError> {
        let mut c = Checker::new(Strictness::Lenient);
        let empty = Map::new();
        let root = match raw.as_object() {
            Some(root) => root,
            None => {
                c.repair("document", "not an object, rebuilt from defaults");
                &empty
            }
        };
        flag_unknown_keys(&mut c, root, DOCUMENT_KEYS, "document");

        // Lenient checkers never return errors, so the fallbacks are unreachable.
        let defaults = self.default_settings();
        let settings = validate_settings(&mut c, root.get("settings"), &defaults)
            .unwrap_or_else(|_| defaults.clone());
        let apps = validate_collection(&mut c, root.get("apps"), CollectionKind::Apps)
            .unwrap_or_default();
        let bookmarks =
            validate_collection(&mut c, root.get("bookmarks"), CollectionKind::Bookmarks)
                .unwrap_or_default();
        let stats = validate_stats(&mut c, root);

        let (admin, credentials_reset) = match validate_admin(root.get("admin")) {
            Some(admin) => {
                if as_object(root.get("admin")).is_some_and(|a| a.len() > 2) {
                    c.repair("admin", "unknown field dropped");
                }
                (admin, false)
            }
            None => {
                c.repair("admin", "missing or invalid credentials reset to default");
                (
                    self.hasher
                        .derive_credentials(&self.config.default_admin_password)?,
                    true,
                )
            }
        };

        let repairs = c.into_repairs();
        Ok(Normalised {
            document: Document {
                settings,
                apps,
                bookmarks,
                stats,
                admin,
            },
            mutated: !repairs.is_empty(),
            credentials_reset,
            repairs,
        })
    }
}

/// Lenient normalisation of a single collection; returns the items and whether
/// anything had to be repaired.
pub fn normalise_collection(raw: &Value, kind: CollectionKind) -> (Vec<Item>, bool) {
    let mut c = Checker::new(Strictness::Lenient);
    let items = validate_collection(&mut c, Some(raw), kind).unwrap_or_default();
    let repaired = !c.into_repairs().is_empty();
    (items, repaired)
}
