//! Flat key-value settings store holding the override configuration.
//!
//! The store is the external collaborator the override engine reads on every
//! outgoing-message event. Two backends are provided: an in-memory map for
//! tests and development, and a sqlite-backed store for persistence.

use std::{
    collections::HashMap,
    fmt::Display,
    path::Path,
    sync::{Mutex, RwLock},
};

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

/// Settings key for the configured From address.
pub const FROM_EMAIL_KEY: &str = "mail.from_email";

/// Settings key for the configured From display name.
pub const FROM_NAME_KEY: &str = "mail.from_name";

/// Settings key for the configured Reply-To address.
pub const REPLY_TO_KEY: &str = "mail.reply_to";

/// Result type for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Errors that can occur while reading or writing settings.
#[derive(Debug)]
pub enum SettingsError {
    /// A database error occurred.
    Database(String),
}

impl Display for SettingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsError::Database(msg) => write!(f, "Settings database error: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {}

impl From<rusqlite::Error> for SettingsError {
    fn from(e: rusqlite::Error) -> Self {
        SettingsError::Database(e.to_string())
    }
}

/// Trait for key-value settings stores.
///
/// Lookups are expected to be fast and local; the pipeline reads the three
/// override keys fresh on every outgoing-message event.
pub trait SettingsStore: Send + Sync {
    /// Returns the stored value for `key`, or `None` when unset.
    fn get(&self, key: &str) -> SettingsResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> SettingsResult<()>;

    /// Returns the stored value for `key`, falling back to `default` when
    /// the key is unset or the lookup fails.
    fn get_or(&self, key: &str, default: &str) -> String {
        match self.get(key) {
            Ok(Some(value)) => value,
            _ => default.to_string(),
        }
    }
}

/// In-memory settings store.
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    /// Creates a new empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get(&self, key: &str) -> SettingsResult<Option<String>> {
        Ok(self.values.read().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> SettingsResult<()> {
        self.values
            .write()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Sqlite-backed settings store.
///
/// A single `settings` table with key-level upsert semantics. The
/// connection is guarded by a mutex so the store can be shared behind an
/// `Arc` across tasks.
pub struct SqliteSettingsStore {
    conn: Mutex<Connection>,
}

impl SqliteSettingsStore {
    /// Opens (and initializes if needed) the settings database at `path`.
    pub fn open(path: impl AsRef<Path>) -> SettingsResult<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        info!(path = %path.as_ref().display(), "Settings database opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl SettingsStore for SqliteSettingsStore {
    fn get(&self, key: &str) -> SettingsResult<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let value = conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> SettingsResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO settings (key, value) VALUES (?1, ?2) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }
}

/// Seeds unset override settings with the site defaults.
///
/// Mirrors first-activation behavior: each of the three override keys that
/// is unset (or blank) is populated from the site's admin email and site
/// name. Keys that already hold a value are left untouched.
pub fn seed_defaults(
    store: &dyn SettingsStore,
    admin_email: &str,
    site_name: &str,
) -> SettingsResult<()> {
    for (key, default) in [
        (FROM_EMAIL_KEY, admin_email),
        (FROM_NAME_KEY, site_name),
        (REPLY_TO_KEY, admin_email),
    ] {
        let current = store.get(key)?;
        if current.map_or(true, |v| v.trim().is_empty()) {
            debug!(key, default, "Seeding default setting");
            store.set(key, default)?;
        }
    }
    Ok(())
}
