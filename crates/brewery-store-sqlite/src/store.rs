// brewery-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Brewery Store
// Description: BreweryStore backed by a SQLite database.
// Purpose: Issue parameterized SQL for brewery records and map rows by name.
// Dependencies: brewery-core, rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! This module implements [`BreweryStore`] over `SQLite`. The connection is
//! owned by the store instance and guarded by a mutex; callers inject the
//! store wherever it is needed. Rows are mapped by column name and any
//! mapping mismatch fails the call instead of defaulting the field.
//!
//! Delete removes the dependent rows (hours, events, images, beer reviews,
//! beers) and the brewery row inside one transaction, so a failure part-way
//! leaves every table untouched.

// ============================================================================//
// SECTION: Imports
// ============================================================================//

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use brewery_core::Brewery;
use brewery_core::BreweryId;
use brewery_core::BreweryStore;
use brewery_core::OwnerId;
use brewery_core::StoreError;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================//
// SECTION: Constants
// ============================================================================//

/// `SQLite` schema version for the store.
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

/// Columns selected for every brewery read.
const BREWERY_COLUMNS: &str = "brewery_id, name, email, phone, website, street_address, city, \
                               state, zipcode, history, logo_img, is_active, has_food, owner_id";

/// Dependent-row deletes, in the order they must run before the brewery row.
const DEPENDENT_DELETES: [&str; 5] = [
    "DELETE FROM hours WHERE brewery_id = ?1",
    "DELETE FROM event WHERE brewery_id = ?1",
    "DELETE FROM image WHERE brewery_id = ?1",
    "DELETE FROM beer_review WHERE beer_id IN (SELECT beer_id FROM beer WHERE brewery_id = ?1)",
    "DELETE FROM beer WHERE brewery_id = ?1",
];

// ============================================================================//
// SECTION: Config
// ============================================================================//

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the `SQLite` brewery store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl SqliteStoreConfig {
    /// Builds a config for `path` with default tuning.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
#[must_use]
pub const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================//
// SECTION: Errors
// ============================================================================//

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// No brewery row matched the identifier.
    #[error("brewery with id {0} was not found")]
    NotFound(BreweryId),
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::NotFound(id) => Self::NotFound(id),
            SqliteStoreError::Io(message) => Self::Io(message),
            SqliteStoreError::Db(message) => Self::Store(message),
            SqliteStoreError::VersionMismatch(message) => Self::VersionMismatch(message),
            SqliteStoreError::Invalid(message) => Self::Invalid(message),
        }
    }
}

// ============================================================================//
// SECTION: Store
// ============================================================================//

/// `SQLite`-backed brewery store.
#[derive(Clone)]
pub struct SqliteBreweryStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqliteBreweryStore {
    /// Opens an `SQLite`-backed brewery store, creating the schema on first
    /// use.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Registers an owner account and returns its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the username is taken or the insert
    /// fails.
    pub fn insert_owner(&self, username: &str) -> Result<OwnerId, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute("INSERT INTO users (username) VALUES (?1)", params![username])
            .map_err(classify_error)?;
        Ok(OwnerId::new(guard.last_insert_rowid()))
    }

    /// Acquires the connection lock.
    fn lock(&self) -> Result<MutexGuard<'_, Connection>, SqliteStoreError> {
        self.connection.lock().map_err(|_| SqliteStoreError::Db("mutex poisoned".to_string()))
    }

    /// Loads a brewery row.
    fn load_brewery(&self, id: BreweryId) -> Result<Brewery, SqliteStoreError> {
        let guard = self.lock()?;
        select_brewery(&guard, id)
    }

    /// Loads every brewery row in identifier order.
    fn load_breweries(&self) -> Result<Vec<Brewery>, SqliteStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(&format!("SELECT {BREWERY_COLUMNS} FROM brewery ORDER BY brewery_id"))
            .map_err(classify_error)?;
        let rows = statement.query_map(params![], map_brewery_row).map_err(classify_error)?;
        let mut breweries = Vec::new();
        for row in rows {
            breweries.push(row.map_err(classify_error)?);
        }
        Ok(breweries)
    }

    /// Inserts the name and owner of a brewery and reloads the stored row.
    fn insert_brewery(&self, brewery: &Brewery) -> Result<Brewery, SqliteStoreError> {
        let guard = self.lock()?;
        guard
            .execute(
                "INSERT INTO brewery (name, owner_id) VALUES (?1, ?2)",
                params![brewery.name, brewery.owner_id.get()],
            )
            .map_err(classify_error)?;
        let id = BreweryId::new(guard.last_insert_rowid());
        select_brewery(&guard, id)
    }

    /// Rewrites the mutable columns of an existing brewery; website and owner are kept.
    fn update_brewery(&self, brewery: &Brewery) -> Result<bool, SqliteStoreError> {
        let guard = self.lock()?;
        let count = guard
            .execute(
                "UPDATE brewery SET name = ?1, email = ?2, phone = ?3, street_address = ?4, \
                 city = ?5, state = ?6, zipcode = ?7, history = ?8, logo_img = ?9, \
                 is_active = ?10, has_food = ?11 WHERE brewery_id = ?12",
                params![
                    brewery.name,
                    brewery.email,
                    brewery.phone,
                    brewery.street_address,
                    brewery.city,
                    brewery.state,
                    brewery.zip,
                    brewery.history,
                    brewery.logo,
                    brewery.active,
                    brewery.has_food,
                    brewery.brewery_id.get()
                ],
            )
            .map_err(classify_error)?;
        Ok(count == 1)
    }

    /// Deletes dependent rows and the brewery row in one transaction.
    fn delete_brewery(&self, id: BreweryId) -> Result<bool, SqliteStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(classify_error)?;
        for statement in DEPENDENT_DELETES {
            tx.execute(statement, params![id.get()]).map_err(classify_error)?;
        }
        let count = tx
            .execute("DELETE FROM brewery WHERE brewery_id = ?1", params![id.get()])
            .map_err(classify_error)?;
        tx.commit().map_err(classify_error)?;
        drop(guard);
        Ok(count == 1)
    }
}

impl BreweryStore for SqliteBreweryStore {
    fn fetch_one(&self, id: BreweryId) -> Result<Brewery, StoreError> {
        self.load_brewery(id).map_err(StoreError::from)
    }

    fn fetch_all(&self) -> Result<Vec<Brewery>, StoreError> {
        self.load_breweries().map_err(StoreError::from)
    }

    fn insert(&self, brewery: &Brewery) -> Result<Brewery, StoreError> {
        self.insert_brewery(brewery).map_err(StoreError::from)
    }

    fn update(&self, brewery: &Brewery) -> Result<bool, StoreError> {
        self.update_brewery(brewery).map_err(StoreError::from)
    }

    fn delete(&self, id: BreweryId) -> Result<bool, StoreError> {
        self.delete_brewery(id).map_err(StoreError::from)
    }
}

// ============================================================================//
// SECTION: Row Mapping
// ============================================================================//

/// Selects a single brewery on an already locked connection.
fn select_brewery(connection: &Connection, id: BreweryId) -> Result<Brewery, SqliteStoreError> {
    connection
        .query_row(
            &format!("SELECT {BREWERY_COLUMNS} FROM brewery WHERE brewery_id = ?1"),
            params![id.get()],
            map_brewery_row,
        )
        .optional()
        .map_err(classify_error)?
        .ok_or(SqliteStoreError::NotFound(id))
}

/// Maps a brewery row by column name. Collections stay empty.
fn map_brewery_row(row: &Row<'_>) -> rusqlite::Result<Brewery> {
    Ok(Brewery {
        brewery_id: BreweryId::new(row.get("brewery_id")?),
        name: row.get("name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        website: row.get("website")?,
        street_address: row.get("street_address")?,
        city: row.get("city")?,
        state: row.get("state")?,
        zip: row.get("zipcode")?,
        history: row.get("history")?,
        logo: row.get("logo_img")?,
        active: row.get("is_active")?,
        has_food: row.get("has_food")?,
        owner_id: OwnerId::new(row.get("owner_id")?),
        ..Brewery::default()
    })
}

/// Splits mapping failures from engine failures.
fn classify_error(error: rusqlite::Error) -> SqliteStoreError {
    match error {
        rusqlite::Error::InvalidColumnName(..)
        | rusqlite::Error::InvalidColumnType(..)
        | rusqlite::Error::FromSqlConversionFailure(..)
        | rusqlite::Error::IntegralValueOutOfRange(..) => {
            SqliteStoreError::Invalid(error.to_string())
        }
        other => SqliteStoreError::Db(other.to_string()),
    }
}

// ============================================================================//
// SECTION: Helpers
// ============================================================================//

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.trim().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must be non-empty".to_string()));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with referential integrity enforced.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas.
fn apply_pragmas(
    connection: &Connection,
    config: &SqliteStoreConfig,
) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Initializes the `SQLite` schema or validates the existing version.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS users (
                    user_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    username TEXT NOT NULL UNIQUE
                );
                CREATE TABLE IF NOT EXISTS brewery (
                    brewery_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    email TEXT,
                    phone TEXT,
                    website TEXT,
                    street_address TEXT,
                    city TEXT,
                    state TEXT,
                    zipcode TEXT,
                    history TEXT,
                    logo_img TEXT,
                    is_active INTEGER NOT NULL DEFAULT 0,
                    has_food INTEGER NOT NULL DEFAULT 0,
                    owner_id INTEGER NOT NULL REFERENCES users(user_id)
                );
                CREATE TABLE IF NOT EXISTS hours (
                    hours_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    brewery_id INTEGER NOT NULL REFERENCES brewery(brewery_id),
                    day_of_week TEXT NOT NULL,
                    open_time TEXT,
                    close_time TEXT
                );
                CREATE TABLE IF NOT EXISTS event (
                    event_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    brewery_id INTEGER NOT NULL REFERENCES brewery(brewery_id),
                    title TEXT NOT NULL,
                    event_date TEXT
                );
                CREATE TABLE IF NOT EXISTS image (
                    image_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    brewery_id INTEGER NOT NULL REFERENCES brewery(brewery_id),
                    image_url TEXT NOT NULL
                );
                CREATE TABLE IF NOT EXISTS beer (
                    beer_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    brewery_id INTEGER NOT NULL REFERENCES brewery(brewery_id),
                    name TEXT NOT NULL,
                    price REAL
                );
                CREATE TABLE IF NOT EXISTS beer_review (
                    review_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    beer_id INTEGER NOT NULL REFERENCES beer(beer_id),
                    user_id INTEGER REFERENCES users(user_id),
                    rating INTEGER,
                    review TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_beer_brewery_id ON beer (brewery_id);",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

// ============================================================================//
// SECTION: Tests
// ============================================================================//
