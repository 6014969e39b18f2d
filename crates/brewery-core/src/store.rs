// brewery-core/src/store.rs
// ============================================================================
// Module: Brewery Store Interface
// Description: Storage trait and error taxonomy for brewery records.
// Purpose: Decouple the HTTP layer from the relational backend.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! [`BreweryStore`] is the record store contract: fetch-one, fetch-all,
//! insert, update, and delete. Absent records surface as
//! [`StoreError::NotFound`]; every other variant is a store failure.
//! Update and delete report success through the exactly-one-row-affected
//! contract rather than an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use thiserror::Error;

use crate::identifiers::BreweryId;
use crate::record::Brewery;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Brewery store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No brewery exists with the requested identifier.
    #[error("brewery with id {0} was not found")]
    NotFound(BreweryId),
    /// Store I/O error.
    #[error("brewery store io error: {0}")]
    Io(String),
    /// Store schema version is incompatible.
    #[error("brewery store version mismatch: {0}")]
    VersionMismatch(String),
    /// Stored data could not be mapped to a record.
    #[error("brewery store invalid data: {0}")]
    Invalid(String),
    /// Underlying engine reported an error.
    #[error("brewery store error: {0}")]
    Store(String),
}

impl StoreError {
    /// Returns true when the error signals an absent record.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// ============================================================================
// SECTION: Store Trait
// ============================================================================

/// Record store for breweries.
pub trait BreweryStore {
    /// Fetches a single brewery.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no row matches `id`, or another
    /// [`StoreError`] when the store fails.
    fn fetch_one(&self, id: BreweryId) -> Result<Brewery, StoreError>;

    /// Fetches every brewery. An empty table yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store fails.
    fn fetch_all(&self) -> Result<Vec<Brewery>, StoreError>;

    /// Inserts a brewery using only its name and owner, returning the stored
    /// record with its newly assigned identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the insert is rejected or the store fails.
    fn insert(&self, brewery: &Brewery) -> Result<Brewery, StoreError>;

    /// Replaces every mutable field of the row matching `brewery.brewery_id`.
    /// Returns true iff exactly one row was affected.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store fails.
    fn update(&self, brewery: &Brewery) -> Result<bool, StoreError>;

    /// Deletes a brewery together with its dependent rows. Returns true iff
    /// the brewery row itself was removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the store fails; no rows are removed then.
    fn delete(&self, id: BreweryId) -> Result<bool, StoreError>;
}

// ============================================================================
// SECTION: Shared Store
// ============================================================================

/// Shared brewery store backed by an `Arc` trait object.
#[derive(Clone)]
pub struct SharedBreweryStore {
    /// Inner store implementation.
    inner: Arc<dyn BreweryStore + Send + Sync>,
}

impl SharedBreweryStore {
    /// Wraps a brewery store in a shared, clonable wrapper.
    #[must_use]
    pub fn from_store(store: impl BreweryStore + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }
}

impl BreweryStore for SharedBreweryStore {
    fn fetch_one(&self, id: BreweryId) -> Result<Brewery, StoreError> {
        self.inner.fetch_one(id)
    }

    fn fetch_all(&self) -> Result<Vec<Brewery>, StoreError> {
        self.inner.fetch_all()
    }

    fn insert(&self, brewery: &Brewery) -> Result<Brewery, StoreError> {
        self.inner.insert(brewery)
    }

    fn update(&self, brewery: &Brewery) -> Result<bool, StoreError> {
        self.inner.update(brewery)
    }

    fn delete(&self, id: BreweryId) -> Result<bool, StoreError> {
        self.inner.delete(id)
    }
}
