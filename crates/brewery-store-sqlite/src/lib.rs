// brewery-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Brewery Store
// Description: BreweryStore backend using SQLite.
// Purpose: Provide the relational record store for the brewery registry.
// Dependencies: brewery-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a SQLite-backed [`brewery_core::BreweryStore`]. It
//! creates the brewery schema (plus the owner and dependent tables the delete
//! cascade touches) on first open and enforces foreign keys on every
//! connection.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteBreweryStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteStoreMode;
pub use store::SqliteSyncMode;
pub use store::default_busy_timeout_ms;
