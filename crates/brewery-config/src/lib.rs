// brewery-config/src/lib.rs
// ============================================================================
// Module: Brewery Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for brewery.toml semantics.
// Dependencies: brewery-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `brewery-config` defines the configuration model for the brewery registry
//! server: listener settings, the access policy for role-gated endpoints,
//! audit output, and the `SQLite` store. Validation is strict and fails
//! closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
