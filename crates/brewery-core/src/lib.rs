// brewery-core/src/lib.rs
// ============================================================================
// Module: Brewery Core Library
// Description: Public API surface for the Brewery Registry core.
// Purpose: Expose the brewery record, identifiers, and storage interfaces.
// Dependencies: crate::{identifiers, record, store}
// ============================================================================

//! ## Overview
//! Brewery core defines the brewery record and the [`BreweryStore`] interface
//! that storage backends implement. It carries no storage or transport code so
//! the HTTP layer and the `SQLite` backend depend only on these types.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod identifiers;
pub mod record;
pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use identifiers::BreweryId;
pub use identifiers::OwnerId;
pub use record::Brewery;
pub use record::BreweryHours;
pub use record::SocialLink;
pub use store::BreweryStore;
pub use store::SharedBreweryStore;
pub use store::StoreError;
