// brewery-core/src/record.rs
// ============================================================================
// Module: Brewery Record
// Description: In-memory representation of a brewery row.
// Purpose: Provide the wire and storage shape shared by store and API.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! [`Brewery`] mirrors one row of the `brewery` table plus three collections
//! (hours, images, socials) that are filled by other collaborators. The core
//! store operations never populate those collections. JSON uses camelCase
//! names and every field is optional on input.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::BreweryId;
use crate::identifiers::OwnerId;

// ============================================================================
// SECTION: Brewery
// ============================================================================

/// Brewery record.
///
/// # Invariants
/// - `brewery_id` is assigned by the store and never changed by updates.
/// - Every string field except `name` may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Brewery {
    /// Store-assigned identifier.
    pub brewery_id: BreweryId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone number.
    pub phone: Option<String>,
    /// Website URL.
    pub website: Option<String>,
    /// Street address line.
    pub street_address: Option<String>,
    /// City.
    pub city: Option<String>,
    /// State or region.
    pub state: Option<String>,
    /// Postal code.
    pub zip: Option<String>,
    /// Free-text history.
    pub history: Option<String>,
    /// Logo reference (path or URL).
    pub logo: Option<String>,
    /// Whether the brewery is currently active.
    pub active: bool,
    /// Whether the brewery serves food.
    pub has_food: bool,
    /// Owning user.
    pub owner_id: OwnerId,
    /// Average beer price, derived elsewhere.
    pub avg_price: f64,
    /// Operating hours.
    pub hours: Vec<BreweryHours>,
    /// Image references.
    pub images: Vec<String>,
    /// Social media links.
    pub socials: Vec<SocialLink>,
}

impl Brewery {
    /// Builds the minimal record accepted by the create operation.
    #[must_use]
    pub fn new(name: impl Into<String>, owner_id: OwnerId) -> Self {
        Self {
            name: name.into(),
            owner_id,
            ..Self::default()
        }
    }
}

// ============================================================================
// SECTION: Collections
// ============================================================================

/// Opening hours for a single day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BreweryHours {
    /// Day label (for example `Monday`).
    pub day_of_week: String,
    /// Opening time, absent when closed.
    pub open: Option<String>,
    /// Closing time, absent when closed.
    pub close: Option<String>,
}

/// Social media link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SocialLink {
    /// Platform label (for example `instagram`).
    pub platform: String,
    /// Profile URL.
    pub url: String,
}
