//! Normalized place entities.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Type of OSM object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsmType {
    Node,
    Way,
    Relation,
}

impl std::fmt::Display for OsmType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsmType::Node => write!(f, "node"),
            OsmType::Way => write!(f, "way"),
            OsmType::Relation => write!(f, "relation"),
        }
    }
}

/// Geographic point (lat/lon)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Globally unique identity of an OSM element.
///
/// This is the deduplication key: the same element returned by two tiles
/// collapses to one place, regardless of name or coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlaceId {
    pub osm_type: OsmType,
    pub osm_id: i64,
}

impl PlaceId {
    pub fn new(osm_type: OsmType, osm_id: i64) -> Self {
        Self { osm_type, osm_id }
    }
}

impl std::fmt::Display for PlaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.osm_type, self.osm_id)
    }
}

/// Address components
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub housenumber: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postcode: Option<String>,
}

impl Address {
    /// "housenumber, street, district, city" over whichever parts are present.
    pub fn formatted(&self) -> String {
        [
            &self.housenumber,
            &self.street,
            &self.district,
            &self.city,
        ]
        .into_iter()
        .flatten()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
    }

    pub fn is_empty(&self) -> bool {
        self == &Address::default()
    }
}

/// A place as surfaced by an investigation.
///
/// Every optional attribute is `None` when the source element did not carry
/// the tag at all; a tag present with an empty value stays `Some("")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    #[serde(flatten)]
    pub id: PlaceId,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Tag key that classified this place (e.g. "amenity")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Value of the classifying tag (e.g. "restaurant")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    /// Node position, or the server-computed center for ways and relations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub opening_hours: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cuisine: Option<String>,

    /// Every tag of the source element, verbatim
    pub tags: BTreeMap<String, String>,
}

impl Place {
    /// Create a place carrying only its identity.
    pub fn new(id: PlaceId) -> Self {
        Self {
            id,
            name: None,
            category: None,
            subcategory: None,
            location: None,
            address: None,
            phone: None,
            website: None,
            opening_hours: None,
            brand: None,
            cuisine: None,
            tags: BTreeMap::new(),
        }
    }

    /// "{osm_type}/{osm_id}", as used in osm.org URLs
    pub fn source_id(&self) -> String {
        self.id.to_string()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}
