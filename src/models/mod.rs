//! Core data models for investigations.

pub mod area;
pub mod place;
pub mod search;

pub use area::GeoArea;
pub use place::{Address, GeoPoint, OsmType, Place, PlaceId};
pub use search::{MatchMode, SearchSpec, SearchSpecBuilder, TypeFilter};
