//! Place Detective - find every OpenStreetMap place matching a name inside a
//! region, by splitting large areas into Overpass-sized tiles.
//!
//! This library provides the search pipeline and analysis used by the
//! `detective` binary.

pub mod analysis;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod overpass;
pub mod pipeline;
pub mod regions;
pub mod tiling;

pub use analysis::{analyze, find_similar_names, AnalysisReport};
pub use error::{DetectiveError, Result};
pub use models::{GeoArea, MatchMode, Place, SearchSpec, TypeFilter};
pub use overpass::{FetchClient, OverpassClient};
pub use pipeline::{Investigation, Investigator, ProgressSink};
pub use regions::{RegionLookup, RegionTable, Scope};
