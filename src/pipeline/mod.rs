//! Tiled investigation pipeline.
//!
//! Partitions the search area, fetches each tile with retry, normalizes the
//! returned elements and collapses duplicates seen by more than one tile.

mod orchestrator;
mod place_set;
mod progress;
mod retry;

pub use orchestrator::{Investigation, InvestigationSettings, Investigator, TileFailure};
pub use place_set::PlaceSet;
pub use progress::{NoProgress, ProgressEvent, ProgressSink, TileOutcome, TileState};
pub use retry::RetryPolicy;
