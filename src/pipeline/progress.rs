//! Per-tile progress notifications.

use serde::Serialize;

use crate::models::GeoArea;

/// Lifecycle of a single tile.
///
/// `Pending -> Fetching -> {Succeeded | Retrying -> Fetching | Failed}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileState {
    Pending,
    Fetching { attempt: u32 },
    Retrying { attempt: u32 },
    Succeeded,
    Failed,
}

impl TileState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TileState::Succeeded | TileState::Failed)
    }
}

/// How a tile finished.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TileOutcome {
    Succeeded { records: usize, attempts: u32 },
    Failed { reason: String, attempts: u32 },
}

impl TileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TileOutcome::Succeeded { .. })
    }
}

/// Emitted once per tile when it reaches a terminal state, in completion order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvent {
    /// Zero-based tile index in partition order
    pub index: usize,
    pub total: usize,
    pub area: GeoArea,
    pub outcome: TileOutcome,
}

/// Receiver for progress events. Purely observational.
pub trait ProgressSink {
    fn on_tile(&self, event: &ProgressEvent);
}

impl<F> ProgressSink for F
where
    F: Fn(&ProgressEvent),
{
    fn on_tile(&self, event: &ProgressEvent) {
        self(event)
    }
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn on_tile(&self, _event: &ProgressEvent) {}
}
