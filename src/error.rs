//! Error taxonomy shared by every stage of an investigation.

use thiserror::Error;

use crate::models::GeoArea;
use crate::regions::Scope;

pub type Result<T> = std::result::Result<T, DetectiveError>;

#[derive(Debug, Clone, Error)]
pub enum DetectiveError {
    /// Bad geometry input, or an unusable tile budget.
    #[error("invalid area: {0}")]
    InvalidArea(String),

    #[error("unknown region '{name}' ({scope} scope)")]
    UnknownRegion { name: String, scope: Scope },

    /// Connection failure, timeout, or an overloaded service. Retried with backoff.
    #[error("network error for area {area}: {message}")]
    Network { area: GeoArea, message: String },

    /// Malformed or error response. Never retried.
    #[error("service error for area {area}: {message}")]
    Service { area: GeoArea, message: String },

    #[error("invalid search: {0}")]
    InvalidSearchSpec(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl DetectiveError {
    /// Whether another attempt at the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, DetectiveError::Network { .. })
    }

    /// The area a failed fetch was issued for, if this is a fetch error.
    pub fn area(&self) -> Option<&GeoArea> {
        match self {
            DetectiveError::Network { area, .. } | DetectiveError::Service { area, .. } => {
                Some(area)
            }
            _ => None,
        }
    }
}
