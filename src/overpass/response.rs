//! Overpass JSON response model.

use serde::Deserialize;
use std::collections::BTreeMap;

use crate::error::{DetectiveError, Result};
use crate::models::{GeoArea, GeoPoint, OsmType, PlaceId};

/// One element as received from a tile fetch, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub kind: OsmType,
    pub id: i64,
    /// Node position, or the `center` Overpass computed for a way/relation
    pub coordinate: Option<GeoPoint>,
    pub tags: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn place_id(&self) -> PlaceId {
        PlaceId::new(self.kind, self.id)
    }
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
    #[serde(default)]
    remark: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: OsmType,
    id: i64,
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<GeoPoint>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

impl From<OverpassElement> for RawRecord {
    fn from(element: OverpassElement) -> Self {
        let coordinate = match (element.lat, element.lon) {
            (Some(lat), Some(lon)) => Some(GeoPoint { lat, lon }),
            _ => element.center,
        };
        Self {
            kind: element.kind,
            id: element.id,
            coordinate,
            tags: element.tags,
        }
    }
}

/// Decode a complete Overpass JSON payload.
///
/// Anything other than a well-formed document with an `elements` array is a
/// service error; so is a runtime-error remark, since Overpass then returns
/// a truncated element list.
pub fn parse(body: &[u8], area: &GeoArea) -> Result<Vec<RawRecord>> {
    let response: OverpassResponse =
        serde_json::from_slice(body).map_err(|e| DetectiveError::Service {
            area: *area,
            message: format!("malformed Overpass response: {}", e),
        })?;

    if let Some(remark) = response.remark.as_deref() {
        if remark.contains("error") {
            return Err(DetectiveError::Service {
                area: *area,
                message: format!("Overpass reported: {}", remark.trim()),
            });
        }
    }

    Ok(response.elements.into_iter().map(RawRecord::from).collect())
}
