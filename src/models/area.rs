//! Rectangular search areas.

use geo::{Area, Coord, Intersects, Point, Rect};
use serde::Serialize;

use super::GeoPoint;
use crate::error::{DetectiveError, Result};

/// A (south, west, north, east) rectangle in degrees.
///
/// Construction enforces `south < north` and `west < east`, so every
/// `GeoArea` in circulation has a non-zero extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoArea {
    south: f64,
    west: f64,
    north: f64,
    east: f64,
}

impl GeoArea {
    pub fn new(south: f64, west: f64, north: f64, east: f64) -> Result<Self> {
        if ![south, west, north, east].iter().all(|v| v.is_finite()) {
            return Err(DetectiveError::InvalidArea(format!(
                "non-finite coordinate in {},{},{},{}",
                south, west, north, east
            )));
        }
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return Err(DetectiveError::InvalidArea(format!(
                "latitude out of range in {},{},{},{}",
                south, west, north, east
            )));
        }
        if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            return Err(DetectiveError::InvalidArea(format!(
                "longitude out of range in {},{},{},{}",
                south, west, north, east
            )));
        }
        if south >= north || west >= east {
            return Err(DetectiveError::InvalidArea(format!(
                "degenerate rectangle {},{},{},{} (need south < north and west < east)",
                south, west, north, east
            )));
        }
        Ok(Self {
            south,
            west,
            north,
            east,
        })
    }

    /// Parse the "south,west,north,east" form used by Overpass bounding boxes.
    pub fn parse(bbox: &str) -> Result<Self> {
        let parts: Vec<f64> = bbox
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| DetectiveError::InvalidArea(format!("'{}': {}", bbox, e)))?;

        match parts.as_slice() {
            [s, w, n, e] => Self::new(*s, *w, *n, *e),
            _ => Err(DetectiveError::InvalidArea(format!(
                "'{}': expected 4 comma-separated values",
                bbox
            ))),
        }
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Rectangular extent in square degrees.
    pub fn extent(&self) -> f64 {
        self.to_rect().unsigned_area()
    }

    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            Coord {
                x: self.west,
                y: self.south,
            },
            Coord {
                x: self.east,
                y: self.north,
            },
        )
    }

    /// Boundary-inclusive containment check.
    pub fn contains(&self, point: &GeoPoint) -> bool {
        self.to_rect().intersects(&Point::new(point.lon, point.lat))
    }
}

impl std::fmt::Display for GeoArea {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{},{}", self.south, self.west, self.north, self.east)
    }
}

impl From<GeoArea> for Rect<f64> {
    fn from(area: GeoArea) -> Self {
        area.to_rect()
    }
}
