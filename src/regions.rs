//! Named search regions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::error::{DetectiveError, Result};
use crate::models::GeoArea;

/// Whether a region name means the city proper or its surrounding province.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    City,
    Province,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::City => write!(f, "city"),
            Scope::Province => write!(f, "province"),
        }
    }
}

impl FromStr for Scope {
    type Err = DetectiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "city" => Ok(Scope::City),
            "province" => Ok(Scope::Province),
            other => Err(DetectiveError::Config(format!(
                "unknown scope '{}', expected 'city' or 'province'",
                other
            ))),
        }
    }
}

/// Resolves a region name to a bounding box.
pub trait RegionLookup {
    fn lookup(&self, name: &str, scope: Scope) -> Result<GeoArea>;
}

/// (name, city bounds, province bounds), bounds as south, west, north, east
const BUILTIN: &[(&str, [f64; 4], [f64; 4])] = &[
    ("bangkok", [13.5, 100.1, 14.2, 100.9], [13.4, 100.0, 14.3, 101.0]),
    ("chiangmai", [18.6, 98.8, 19.0, 99.1], [17.8, 97.8, 20.5, 99.6]),
    ("phuket", [7.7, 98.2, 8.3, 98.5], [7.6, 98.1, 8.4, 98.6]),
    ("pattaya", [12.8, 100.8, 13.1, 101.0], [12.5, 100.5, 13.4, 101.2]),
    ("chiangrai", [19.8, 99.7, 20.0, 100.2], [19.3, 99.4, 20.5, 100.5]),
    ("hatyai", [6.9, 100.4, 7.1, 100.6], [6.6, 100.1, 7.3, 100.8]),
    ("korat", [14.8, 102.0, 15.0, 102.2], [14.2, 101.5, 15.8, 102.8]),
    ("thailand", [5.6, 97.3, 20.5, 105.6], [5.6, 97.3, 20.5, 105.6]),
];

/// In-memory region table. Names are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct RegionTable {
    entries: BTreeMap<(String, Scope), GeoArea>,
}

impl RegionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Thai cities and provinces known out of the box.
    pub fn builtin() -> Result<Self> {
        let mut table = Self::new();
        for (name, city, province) in BUILTIN {
            let [s, w, n, e] = *city;
            table.insert(name, Scope::City, GeoArea::new(s, w, n, e)?);
            let [s, w, n, e] = *province;
            table.insert(name, Scope::Province, GeoArea::new(s, w, n, e)?);
        }
        Ok(table)
    }

    /// Add or replace a region.
    pub fn insert(&mut self, name: &str, scope: Scope, area: GeoArea) -> Option<GeoArea> {
        self.entries.insert((normalize_name(name), scope), area)
    }

    /// Distinct region names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(|(n, _)| n.as_str()).collect();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RegionLookup for RegionTable {
    fn lookup(&self, name: &str, scope: Scope) -> Result<GeoArea> {
        self.entries
            .get(&(normalize_name(name), scope))
            .copied()
            .ok_or_else(|| DetectiveError::UnknownRegion {
                name: name.to_string(),
                scope,
            })
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}
