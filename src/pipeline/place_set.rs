//! Cross-tile deduplication.

use hashbrown::HashSet;

use crate::models::{Place, PlaceId};

/// Insertion-ordered collection of places, unique by `PlaceId`.
///
/// Policy is first-seen-wins: a later sighting of an identity already in the
/// set is dropped as-is, without merging any of its attributes.
#[derive(Debug, Default)]
pub struct PlaceSet {
    seen: HashSet<PlaceId>,
    places: Vec<Place>,
    duplicates: usize,
}

impl PlaceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `id` has already been accepted.
    pub fn contains(&self, id: &PlaceId) -> bool {
        self.seen.contains(id)
    }

    /// Add a place. Returns `false` (and discards it) if its identity was
    /// already present.
    pub fn insert(&mut self, place: Place) -> bool {
        if self.seen.insert(place.id) {
            self.places.push(place);
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Number of sightings discarded as duplicates
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn into_places(self) -> Vec<Place> {
        self.places
    }
}
