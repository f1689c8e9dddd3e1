use hashbrown::HashMap;
use serde::Serialize;
use std::collections::BTreeMap;

use super::similarity::similarity;
use crate::models::{Place, SearchSpec};

/// Two different names judged to be spellings of the same thing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameVariation {
    pub name_a: String,
    pub name_b: String,
    pub similarity: u8,
    /// Indices into the analyzed place slice carrying `name_a`
    pub places_a: Vec<usize>,
    pub places_b: Vec<usize>,
}

/// Groupings derived from a finished set of places. Holds indices, not places.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisReport {
    pub total_places: usize,
    pub unique_names: usize,
    /// Names carried by two or more places, with the indices of those places
    pub multiple_locations: BTreeMap<String, Vec<usize>>,
    pub name_variations: Vec<NameVariation>,
}

impl AnalysisReport {
    /// Places named in a group, in input order.
    pub fn resolve<'a>(
        places: &'a [Place],
        indices: &'a [usize],
    ) -> impl Iterator<Item = &'a Place> {
        indices.iter().filter_map(move |&i| places.get(i))
    }

    pub fn has_findings(&self) -> bool {
        !self.multiple_locations.is_empty() || !self.name_variations.is_empty()
    }
}

/// Group places sharing a name and, when fuzzy matching is on, pair up
/// distinct names that look alike.
pub fn analyze(places: &[Place], spec: &SearchSpec) -> AnalysisReport {
    // first-seen order keeps the variation list stable across runs
    let mut order: Vec<&str> = Vec::new();
    let mut by_name: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, place) in places.iter().enumerate() {
        let Some(name) = place.name() else { continue };
        by_name
            .entry(name)
            .or_insert_with(|| {
                order.push(name);
                Vec::new()
            })
            .push(index);
    }

    let multiple_locations = by_name
        .iter()
        .filter(|(_, indices)| indices.len() >= 2)
        .map(|(name, indices)| (name.to_string(), indices.clone()))
        .collect();

    let mut name_variations = Vec::new();
    if spec.fuzzy_enabled() {
        let threshold = spec.fuzzy_threshold();
        for (i, name_a) in order.iter().enumerate() {
            for name_b in &order[i + 1..] {
                let score = similarity(name_a, name_b);
                if score < threshold {
                    continue;
                }
                name_variations.push(NameVariation {
                    name_a: name_a.to_string(),
                    name_b: name_b.to_string(),
                    similarity: score,
                    places_a: by_name.get(name_a).cloned().unwrap_or_default(),
                    places_b: by_name.get(name_b).cloned().unwrap_or_default(),
                });
            }
        }
    }

    AnalysisReport {
        total_places: places.len(),
        unique_names: order.len(),
        multiple_locations,
        name_variations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MatchMode, OsmType, PlaceId};

    fn named(id: i64, name: Option<&str>) -> Place {
        let mut place = Place::new(PlaceId::new(OsmType::Node, id));
        place.name = name.map(str::to_string);
        place
    }

    fn spec(threshold: i64) -> SearchSpec {
        SearchSpec::builder("Starbucks", MatchMode::Partial)
            .fuzzy_threshold(threshold)
            .build()
            .unwrap()
    }

    #[test]
    fn test_groups_repeated_names() {
        let places = vec![
            named(1, Some("A")),
            named(2, Some("A")),
            named(3, Some("B")),
            named(4, None),
        ];
        let report = analyze(&places, &spec(85));

        assert_eq!(report.total_places, 4);
        assert_eq!(report.unique_names, 2);
        assert_eq!(report.multiple_locations.len(), 1);
        assert_eq!(report.multiple_locations["A"], vec![0, 1]);
        assert!(!report.multiple_locations.contains_key("B"));
    }

    #[test]
    fn test_grouping_is_case_sensitive() {
        let places = vec![named(1, Some("Big C")), named(2, Some("BIG C"))];
        let report = analyze(&places, &spec(85));
        assert!(report.multiple_locations.is_empty());
        // but they are reported as variations of each other
        assert_eq!(report.name_variations.len(), 1);
        assert_eq!(report.name_variations[0].similarity, 100);
    }

    #[test]
    fn test_transposed_name_respects_threshold() {
        let places = vec![
            named(1, Some("Starbucks")),
            named(2, Some("Starbucks")),
            named(3, Some("Strabucks")),
        ];

        let report = analyze(&places, &spec(85));
        assert_eq!(
            report.name_variations,
            vec![NameVariation {
                name_a: "Starbucks".into(),
                name_b: "Strabucks".into(),
                similarity: 89,
                places_a: vec![0, 1],
                places_b: vec![2],
            }]
        );

        let strict = analyze(&places, &spec(99));
        assert!(strict.name_variations.is_empty());
        assert_eq!(strict.multiple_locations["Starbucks"], vec![0, 1]);
    }

    #[test]
    fn test_reordered_tokens_are_variations() {
        let places = vec![
            named(1, Some("Store A Branch B")),
            named(2, Some("Branch B Store A")),
        ];
        let report = analyze(&places, &spec(90));
        assert_eq!(report.name_variations.len(), 1);
        assert_eq!(report.name_variations[0].similarity, 100);
    }

    #[test]
    fn test_fuzzy_disabled_skips_variations() {
        let spec = SearchSpec::builder("Starbucks", MatchMode::Partial)
            .fuzzy(false)
            .build()
            .unwrap();
        let places = vec![named(1, Some("Starbucks")), named(2, Some("Strabucks"))];
        let report = analyze(&places, &spec);
        assert!(report.name_variations.is_empty());
        assert!(!report.has_findings());
    }

    #[test]
    fn test_analysis_is_repeatable() {
        let places = vec![
            named(1, Some("Starbucks")),
            named(2, Some("Strabucks")),
            named(3, Some("Starbucks")),
            named(4, Some("Starbuck")),
        ];
        let spec = spec(80);
        assert_eq!(analyze(&places, &spec), analyze(&places, &spec));
    }

    #[test]
    fn test_resolve_maps_indices_back_to_places() {
        let places = vec![named(10, Some("A")), named(11, Some("B")), named(12, Some("A"))];
        let report = analyze(&places, &spec(85));
        let ids: Vec<i64> = AnalysisReport::resolve(&places, &report.multiple_locations["A"])
            .map(|p| p.id.osm_id)
            .collect();
        assert_eq!(ids, vec![10, 12]);
    }

    #[test]
    fn test_empty_input() {
        let report = analyze(&[], &spec(85));
        assert_eq!(report.total_places, 0);
        assert_eq!(report.unique_names, 0);
        assert!(!report.has_findings());
    }
}
