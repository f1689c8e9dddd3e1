//! Raw Overpass elements to normalized places.

use std::collections::BTreeMap;

use crate::models::{Address, Place};
use crate::overpass::RawRecord;

/// Tag keys that classify a place, checked in this order.
pub const CATEGORY_KEYS: [&str; 6] = [
    "amenity",
    "shop",
    "leisure",
    "tourism",
    "healthcare",
    "education",
];

/// Build a place from a raw record.
///
/// Known tags are lifted into typed fields; the complete tag map is kept
/// verbatim on the place.
pub fn normalize(record: RawRecord) -> Place {
    let mut place = Place::new(record.place_id());
    place.location = record.coordinate;

    let tags = &record.tags;
    place.name = tag(tags, "name");

    if let Some((key, value)) = determine_category(tags) {
        place.category = Some(key.to_string());
        place.subcategory = Some(value.to_string());
    }

    place.address = extract_address(tags);
    place.phone = tag(tags, "phone");
    place.website = tag(tags, "website");
    place.opening_hours = tag(tags, "opening_hours");
    place.brand = tag(tags, "brand");
    place.cuisine = tag(tags, "cuisine");

    place.tags = record.tags;
    place
}

fn tag(tags: &BTreeMap<String, String>, key: &str) -> Option<String> {
    tags.get(key).cloned()
}

/// First classifying key present, with its value
fn determine_category(tags: &BTreeMap<String, String>) -> Option<(&'static str, &str)> {
    CATEGORY_KEYS
        .iter()
        .find_map(|key| tags.get(*key).map(|value| (*key, value.as_str())))
}

fn extract_address(tags: &BTreeMap<String, String>) -> Option<Address> {
    let address = Address {
        housenumber: tag(tags, "addr:housenumber"),
        street: tag(tags, "addr:street"),
        district: tag(tags, "addr:district"),
        city: tag(tags, "addr:city"),
        postcode: tag(tags, "addr:postcode"),
    };
    (!address.is_empty()).then_some(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeoPoint, OsmType, PlaceId};

    fn record(kind: OsmType, id: i64, tags: &[(&str, &str)]) -> RawRecord {
        RawRecord {
            kind,
            id,
            coordinate: Some(GeoPoint {
                lat: 13.7,
                lon: 100.5,
            }),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn test_extracts_known_tags() {
        let place = normalize(record(
            OsmType::Node,
            42,
            &[
                ("name", "McDonald's"),
                ("amenity", "fast_food"),
                ("brand", "McDonald's"),
                ("cuisine", "burger"),
                ("phone", "+66 2 000 0000"),
                ("opening_hours", "24/7"),
                ("addr:street", "Rama I Road"),
                ("addr:city", "Bangkok"),
                ("wheelchair", "yes"),
            ],
        ));

        assert_eq!(place.id, PlaceId::new(OsmType::Node, 42));
        assert_eq!(place.name(), Some("McDonald's"));
        assert_eq!(place.category.as_deref(), Some("amenity"));
        assert_eq!(place.subcategory.as_deref(), Some("fast_food"));
        assert_eq!(place.cuisine.as_deref(), Some("burger"));
        assert_eq!(place.opening_hours.as_deref(), Some("24/7"));
        assert_eq!(
            place.address.as_ref().map(Address::formatted).as_deref(),
            Some("Rama I Road, Bangkok")
        );
        assert_eq!(place.website, None);
        // unknown keys survive in the raw map
        assert_eq!(place.tags.get("wheelchair").map(String::as_str), Some("yes"));
        assert_eq!(place.tags.len(), 9);
    }

    #[test]
    fn test_category_follows_priority_order() {
        let place = normalize(record(
            OsmType::Way,
            7,
            &[("name", "Hotel Cafe"), ("tourism", "hotel"), ("amenity", "cafe")],
        ));
        assert_eq!(place.category.as_deref(), Some("amenity"));
        assert_eq!(place.subcategory.as_deref(), Some("cafe"));

        let place = normalize(record(OsmType::Way, 8, &[("name", "Plain")]));
        assert_eq!(place.category, None);
        assert_eq!(place.subcategory, None);
    }

    #[test]
    fn test_absent_differs_from_empty() {
        let place = normalize(record(OsmType::Node, 1, &[("name", ""), ("website", "")]));
        assert_eq!(place.name.as_deref(), Some(""));
        assert_eq!(place.website.as_deref(), Some(""));
        assert_eq!(place.phone, None);
        assert_eq!(place.address, None);

        let place = normalize(record(OsmType::Node, 2, &[]));
        assert_eq!(place.name, None);
    }
}
