use std::collections::BTreeSet;

use serde_json::Value;

use crate::document::DocumentExt;
use crate::item::{Item, ItemParams};

const EMBEDDED: &str = "_embedded";
const VENUES: &str = "venues";
const ADDRESS: &str = "address";
const ADDRESS_LINES: [&str; 3] = ["line1", "line2", "line3"];
const CITY: &str = "city";
const NAME: &str = "name";
const IMAGES: &str = "images";
const URL: &str = "url";
const CLASSIFICATIONS: &str = "classifications";
const SEGMENT: &str = "segment";

/// Maps one raw provider event onto an [`Item`]. Never fails: each field rule resolves to
/// its default independently of the others.
pub fn normalize(event: &Value) -> Item {
    Item::new(ItemParams {
        item_id: Some(event.str_or_default("id")),
        name: Some(event.str_or_default(NAME)),
        rating: Some(event.f64_or_default("rating")),
        address: Some(extract_address(event)),
        image_url: Some(extract_image_url(event)),
        url: Some(event.str_or_default(URL)),
        distance: Some(event.f64_or_default("distance")),
        categories: Some(extract_categories(event)),
    })
}

/// First venue whose street lines or city produce a non-empty address.
pub fn extract_address(event: &Value) -> String {
    event
        .array_at(&[EMBEDDED, VENUES])
        .iter()
        .map(venue_address)
        .find(|candidate| !candidate.is_empty())
        .unwrap_or_default()
}

fn venue_address(venue: &Value) -> String {
    let mut address = String::new();
    if let Some(lines) = venue.field(ADDRESS) {
        for (index, key) in ADDRESS_LINES.iter().enumerate() {
            let Some(line) = lines.field(key).and_then(Value::as_str) else {
                continue;
            };
            // line1 is appended bare; later lines are always newline-prefixed
            if index > 0 {
                address.push('\n');
            }
            address.push_str(line);
        }
    }
    if let Some(city) = venue.path(&[CITY, NAME]).and_then(Value::as_str) {
        address.push('\n');
        address.push_str(city);
    }
    address
}

pub fn extract_image_url(event: &Value) -> String {
    event
        .array_at(&[IMAGES])
        .iter()
        .find_map(|image| image.field(URL).and_then(Value::as_str))
        .map(str::to_string)
        .unwrap_or_default()
}

pub fn extract_categories(event: &Value) -> BTreeSet<String> {
    event
        .array_at(&[CLASSIFICATIONS])
        .iter()
        .filter_map(|classification| classification.path(&[SEGMENT, NAME]))
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn skips_venues_without_address_data() {
        let event = json!({
            "_embedded": {
                "venues": [
                    { "address": {} },
                    { "address": { "line1": "221B Baker St" }, "city": { "name": "London" } }
                ]
            }
        });
        assert_eq!(extract_address(&event), "221B Baker St\nLondon");
    }

    #[test]
    fn joins_every_present_street_line() {
        let event = json!({
            "_embedded": {
                "venues": [{
                    "address": { "line1": "1 Main St", "line2": "Suite 4", "line3": "Rear entrance" },
                    "city": { "name": "Houston" }
                }]
            }
        });
        assert_eq!(
            extract_address(&event),
            "1 Main St\nSuite 4\nRear entrance\nHouston"
        );
    }

    #[test]
    fn city_only_venue_keeps_leading_newline() {
        let event = json!({
            "_embedded": { "venues": [{ "city": { "name": "Austin" } }] }
        });
        assert_eq!(extract_address(&event), "\nAustin");
    }

    #[test]
    fn first_populated_venue_wins() {
        let event = json!({
            "_embedded": {
                "venues": [
                    { "address": { "line1": "First" } },
                    { "address": { "line1": "Second" } }
                ]
            }
        });
        assert_eq!(extract_address(&event), "First");
    }

    #[test]
    fn address_is_empty_without_venues() {
        assert_eq!(extract_address(&json!({})), "");
        assert_eq!(extract_address(&json!({ "_embedded": {} })), "");
        assert_eq!(extract_address(&json!({ "_embedded": { "venues": [{}] } })), "");
    }

    #[test]
    fn malformed_lines_do_not_mask_later_venues() {
        let event = json!({
            "_embedded": {
                "venues": [
                    { "address": { "line2": 7, "line3": false }, "city": { "name": 12 } },
                    { "address": { "line1": "Real St" } }
                ]
            }
        });
        assert_eq!(extract_address(&event), "Real St");

        let partial = json!({
            "_embedded": {
                "venues": [{ "address": { "line1": "9 Oak Ave", "line2": {} }, "city": { "name": "Dallas" } }]
            }
        });
        assert_eq!(extract_address(&partial), "9 Oak Ave\nDallas");
    }

    #[test]
    fn skips_images_with_non_string_url() {
        let event = json!({
            "images": [{ "url": 404 }, { "url": ["x"] }, { "url": "http://good" }]
        });
        assert_eq!(extract_image_url(&event), "http://good");
    }

    #[test]
    fn picks_first_image_with_url() {
        let event = json!({
            "images": [{}, { "url": "http://a" }, { "url": "http://b" }]
        });
        assert_eq!(extract_image_url(&event), "http://a");
        assert_eq!(extract_image_url(&json!({ "images": [{ "url": null }] })), "");
        assert_eq!(extract_image_url(&json!({})), "");
    }

    #[test]
    fn deduplicates_segment_names() {
        let event = json!({
            "classifications": [
                { "segment": { "name": "Music" } },
                { "segment": { "name": "Music" } },
                { "segment": { "name": "Sports" } },
                { "segment": {} },
                { "genre": { "name": "Rock" } }
            ]
        });
        let categories = extract_categories(&event);
        assert_eq!(categories.len(), 2);
        assert!(categories.contains("Music"));
        assert!(categories.contains("Sports"));
    }

    #[test]
    fn missing_numeric_fields_default_to_zero() {
        let item = normalize(&json!({ "id": "abc", "name": "Show" }));
        assert_eq!(item.rating(), 0.0);
        assert_eq!(item.distance(), 0.0);
        assert_eq!(item.item_id(), "abc");
        assert_eq!(item.name(), "Show");
        assert_eq!(item.url(), "");
    }

    #[test]
    fn malformed_field_does_not_discard_event() {
        let item = normalize(&json!({
            "id": "abc",
            "rating": "excellent",
            "distance": 3.2,
            "url": "https://tickets/abc"
        }));
        assert_eq!(item.rating(), 0.0);
        assert_eq!(item.distance(), 3.2);
        assert_eq!(item.url(), "https://tickets/abc");
    }

    #[test]
    fn normalizing_twice_is_idempotent() {
        let event = json!({
            "id": "Z7r9jZ1AdbxYe",
            "name": "Jazz Night",
            "rating": 4.0,
            "distance": 1.7,
            "images": [{ "url": "http://img" }],
            "classifications": [{ "segment": { "name": "Music" } }],
            "_embedded": { "venues": [{ "address": { "line1": "5 Elm" } }] }
        });
        let before = event.clone();
        assert_eq!(normalize(&event), normalize(&event));
        assert_eq!(event, before);
    }
}
