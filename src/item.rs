use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A normalized event, fully populated with defaults.
///
/// Identity is `item_id`. Strings default to empty and numbers to `0.0`, so a value with
/// every field at its default is a legal, maximally degraded record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    item_id: String,
    name: String,
    rating: f64,
    address: String,
    image_url: String,
    url: String,
    distance: f64,
    categories: BTreeSet<String>,
}

/// Optional inputs for [`Item::new`]; anything left as `None` takes the item default.
#[derive(Debug, Clone, Default)]
pub struct ItemParams {
    pub item_id: Option<String>,
    pub name: Option<String>,
    pub rating: Option<f64>,
    pub address: Option<String>,
    pub image_url: Option<String>,
    pub url: Option<String>,
    pub distance: Option<f64>,
    pub categories: Option<BTreeSet<String>>,
}

impl Item {
    pub fn new(params: ItemParams) -> Self {
        Self {
            item_id: params.item_id.unwrap_or_default(),
            name: params.name.unwrap_or_default(),
            rating: finite_or_zero(params.rating),
            address: params.address.unwrap_or_default(),
            image_url: params.image_url.unwrap_or_default(),
            url: params.url.unwrap_or_default(),
            distance: finite_or_zero(params.distance),
            categories: params.categories.unwrap_or_default(),
        }
    }

    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn distance(&self) -> f64 {
        self.distance
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }
}

impl Default for Item {
    fn default() -> Self {
        Self::new(ItemParams::default())
    }
}

fn finite_or_zero(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_params_produce_defaults() {
        let item = Item::new(ItemParams::default());
        assert_eq!(item.item_id(), "");
        assert_eq!(item.name(), "");
        assert_eq!(item.rating(), 0.0);
        assert_eq!(item.distance(), 0.0);
        assert!(item.categories().is_empty());
        assert_eq!(item, Item::default());
    }

    #[test]
    fn keeps_supplied_values() {
        let item = Item::new(ItemParams {
            item_id: Some("vvG1".into()),
            name: Some("Astros vs Rangers".into()),
            rating: Some(4.5),
            categories: Some(["Sports".to_string()].into_iter().collect()),
            ..ItemParams::default()
        });
        assert_eq!(item.item_id(), "vvG1");
        assert_eq!(item.rating(), 4.5);
        assert!(item.categories().contains("Sports"));
        assert_eq!(item.url(), "");
    }

    #[test]
    fn serializes_with_storage_field_names() {
        let item = Item::new(ItemParams {
            item_id: Some("id-1".into()),
            image_url: Some("http://img".into()),
            ..ItemParams::default()
        });
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["item_id"], "id-1");
        assert_eq!(value["image_url"], "http://img");
        assert!(value["categories"].as_array().unwrap().is_empty());
    }
}
