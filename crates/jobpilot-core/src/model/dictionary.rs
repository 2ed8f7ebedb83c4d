//! Search dictionaries and the area tree.

use serde::{Deserialize, Serialize};

/// Area id of Russia in the hh.ru area tree.
pub const RUSSIA_AREA_ID: &str = "113";

/// One selectable filter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryItem {
    /// Value sent to search.
    pub id: String,
    /// Display name.
    pub name: String,
}

/// Filter vocabularies from `GET /api/dictionaries`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dictionaries {
    /// Experience levels.
    #[serde(default)]
    pub experience: Vec<DictionaryItem>,
    /// Employment types.
    #[serde(default)]
    pub employment: Vec<DictionaryItem>,
    /// Work schedules.
    #[serde(default)]
    pub schedule: Vec<DictionaryItem>,
}

/// Node of the area tree from `GET /api/areas`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Area {
    /// Area identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Parent area, absent for countries.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Child areas.
    #[serde(default)]
    pub areas: Vec<Area>,
}

impl Area {
    /// Name for a flat picker: nested areas get a leading dash.
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.parent_id.is_some() {
            format!("— {}", self.name)
        } else {
            self.name.clone()
        }
    }

    fn leaf(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: self.name.clone(),
            parent_id: self.parent_id.clone(),
            areas: Vec::new(),
        }
    }
}

/// Flattens the regions and cities of one country, region first followed by
/// its cities. Returns an empty list if the country is absent.
#[must_use]
pub fn flatten_country_areas(areas: &[Area], country_id: &str) -> Vec<Area> {
    let Some(country) = areas.iter().find(|a| a.id == country_id) else {
        return Vec::new();
    };

    let mut flat = Vec::new();
    for region in &country.areas {
        flat.push(region.leaf());
        flat.extend(region.areas.iter().map(Area::leaf));
    }
    flat
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tree() -> Vec<Area> {
        serde_json::from_str(
            r#"[
                {"id": "113", "name": "Russia", "areas": [
                    {"id": "1", "name": "Moscow", "parent_id": "113"},
                    {"id": "1620", "name": "Mari El", "parent_id": "113", "areas": [
                        {"id": "1621", "name": "Yoshkar-Ola", "parent_id": "1620"}
                    ]}
                ]},
                {"id": "40", "name": "Kazakhstan", "areas": []}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_flatten_russian_areas() {
        let flat = flatten_country_areas(&tree(), RUSSIA_AREA_ID);
        let ids: Vec<&str> = flat.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1620", "1621"]);
        assert!(flat.iter().all(|a| a.areas.is_empty()));
    }

    #[test]
    fn test_flatten_missing_country() {
        assert!(flatten_country_areas(&tree(), "999").is_empty());
    }

    #[test]
    fn test_display_name() {
        let tree = tree();
        assert_eq!(tree[0].display_name(), "Russia");
        assert_eq!(tree[0].areas[0].display_name(), "— Moscow");
    }

    #[test]
    fn test_dictionaries_default_missing_lists() {
        let dict: Dictionaries =
            serde_json::from_str(r#"{"experience":[{"id":"noExperience","name":"None"}]}"#).unwrap();
        assert_eq!(dict.experience.len(), 1);
        assert!(dict.schedule.is_empty());
    }
}
