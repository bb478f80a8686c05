//! Static "nearby city" tiers.

use impact_types::Cause;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Normalized form of a city label: trimmed and lowercased.
pub fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

/// City label → ordered set of nearby city labels, the city itself first.
///
/// Lookups never fail: a city without an entry resolves to itself alone.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, Vec<String>>", into = "BTreeMap<String, Vec<String>>")]
pub struct GeographyTiers {
    tiers: HashMap<String, Vec<String>>,
}

impl GeographyTiers {
    /// An empty table; every city resolves to the singleton containing itself.
    pub fn empty() -> Self {
        Self {
            tiers: HashMap::new(),
        }
    }

    /// Register `city` with its neighbours. The city itself is always placed
    /// first and duplicates are dropped, keeping first-seen order.
    pub fn insert<I, S>(&mut self, city: &str, nearby: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let key = normalize_city(city);
        let mut ordered = vec![key.clone()];
        for neighbour in nearby {
            let neighbour = normalize_city(neighbour.as_ref());
            if !neighbour.is_empty() && !ordered.contains(&neighbour) {
                ordered.push(neighbour);
            }
        }
        self.tiers.insert(key, ordered);
    }

    pub fn contains(&self, city: &str) -> bool {
        self.tiers.contains_key(&normalize_city(city))
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Normalized candidate city set for `city`.
    pub fn nearby(&self, city: &str) -> Vec<String> {
        let key = normalize_city(city);
        match self.tiers.get(&key) {
            Some(cities) => cities.clone(),
            None => vec![key],
        }
    }

    /// Cause cities that have no entry, normalized and deduplicated.
    pub fn uncovered(&self, causes: &[Cause]) -> Vec<String> {
        let mut missing = Vec::new();
        for cause in causes {
            let city = normalize_city(&cause.city);
            if !self.tiers.contains_key(&city) && !missing.contains(&city) {
                missing.push(city);
            }
        }
        missing
    }

    /// Give every uncovered cause city its singleton entry. Returns the
    /// cities that were added.
    pub fn ensure_covers(&mut self, causes: &[Cause]) -> Vec<String> {
        let missing = self.uncovered(causes);
        for city in &missing {
            self.tiers.insert(city.clone(), vec![city.clone()]);
        }
        missing
    }
}

impl Default for GeographyTiers {
    /// The metro table the platform launched with.
    fn default() -> Self {
        let mut tiers = Self::empty();
        tiers.insert("Bangalore", ["Chennai", "Hyderabad", "Pune"]);
        tiers.insert("Mumbai", ["Pune", "Surat"]);
        tiers.insert("Delhi", ["Lucknow", "Jaipur"]);
        tiers.insert("Chennai", ["Bangalore", "Hyderabad"]);
        tiers.insert("Pune", ["Mumbai", "Bangalore"]);
        tiers.insert("Kolkata", ["Lucknow"]);
        tiers.insert("Hyderabad", ["Chennai", "Bangalore"]);
        tiers.insert("Jaipur", ["Delhi", "Lucknow"]);
        tiers.insert("Lucknow", ["Delhi", "Kolkata", "Jaipur"]);
        tiers.insert("Surat", ["Mumbai"]);
        tiers
    }
}

impl From<BTreeMap<String, Vec<String>>> for GeographyTiers {
    fn from(value: BTreeMap<String, Vec<String>>) -> Self {
        let mut tiers = Self::empty();
        for (city, nearby) in value {
            tiers.insert(&city, nearby);
        }
        tiers
    }
}

impl From<GeographyTiers> for BTreeMap<String, Vec<String>> {
    fn from(value: GeographyTiers) -> Self {
        value.tiers.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_places_city_first() {
        let tiers = GeographyTiers::default();
        assert_eq!(
            tiers.nearby("Bangalore"),
            vec!["bangalore", "chennai", "hyderabad", "pune"]
        );
        assert_eq!(tiers.nearby("  surat "), vec!["surat", "mumbai"]);
        assert_eq!(tiers.len(), 10);
    }

    #[test]
    fn unknown_city_resolves_to_itself() {
        let tiers = GeographyTiers::default();
        assert!(!tiers.contains("Mysore"));
        assert_eq!(tiers.nearby("Mysore"), vec!["mysore"]);
    }

    #[test]
    fn insert_dedups_and_keeps_self_first() {
        let mut tiers = GeographyTiers::empty();
        tiers.insert("Goa", ["Pune", "goa", "PUNE", "", "Mumbai"]);
        assert_eq!(tiers.nearby("goa"), vec!["goa", "pune", "mumbai"]);
    }

    #[test]
    fn ensure_covers_adds_singletons_for_cause_cities() {
        let causes = vec![
            Cause::new("c-1", "a", "a", "x", "Mysore", "o"),
            Cause::new("c-2", "b", "b", "x", "mysore", "o"),
            Cause::new("c-3", "c", "c", "x", "Pune", "o"),
        ];
        let mut tiers = GeographyTiers::default();
        assert_eq!(tiers.uncovered(&causes), vec!["mysore"]);

        let added = tiers.ensure_covers(&causes);
        assert_eq!(added, vec!["mysore"]);
        assert!(tiers.uncovered(&causes).is_empty());
        assert_eq!(tiers.nearby("Mysore"), vec!["mysore"]);
    }

    #[test]
    fn deserializes_from_plain_map() {
        let tiers: GeographyTiers =
            serde_json::from_str(r#"{"Goa": ["Pune"], "Pune": ["Goa", "Mumbai"]}"#).unwrap();
        assert_eq!(tiers.nearby("goa"), vec!["goa", "pune"]);
        assert_eq!(tiers.nearby("Pune"), vec!["pune", "goa", "mumbai"]);
    }
}
