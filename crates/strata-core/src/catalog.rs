//! Feature catalogs
//!
//! A catalog maps canonical feature names to features. It is persisted as a
//! JSON object, one file per topic, and read back many times by the builder
//! and by selection tooling.

use crate::error::{CoreError, Result};
use crate::expr::Feature;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Append-only mapping from canonical name to feature
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCatalog {
    features: BTreeMap<String, Feature>,
}

impl FeatureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a feature under its canonical name.
    ///
    /// Returns `false` if the name is already taken; the first feature wins.
    pub fn insert(&mut self, feature: Feature) -> bool {
        if self.features.contains_key(feature.name()) {
            return false;
        }
        self.features.insert(feature.name().to_string(), feature);
        true
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    /// Features in name order
    pub fn features(&self) -> impl Iterator<Item = &Feature> {
        self.features.values()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.features.keys().map(String::as_str)
    }

    /// Features for the given names, in the given order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Feature>> {
        names
            .iter()
            .map(|name| {
                self.features
                    .get(name.as_ref())
                    .cloned()
                    .ok_or_else(|| CoreError::FeatureNotFound(name.as_ref().to_string()))
            })
            .collect()
    }

    /// Keep only the selected names. Returns how many features were dropped.
    pub fn retain(&mut self, selection: &HashSet<String>) -> usize {
        let before = self.features.len();
        self.features.retain(|name, _| selection.contains(name));
        before - self.features.len()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a catalog, re-keying every feature by its recomputed name.
    pub fn from_json(content: &str) -> Result<Self> {
        let raw: BTreeMap<String, Feature> = serde_json::from_str(content)?;
        let mut catalog = Self::new();
        for (key, feature) in raw {
            if key != feature.name() {
                log::warn!(
                    "catalog key '{}' does not match derived name '{}'",
                    key,
                    feature.name()
                );
            }
            if !catalog.insert(feature) {
                log::debug!("dropping duplicate feature under key '{}'", key);
            }
        }
        Ok(catalog)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&content)?;
        log::debug!(
            "loaded {} features from {}",
            catalog.len(),
            path.display()
        );
        Ok(catalog)
    }

    /// Write the catalog, creating parent directories as needed.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        log::debug!("saved {} features to {}", self.len(), path.display());
        Ok(())
    }
}

impl FromIterator<Feature> for FeatureCatalog {
    fn from_iter<T: IntoIterator<Item = Feature>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for feature in iter {
            catalog.insert(feature);
        }
        catalog
    }
}

impl Extend<Feature> for FeatureCatalog {
    fn extend<T: IntoIterator<Item = Feature>>(&mut self, iter: T) {
        for feature in iter {
            self.insert(feature);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{logic, Aggregation, Column, Filter};
    use crate::types::DataType;

    fn count_feature(column: &str, topic: &str) -> Feature {
        let col = Column::field(column, DataType::Integer);
        let agg = Aggregation::on(&col, logic::COUNT, DataType::Integer);
        Feature::new(DataType::Integer, topic, agg, Vec::<Filter>::new())
    }

    #[test]
    fn test_insert_dedups_by_name() {
        let mut catalog = FeatureCatalog::new();
        assert!(catalog.insert(count_feature("a_1L", "person")));
        assert!(!catalog.insert(count_feature("a_1L", "applprev")));
        assert_eq!(catalog.len(), 1);
        assert_eq!(
            catalog.features().next().map(Feature::topic),
            Some("person")
        );
    }

    #[test]
    fn test_select_unknown_name() {
        let catalog: FeatureCatalog = vec![count_feature("a_1L", "person")].into_iter().collect();
        let err = catalog.select(&["nope"]).unwrap_err();
        assert!(matches!(err, CoreError::FeatureNotFound(name) if name == "nope"));
    }

    #[test]
    fn test_retain() {
        let mut catalog: FeatureCatalog = vec![
            count_feature("a_1L", "person"),
            count_feature("b_2L", "person"),
        ]
        .into_iter()
        .collect();
        let keep_name = count_feature("b_2L", "person").name().to_string();
        let selection: HashSet<String> = [keep_name.clone()].into_iter().collect();

        assert_eq!(catalog.retain(&selection), 1);
        assert!(catalog.contains(&keep_name));
    }

    #[test]
    fn test_json_is_keyed_by_name() {
        let feature = count_feature("a_1L", "person");
        let catalog: FeatureCatalog = vec![feature.clone()].into_iter().collect();
        let value: serde_json::Value = serde_json::from_str(&catalog.to_json().unwrap()).unwrap();
        assert_eq!(value[feature.name()]["topic"], "person");
        assert_eq!(value[feature.name()]["agg"]["logic"], "count({0})");
    }
}
