//! Features: an aggregation applied under zero or more filters

use crate::expr::canonical::canonical_name;
use crate::expr::column::Column;
use crate::expr::element::{Aggregation, Element, Filter};
use crate::expr::template::render;
use crate::types::DataType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Condition used when a feature has no filters.
const TAUTOLOGY: &str = "1 = 1";

/// A derived column built from one aggregation and its filters.
///
/// The query wraps every aggregation input in
/// `case when <filters> then <column> else null end` and applies the
/// aggregation logic to the result. Query and name are recomputed on
/// construction and deserialization, so features with equal aggregation
/// and filters share one name regardless of topic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "FeatureRecord", from = "FeatureRecord")]
pub struct Feature {
    data_type: DataType,
    topic: String,
    agg: Aggregation,
    filters: Vec<Filter>,
    query: String,
    name: String,
}

/// Persisted form of a feature
#[derive(Serialize, Deserialize)]
struct FeatureRecord {
    data_type: DataType,
    topic: String,
    agg: Aggregation,
    #[serde(default)]
    filters: Vec<Filter>,
}

impl From<Feature> for FeatureRecord {
    fn from(feature: Feature) -> Self {
        Self {
            data_type: feature.data_type,
            topic: feature.topic,
            agg: feature.agg,
            filters: feature.filters,
        }
    }
}

impl From<FeatureRecord> for Feature {
    fn from(record: FeatureRecord) -> Self {
        Feature::new(record.data_type, record.topic, record.agg, record.filters)
    }
}

impl Feature {
    /// Build a feature. `None` filters are dropped.
    pub fn new<I, F>(
        data_type: DataType,
        topic: impl Into<String>,
        agg: Aggregation,
        filters: I,
    ) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<Option<Filter>>,
    {
        let filters: Vec<Filter> = filters.into_iter().filter_map(Into::into).collect();
        let query = compose_query(&agg, &filters);
        let name = canonical_name(&query);
        Self {
            data_type,
            topic: topic.into(),
            agg,
            filters,
            query,
            name,
        }
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn agg(&self) -> &Aggregation {
        &self.agg
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// View of this feature as a derived column.
    pub fn as_column(&self) -> Column {
        Column::derived(self.data_type, self.query.clone())
    }
}

fn compose_query(agg: &Aggregation, filters: &[Filter]) -> String {
    let condition = if filters.is_empty() {
        TAUTOLOGY.to_string()
    } else {
        filters
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" and ")
    };

    let guarded: Vec<String> = agg
        .columns()
        .iter()
        .map(|column| format!("case when {} then {} else null end", condition, column.name()))
        .collect();

    render(agg.logic(), &guarded)
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::element::logic;

    fn amount() -> Column {
        Column::field("amount_1115A", DataType::Float)
    }

    #[test]
    fn test_unfiltered_feature_uses_tautology() {
        let agg = Aggregation::on(&amount(), logic::SUM, DataType::Float);
        let feature = Feature::new(DataType::Float, "applprev", agg, [None::<Filter>]);

        assert_eq!(
            feature.query(),
            "sum(case when 1 = 1 then amount_1115A else null end)"
        );
        assert_eq!(feature.name(), "sum__if_1_eq_1_then_amount_1115a__");
        assert!(feature.filters().is_empty());
    }

    #[test]
    fn test_filters_conjoin() {
        let group = Column::field("num_group1", DataType::Integer);
        let agg = Aggregation::on(&amount(), logic::MAX, DataType::Float);
        let feature = Feature::new(
            DataType::Float,
            "applprev",
            agg,
            vec![
                Some(Filter::on(&group, "{0} < 3")),
                None,
                Some(Filter::on(&group, "{0} = 0")),
            ],
        );

        assert_eq!(
            feature.query(),
            "max(case when (num_group1 < 3) and (num_group1 = 0) then amount_1115A else null end)"
        );
        assert_eq!(feature.filters().len(), 2);
    }

    #[test]
    fn test_name_ignores_topic() {
        let agg = Aggregation::on(&amount(), logic::COUNT, DataType::Integer);
        let a = Feature::new(DataType::Integer, "applprev", agg.clone(), Vec::<Filter>::new());
        let b = Feature::new(DataType::Integer, "person", agg, Vec::<Filter>::new());
        assert_eq!(a.name(), b.name());
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_round_trip() {
        let group = Column::field("num_group1", DataType::Integer);
        let agg = Aggregation::on(&amount(), logic::AVG, DataType::Float);
        let feature = Feature::new(
            DataType::Float,
            "credit_bureau_a",
            agg,
            [Filter::on(&group, "{0} = 1")],
        );

        let json = serde_json::to_value(&feature).unwrap();
        assert!(json.get("query").is_none());
        assert_eq!(json["topic"], "credit_bureau_a");

        let back: Feature = serde_json::from_value(json).unwrap();
        assert_eq!(back, feature);
        assert_eq!(back.name(), feature.name());
        assert_eq!(back.query(), feature.query());
    }

    #[test]
    fn test_as_column() {
        let agg = Aggregation::on(&amount(), logic::COUNT, DataType::Integer);
        let feature = Feature::new(DataType::Integer, "applprev", agg, Vec::<Filter>::new());
        let column = feature.as_column();
        assert_eq!(column.name(), feature.name());
        assert_eq!(column.query(), Some(feature.query()));
    }
}
