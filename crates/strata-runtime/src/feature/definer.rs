//! Feature catalog generation
//!
//! Given one topic's sample table, the definer derives aggregations and
//! filters from column types and sampled values, then emits the cross
//! product of the two as features. The candidate set is kept tractable by
//! data-driven heuristics: only the most frequent categories become
//! equality filters, recency buckets and group-index cutoffs follow a
//! Fibonacci progression, and null/sentinel/sign filters are emitted only
//! for conditions actually observed in the sample.

use super::profile::{ColumnProfile, TableProfile};
use crate::engine::udf::parse_days;
use crate::error::{Result, RuntimeError};
use crate::table::Table;
use arrow::array::{Array, ArrayRef, AsArray, Int64Array};
use arrow::compute::cast;
use arrow::datatypes::{DataType as ArrowType, Float64Type};
use std::sync::Arc;
use strata_core::expr::{logic, quote_literal};
use strata_core::{Aggregation, Column, DataType, Element, Feature, FeatureCatalog, Filter, Topic};
use tracing::{debug, info};

/// Postfixes of text columns that get equality filters.
const CATEGORY_POSTFIXES: [char; 3] = ['L', 'T', 'M'];

/// Period filters skip this many leading Fibonacci thresholds.
const PERIOD_SKIP: usize = 3;

/// Catalog generation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationMode {
    /// Every aggregation crossed with every filter
    Full,
    /// Presence counts per category value and period, plus bare column counts
    Simple { cat_count: usize },
}

/// Definer options
#[derive(Debug, Clone)]
pub struct DefinerOptions {
    /// Entity key, never aggregated
    pub entity_key: String,
    /// Column all date differences are taken against
    pub reference_date_column: String,
    /// Date the sampled day differences are measured from (`YYYY-MM-DD`)
    pub reference_date: String,
    /// Further columns never aggregated (target, ...)
    pub excluded_columns: Vec<String>,
    /// Reserved "masked" category value
    pub sentinel: String,
    /// Equality filters per categorical column
    pub cat_count: usize,
    /// Date columns that get period filters
    pub period_columns: Vec<String>,
}

impl Default for DefinerOptions {
    fn default() -> Self {
        Self {
            entity_key: "case_id".to_string(),
            reference_date_column: "date_decision".to_string(),
            reference_date: "2020-10-19".to_string(),
            excluded_columns: vec!["target".to_string()],
            sentinel: "a55475b1".to_string(),
            cat_count: 10,
            period_columns: Vec::new(),
        }
    }
}

/// Generates the candidate feature catalog of one topic
pub struct FeatureDefiner {
    topic: Topic,
    sample: Table,
    options: DefinerOptions,
    columns: Vec<Column>,
    profile: TableProfile,
    group_index: Option<String>,
}

impl FeatureDefiner {
    /// Profile `sample` and prepare the column set of `topic`.
    pub fn new(topic: Topic, sample: Table, options: DefinerOptions) -> Result<Self> {
        let profile = TableProfile::from_table(&sample, &options.sentinel)?;
        let columns = profile
            .columns()
            .iter()
            .filter(|p| {
                p.name != options.entity_key
                    && p.name != options.reference_date_column
                    && !options.excluded_columns.contains(&p.name)
            })
            .map(|p| Column::field(p.name.clone(), p.data_type))
            .collect();
        let group_index = topic
            .depth()
            .group_index_column()
            .filter(|name| sample.has_column(name));

        Ok(Self {
            topic,
            sample,
            options,
            columns,
            profile,
            group_index,
        })
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    /// Columns features are built over.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Generate the catalog.
    pub fn define(&self, mode: GenerationMode) -> Result<FeatureCatalog> {
        let features = match mode {
            GenerationMode::Full => self.full_features()?,
            GenerationMode::Simple { cat_count } => self.simple_features(cat_count)?,
        };
        let generated = features.len();
        let catalog: FeatureCatalog = features.into_iter().collect();

        info!(
            topic = %self.topic,
            generated,
            unique = catalog.len(),
            "defined feature catalog"
        );
        Ok(catalog)
    }

    fn full_features(&self) -> Result<Vec<Feature>> {
        let aggs = self.aggregations();
        let mut filters: Vec<Option<Filter>> = self.filters()?.into_iter().map(Some).collect();
        filters.push(None);
        debug!(aggs = aggs.len(), filters = filters.len(), "crossing aggregations and filters");
        Ok(self.cross(&aggs, &filters))
    }

    fn simple_features(&self, cat_count: usize) -> Result<Vec<Feature>> {
        let presence = Aggregation::on(
            &Column::derived(DataType::Integer, "1"),
            logic::COUNT,
            DataType::Integer,
        );
        let mut filters = self.categorical_filters(cat_count);
        filters.extend(self.period_filters()?);
        let filters: Vec<Option<Filter>> = filters.into_iter().map(Some).collect();

        let mut features = self.cross(&[presence], &filters);

        let counts: Vec<Aggregation> = self
            .columns
            .iter()
            .filter(|c| Some(c.name()) != self.group_index.as_deref())
            .map(|c| Aggregation::on(c, logic::COUNT, DataType::Integer))
            .collect();
        features.extend(self.cross(&counts, &[None]));
        Ok(features)
    }

    /// Every aggregation with every filter, skipping self-filters.
    fn cross(&self, aggs: &[Aggregation], filters: &[Option<Filter>]) -> Vec<Feature> {
        let mut features = Vec::with_capacity(aggs.len() * filters.len());
        for agg in aggs {
            for filter in filters {
                if let Some(filter) = filter {
                    if agg.columns().first() == filter.columns().first() {
                        continue;
                    }
                }
                features.push(Feature::new(
                    agg.data_type(),
                    self.topic.name().to_string(),
                    agg.clone(),
                    [filter.clone()],
                ));
            }
        }
        features
    }

    /// Aggregation catalog, grouped by kind in column order.
    pub fn aggregations(&self) -> Vec<Aggregation> {
        let mut aggs: Vec<Aggregation> = self
            .columns
            .iter()
            .map(|c| Aggregation::on(c, logic::COUNT, DataType::Integer))
            .collect();

        for column in self.columns.iter().filter(|c| c.data_type().is_numeric()) {
            for template in [logic::SUM, logic::MIN, logic::MAX] {
                aggs.push(Aggregation::on(column, template, column.data_type()));
            }
        }

        // avg/stddev sweep every column, textual ones included.
        for column in &self.columns {
            for template in [logic::AVG, logic::STDDEV] {
                aggs.push(Aggregation::on(column, template, DataType::Float));
            }
        }

        let textual: Vec<&Column> = self
            .columns
            .iter()
            .filter(|c| c.data_type().is_textual())
            .collect();
        aggs.extend(
            textual
                .iter()
                .map(|c| Aggregation::on(c, logic::COUNT_DISTINCT, DataType::Integer)),
        );
        aggs.extend(
            textual
                .iter()
                .map(|c| Aggregation::on(c, logic::MAX, DataType::Text)),
        );

        let reference = &self.options.reference_date_column;
        for column in self.columns.iter().filter(|c| c.data_type() == DataType::Date) {
            for op in ["max", "min", "avg", "stddev"] {
                let template = format!("{}(to_days({}) - to_days({{0}}))", op, reference);
                aggs.push(Aggregation::on(column, template, DataType::Integer));
            }
        }

        aggs
    }

    /// Filter catalog (without the implicit "no filter" case).
    pub fn filters(&self) -> Result<Vec<Filter>> {
        let mut filters = self.categorical_filters(self.options.cat_count);
        filters.extend(self.period_filters()?);
        filters.extend(self.null_filters());
        filters.extend(self.group_filters()?);
        Ok(filters)
    }

    /// Equality filters on the most frequent values of category columns.
    pub fn categorical_filters(&self, cat_count: usize) -> Vec<Filter> {
        let sentinel = &self.options.sentinel;
        self.columns
            .iter()
            .filter(|c| {
                c.data_type() == DataType::Categorical
                    && c.postfix().map_or(false, |p| CATEGORY_POSTFIXES.contains(&p))
            })
            .flat_map(|column| {
                self.column_profile(column)
                    .map(|profile| profile.top_values(cat_count, sentinel))
                    .unwrap_or_default()
                    .into_iter()
                    .map(move |value| {
                        Filter::on(column, format!("{{0}} = {}", quote_literal(value)))
                    })
            })
            .collect()
    }

    /// Recency buckets on the allow-listed date columns.
    pub fn period_filters(&self) -> Result<Vec<Filter>> {
        let reference = &self.options.reference_date_column;
        let mut filters = Vec::new();
        for column in self.columns.iter().filter(|c| {
            c.data_type() == DataType::Date && self.options.period_columns.iter().any(|p| p == c.name())
        }) {
            let diffs = date_diff(&self.sample.column(column.name())?, &self.options.reference_date)?;
            for threshold in fibonacci(&diffs)?.into_iter().skip(PERIOD_SKIP) {
                filters.push(Filter::on(
                    column,
                    format!("to_days({}) - to_days({{0}}) < {}", reference, threshold),
                ));
            }
        }
        Ok(filters)
    }

    /// Null, sentinel and sign filters, emitted in pairs and only for
    /// conditions present in the sample.
    pub fn null_filters(&self) -> Vec<Filter> {
        let sentinel = quote_literal(&self.options.sentinel);
        let mut filters = Vec::new();
        for column in &self.columns {
            let Some(profile) = self.column_profile(column) else {
                continue;
            };
            if profile.has_null {
                filters.push(Filter::on(column, "{0} is null"));
                filters.push(Filter::on(column, "{0} is not null"));
            }
            if column.data_type().is_textual() {
                if profile.has_sentinel {
                    filters.push(Filter::on(column, format!("{{0}} = {}", sentinel)));
                    filters.push(Filter::on(column, format!("{{0}} != {}", sentinel)));
                }
            } else if profile.has_non_positive {
                filters.push(Filter::on(column, "{0} > 0"));
                filters.push(Filter::on(column, "{0} <= 0"));
            }
        }
        filters
    }

    /// Cutoffs on the group index plus its first and second occurrence.
    pub fn group_filters(&self) -> Result<Vec<Filter>> {
        let Some(name) = self.group_index.as_deref() else {
            return Ok(Vec::new());
        };
        let Some(column) = self.columns.iter().find(|c| c.name() == name) else {
            return Ok(Vec::new());
        };

        let mut filters: Vec<Filter> = fibonacci(&self.sample.column(name)?)?
            .into_iter()
            .map(|threshold| Filter::on(column, format!("{{0}} < {}", threshold)))
            .collect();
        filters.extend((0..2).map(|index| Filter::on(column, format!("{{0}} = {}", index))));
        Ok(filters)
    }

    fn column_profile(&self, column: &Column) -> Option<&ColumnProfile> {
        self.profile.column(column.name())
    }
}

/// Fibonacci thresholds covering the maximum of a numeric array.
///
/// The sequence is seeded `1, 2`, grown until the last term reaches the
/// maximum, and returned without its first term, so it starts at 2 and is
/// strictly increasing. Nulls and NaN are ignored when taking the maximum.
/// Non-numeric input is rejected.
pub fn fibonacci(values: &ArrayRef) -> Result<Vec<i64>> {
    if !values.data_type().is_numeric() {
        return Err(RuntimeError::InputType(format!(
            "fibonacci thresholds need numeric input, got {}",
            values.data_type()
        )));
    }
    let values = cast(values, &ArrowType::Float64)?;
    let limit = values
        .as_primitive::<Float64Type>()
        .iter()
        .flatten()
        .filter(|value| !value.is_nan())
        .reduce(f64::max);
    Ok(fibonacci_until(limit))
}

fn fibonacci_until(limit: Option<f64>) -> Vec<i64> {
    let mut sequence: Vec<i64> = vec![1, 2];
    if let Some(limit) = limit {
        while let [.., a, b] = sequence[..] {
            if b as f64 >= limit {
                break;
            }
            match a.checked_add(b) {
                Some(next) => sequence.push(next),
                None => break,
            }
        }
    }
    sequence.remove(0);
    sequence
}

/// Days from each date in `values` to `reference` (`YYYY-MM-DD`).
pub fn date_diff(values: &ArrayRef, reference: &str) -> Result<ArrayRef> {
    let reference_days = parse_days(reference).ok_or_else(|| {
        RuntimeError::Configuration(format!("invalid reference date '{}'", reference))
    })?;
    let text = cast(values, &ArrowType::Utf8)?;
    let diffs: Int64Array = text
        .as_string::<i32>()
        .iter()
        .map(|value| value.and_then(parse_days).map(|days| reference_days - days))
        .collect();
    Ok(Arc::new(diffs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int64Array, StringArray};
    use strata_core::Depth;

    fn definer(columns: Vec<(&str, ArrayRef)>) -> FeatureDefiner {
        let topic = Topic::new("person", Depth::Entity).unwrap();
        let table = Table::from_columns(columns).unwrap();
        FeatureDefiner::new(topic, table, DefinerOptions::default()).unwrap()
    }

    fn queries(filters: &[Filter]) -> Vec<String> {
        filters.iter().map(Element::query).collect()
    }

    #[test]
    fn test_fibonacci() {
        let values: ArrayRef = Arc::new(Int64Array::from(vec![0, 5, 3]));
        assert_eq!(fibonacci(&values).unwrap(), vec![2, 3, 5]);

        let values: ArrayRef = Arc::new(Float64Array::from(vec![9.5]));
        assert_eq!(fibonacci(&values).unwrap(), vec![2, 3, 5, 8, 13]);

        let values: ArrayRef = Arc::new(Int64Array::from(vec![None::<i64>]));
        assert_eq!(fibonacci(&values).unwrap(), vec![2]);
    }

    #[test]
    fn test_fibonacci_rejects_text() {
        let values: ArrayRef = Arc::new(StringArray::from(vec!["a"]));
        assert!(matches!(fibonacci(&values), Err(RuntimeError::InputType(_))));
    }

    #[test]
    fn test_fibonacci_does_not_overflow() {
        assert!(fibonacci_until(Some(f64::MAX)).windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_date_diff() {
        let values: ArrayRef = Arc::new(StringArray::from(vec![Some("2020-10-09"), None]));
        let diffs = date_diff(&values, "2020-10-19").unwrap();
        let diffs = diffs.as_primitive::<arrow::datatypes::Int64Type>();
        assert_eq!(diffs.value(0), 10);
        assert!(diffs.is_null(1));
        assert!(date_diff(&values, "soon").is_err());
    }

    #[test]
    fn test_numeric_null_filters() {
        let definer = definer(vec![(
            "amount_416A",
            Arc::new(Float64Array::from(vec![Some(-1.5), None, Some(2.5)])) as ArrayRef,
        )]);
        assert_eq!(
            queries(&definer.null_filters()),
            vec![
                "amount_416A is null",
                "amount_416A is not null",
                "amount_416A > 0",
                "amount_416A <= 0"
            ]
        );
    }

    #[test]
    fn test_group_filters() {
        let definer = definer(vec![
            ("case_id", Arc::new(Int64Array::from(vec![1, 1, 1])) as ArrayRef),
            ("num_group1", Arc::new(Int64Array::from(vec![0, 1, 9])) as ArrayRef),
        ]);
        assert_eq!(
            queries(&definer.group_filters().unwrap()),
            vec![
                "num_group1 < 2",
                "num_group1 < 3",
                "num_group1 < 5",
                "num_group1 < 8",
                "num_group1 < 13",
                "num_group1 = 0",
                "num_group1 = 1"
            ]
        );
    }

    #[test]
    fn test_date_aggregations() {
        let definer = definer(vec![(
            "birth_259D",
            Arc::new(StringArray::from(vec!["1980-01-01"])) as ArrayRef,
        )]);
        let logic: Vec<String> = definer
            .aggregations()
            .iter()
            .map(|a| a.logic().to_string())
            .collect();
        assert!(logic.contains(&"max(to_days(date_decision) - to_days({0}))".to_string()));
        assert!(logic.contains(&"stddev(to_days(date_decision) - to_days({0}))".to_string()));
        assert!(logic.contains(&"count(distinct {0})".to_string()));
        assert!(!logic.contains(&"sum({0})".to_string()));
    }

    #[test]
    fn test_key_column_is_not_aggregated() {
        let definer = definer(vec![
            ("case_id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            ("amount_1A", Arc::new(Int64Array::from(vec![3, 4])) as ArrayRef),
        ]);
        let names: Vec<&str> = definer.columns().iter().map(Column::name).collect();
        assert_eq!(names, vec!["amount_1A"]);
    }
}
