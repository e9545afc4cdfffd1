//! Workbench configuration
//!
//! Settings are read from a YAML file and overridden by `STRATA_*`
//! environment variables (nested keys joined with `__`), after a `.env`
//! file in the working directory has been loaded.

use crate::error::{Result, SdkError};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use strata_compiler::{CompilerOptions, TextFixup};
use strata_core::{Depth, Split, Topic, TopicSet};
use strata_runtime::{DefinerOptions, FrameOptions, PreprocessOptions, ReductionRule};

const HOME_CREDIT_YAML: &str = include_str!("../presets/homecredit.yaml");

/// Workbench configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    /// Root of the parquet store
    pub data_root: PathBuf,

    /// Directory holding one catalog file per topic
    pub catalog_dir: PathBuf,

    /// Parent of the reduction shard directories
    pub scratch_dir: PathBuf,

    pub entity_key: String,
    pub reference_date_column: String,
    /// Date sampled day differences are measured from (`YYYY-MM-DD`)
    pub reference_date: String,
    pub target_column: String,

    /// Group index columns introduced at depth 1 and depth 2
    pub group_index_columns: [String; 2],

    /// Reserved "masked" category value
    pub sentinel: String,

    /// Equality filters per categorical column
    pub cat_count: usize,

    /// Features per compiled batch
    pub batch_size: usize,

    /// Rows per streamed batch of a depth-2 source
    pub scan_batch_rows: usize,

    /// The closed topic set, in processing order
    pub topics: Vec<Topic>,

    /// Depth-2 reductions by topic name
    pub reduction_rules: BTreeMap<String, ReductionRule>,

    /// Date columns that get period filters, by topic name
    pub period_columns: BTreeMap<String, Vec<String>>,

    /// Year-to-date composite columns rewritten in feature queries
    pub year_date_columns: Vec<String>,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("data"),
            catalog_dir: PathBuf::from("data/feature_definition"),
            scratch_dir: std::env::temp_dir().join("strata"),
            entity_key: "case_id".to_string(),
            reference_date_column: "date_decision".to_string(),
            reference_date: "2020-10-19".to_string(),
            target_column: "target".to_string(),
            group_index_columns: ["num_group1".to_string(), "num_group2".to_string()],
            sentinel: "a55475b1".to_string(),
            cat_count: 10,
            batch_size: 500,
            scan_batch_rows: 65_536,
            topics: Vec::new(),
            reduction_rules: BTreeMap::new(),
            period_columns: BTreeMap::new(),
            year_date_columns: Vec::new(),
        }
    }
}

impl WorkbenchConfig {
    /// The bundled Home Credit preset.
    pub fn home_credit() -> Result<Self> {
        Self::from_yaml(HOME_CREDIT_YAML)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load configuration from `path` (optional) and the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let config: Self = builder
            .add_source(
                config::Environment::with_prefix("STRATA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("failed to read configuration sources")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        tracing::info!(
            topics = config.topics.len(),
            rules = config.reduction_rules.len(),
            "loaded workbench configuration"
        );
        Ok(config)
    }

    /// Check the configuration before any data is touched.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(SdkError::ConfigError("batch_size must be positive".to_string()));
        }
        if self.scan_batch_rows == 0 {
            return Err(SdkError::ConfigError(
                "scan_batch_rows must be positive".to_string(),
            ));
        }

        let topics = self.topic_set();
        for topic in topics.at_depth(Depth::Nested) {
            if !self.reduction_rules.contains_key(topic.name()) {
                return Err(SdkError::ConfigError(format!(
                    "no reduction rule for {} but it is a depth 2 topic",
                    topic.name()
                )));
            }
        }

        for (name, rule) in &self.reduction_rules {
            if topics.resolve(name, Depth::Nested).is_err() {
                return Err(SdkError::ConfigError(format!(
                    "reduction rule for unknown depth 2 topic {}",
                    name
                )));
            }
            if rule.chunks == 0 {
                return Err(SdkError::ConfigError(format!(
                    "reduction rule for {} has zero chunks",
                    name
                )));
            }
        }

        if let Some(name) = self
            .period_columns
            .keys()
            .find(|name| !topics.contains_name(name))
        {
            return Err(SdkError::ConfigError(format!(
                "period columns for unknown topic {}",
                name
            )));
        }
        Ok(())
    }

    /// The configured topics in processing order.
    pub fn topic_set(&self) -> TopicSet {
        TopicSet::new(self.topics.clone())
    }

    pub fn preprocess_options(&self) -> PreprocessOptions {
        let [group_index_1, group_index_2] = self.group_index_columns.clone();
        PreprocessOptions {
            entity_key: self.entity_key.clone(),
            group_index_1,
            group_index_2,
            scratch_dir: self.scratch_dir.clone(),
            scan_batch_rows: self.scan_batch_rows,
        }
    }

    /// Generator options for one topic.
    pub fn definer_options(&self, topic: &str) -> DefinerOptions {
        DefinerOptions {
            entity_key: self.entity_key.clone(),
            reference_date_column: self.reference_date_column.clone(),
            reference_date: self.reference_date.clone(),
            excluded_columns: vec![self.target_column.clone()],
            sentinel: self.sentinel.clone(),
            cat_count: self.cat_count,
            period_columns: self.period_columns.get(topic).cloned().unwrap_or_default(),
        }
    }

    pub fn frame_options(&self) -> FrameOptions {
        FrameOptions {
            entity_key: self.entity_key.clone(),
            reference_date_column: self.reference_date_column.clone(),
            target_column: self.target_column.clone(),
        }
    }

    /// Compiler options for feature queries over `split`.
    pub fn compiler_options(&self, split: Split) -> CompilerOptions {
        let options = CompilerOptions::new(self.entity_key.clone())
            .with_fixups(TextFixup::defaults(&self.year_date_columns));
        if split.has_target() {
            options.with_target(self.target_column.clone())
        } else {
            options
        }
    }

    /// Catalog file of one topic.
    pub fn catalog_path(&self, topic: &str) -> PathBuf {
        self.catalog_dir.join(format!("{}.json", topic))
    }
}
