//! Denormalization pipeline
//!
//! Turns the raw tables of a split into prep tables, one topic at a time.
//! The action taken for a topic depends on its depth and on whether a
//! reduction rule is registered for its name:
//!
//! | depth | rule | action |
//! |-------|------|--------|
//! | 0, 1  | no   | narrow column types and persist |
//! | 0, 1  | yes  | skip, produced by reducing the depth-2 sibling |
//! | 2     | yes  | reduce onto depth 1 and persist |
//! | 2     | no   | configuration error |

pub mod reducer;
pub mod shards;

pub use reducer::{partition, Reducer, DATA_TABLE};
pub use shards::{ChunkSpill, ShardDir, ShardKind};

use crate::datasource::DataSource;
use crate::engine::Engine;
use crate::error::{Result, RuntimeError};
use crate::optimize::narrow;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use strata_compiler::StatusUnion;
use strata_core::{Depth, Split, Topic, TopicSet};
use tracing::{info, warn};

/// Declared reduction of a depth-2 topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReductionRule {
    /// Aggregation over table `data`, grouped by entity key and group index 1
    pub query: String,
    /// Reshape applied to each chunk before `query`
    #[serde(default)]
    pub status_union: Option<StatusUnion>,
    /// Number of entity-key partitions the source is processed in
    #[serde(default = "default_chunks")]
    pub chunks: usize,
}

fn default_chunks() -> usize {
    1
}

impl ReductionRule {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            status_union: None,
            chunks: default_chunks(),
        }
    }

    pub fn with_status_union(mut self, union: StatusUnion) -> Self {
        self.status_union = Some(union);
        self
    }

    pub fn with_chunks(mut self, chunks: usize) -> Self {
        self.chunks = chunks;
        self
    }
}

/// Preprocessor options
#[derive(Debug, Clone)]
pub struct PreprocessOptions {
    pub entity_key: String,
    pub group_index_1: String,
    pub group_index_2: String,
    /// Parent of the per-run shard directories
    pub scratch_dir: PathBuf,
    /// Rows per streamed batch of a depth-2 source
    pub scan_batch_rows: usize,
}

impl Default for PreprocessOptions {
    fn default() -> Self {
        Self {
            entity_key: "case_id".to_string(),
            group_index_1: "num_group1".to_string(),
            group_index_2: "num_group2".to_string(),
            scratch_dir: std::env::temp_dir().join("strata"),
            scan_batch_rows: 65_536,
        }
    }
}

/// What the preprocessor did with one topic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PreprocessOutcome {
    /// Narrowed and persisted
    Optimized { rows: usize },
    /// Left to the reduction of the depth-2 sibling
    Skipped,
    /// Depth 2 reduced onto depth 1
    Reduced { chunks: usize },
}

/// Outcome for one topic
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreprocessReport {
    pub topic: Topic,
    pub outcome: PreprocessOutcome,
}

/// Runs the per-topic preprocessing state machine
pub struct Preprocessor {
    source: Arc<dyn DataSource>,
    engine: Arc<Engine>,
    rules: HashMap<String, ReductionRule>,
    options: PreprocessOptions,
}

impl Preprocessor {
    pub fn new(
        source: Arc<dyn DataSource>,
        engine: Arc<Engine>,
        rules: HashMap<String, ReductionRule>,
        options: PreprocessOptions,
    ) -> Self {
        Self {
            source,
            engine,
            rules,
            options,
        }
    }

    pub fn rule(&self, name: &str) -> Option<&ReductionRule> {
        self.rules.get(name)
    }

    /// Preprocess every topic in order. The first error aborts the run.
    pub fn run(&self, topics: &TopicSet, split: Split) -> Result<Vec<PreprocessReport>> {
        topics
            .iter()
            .map(|topic| {
                Ok(PreprocessReport {
                    topic: topic.clone(),
                    outcome: self.run_topic(topic, split)?,
                })
            })
            .collect()
    }

    /// Preprocess one topic.
    pub fn run_topic(&self, topic: &Topic, split: Split) -> Result<PreprocessOutcome> {
        info!(topic = %topic, split = %split, "preprocessing");

        match (topic.depth(), self.rules.get(topic.name())) {
            (Depth::Nested, None) => Err(RuntimeError::Configuration(format!(
                "no reduction rule for {} but it is a depth 2 topic",
                topic.name()
            ))),
            (Depth::Nested, Some(rule)) => {
                Reducer::new(self.source.as_ref(), &self.engine, rule, &self.options)
                    .run(topic.name(), split)?;
                Ok(PreprocessOutcome::Reduced {
                    chunks: rule.chunks,
                })
            }
            (_, Some(_)) => {
                info!(topic = %topic, "skipped, produced by reducing depth 2");
                Ok(PreprocessOutcome::Skipped)
            }
            (depth, None) => {
                let table = narrow(self.source.read_raw(topic.name(), Some(depth), split)?)?;
                self.source.write_prep(topic, split, &table)?;
                if table.num_rows() == 0 {
                    warn!(topic = %topic, "persisted an empty prep table");
                }
                Ok(PreprocessOutcome::Optimized {
                    rows: table.num_rows(),
                })
            }
        }
    }
}
