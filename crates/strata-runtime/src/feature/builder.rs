//! Batched feature extraction
//!
//! Compiles a feature list into bounded batches and executes them one at a
//! time against a feature frame. Each batch result is narrowed, written to
//! its own artifact and dropped before the next batch runs.

use super::frame::FeatureFrame;
use crate::datasource::DataSource;
use crate::engine::Engine;
use crate::error::Result;
use crate::optimize::narrow;
use std::sync::Arc;
use std::time::Instant;
use strata_compiler::QueryCompiler;
use strata_core::Feature;
use tracing::{debug, info};

/// Summary of one builder run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildReport {
    pub features: usize,
    pub batches: usize,
    pub written: usize,
    pub skipped: usize,
    pub rows: usize,
}

/// Executes compiled feature batches against a frame
pub struct FeatureBuilder {
    source: Arc<dyn DataSource>,
    engine: Arc<Engine>,
    frame: FeatureFrame,
    compiler: QueryCompiler,
}

impl FeatureBuilder {
    pub fn new(
        source: Arc<dyn DataSource>,
        engine: Arc<Engine>,
        frame: FeatureFrame,
        compiler: QueryCompiler,
    ) -> Self {
        Self {
            source,
            engine,
            frame,
            compiler,
        }
    }

    pub fn frame(&self) -> &FeatureFrame {
        &self.frame
    }

    /// Build `features` in batches of `batch_size`. Batches with an index
    /// below `skip` are not executed, which resumes an interrupted build.
    pub fn run(&self, features: &[Feature], batch_size: usize, skip: usize) -> Result<BuildReport> {
        let started = Instant::now();
        let topic = self.frame.topic();
        let split = self.frame.split();
        let table_name = self.compiler.options().table.as_str();

        let batches = self.compiler.compile_batches(features, batch_size)?;
        let mut report = BuildReport {
            features: features.len(),
            batches: batches.len(),
            ..BuildReport::default()
        };

        for batch in &batches {
            if batch.index < skip {
                debug!(index = batch.index, "skipping feature batch");
                report.skipped += 1;
                continue;
            }

            let result = self
                .engine
                .query(&batch.sql, &[(table_name, self.frame.table())])?;
            let result = narrow(result)?;
            report.rows = result.num_rows();
            self.source
                .write_feature_batch(topic.name(), split, batch.index, &result)?;
            report.written += 1;

            info!(
                topic = %topic,
                index = batch.index,
                features = batch.features.len(),
                rows = result.num_rows(),
                "built feature batch"
            );
        }

        info!(
            topic = %topic,
            written = report.written,
            skipped = report.skipped,
            "elapsed time: {:.4} sec",
            started.elapsed().as_secs_f64()
        );
        Ok(report)
    }
}
