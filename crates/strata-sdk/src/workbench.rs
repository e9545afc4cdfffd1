//! Workbench - orchestrates preprocessing, catalog generation and feature builds

use crate::config::WorkbenchConfig;
use crate::error::{Result, SdkError};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use strata_compiler::QueryCompiler;
use strata_core::{Depth, Feature, FeatureCatalog, Split, Topic, TopicSet};
use strata_runtime::{
    BuildReport, DataSource, Engine, FeatureBuilder, FeatureDefiner, FeatureFrame,
    GenerationMode, PreprocessReport, Preprocessor,
};
use tracing::{info, warn};

/// Outcome of generating one topic's catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogReport {
    pub topic: Topic,
    pub features: usize,
    pub path: PathBuf,
}

/// Outcome of pruning one topic's catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PruneReport {
    pub topic: String,
    pub kept: usize,
    pub dropped: usize,
}

/// Main entry point of the SDK
///
/// Built by [`WorkbenchBuilder`](crate::WorkbenchBuilder) from a validated
/// configuration, a data source and a SQL engine.
pub struct Workbench {
    config: WorkbenchConfig,
    topics: TopicSet,
    source: Arc<dyn DataSource>,
    engine: Arc<Engine>,
}

impl Workbench {
    pub(crate) fn new(
        config: WorkbenchConfig,
        topics: TopicSet,
        source: Arc<dyn DataSource>,
        engine: Arc<Engine>,
    ) -> Self {
        Self {
            config,
            topics,
            source,
            engine,
        }
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn topics(&self) -> &TopicSet {
        &self.topics
    }

    pub fn source(&self) -> &Arc<dyn DataSource> {
        &self.source
    }

    /// Turn every configured topic of `split` into a prep table.
    pub fn preprocess(&self, split: Split) -> Result<Vec<PreprocessReport>> {
        let preprocessor = Preprocessor::new(
            self.source.clone(),
            self.engine.clone(),
            self.config
                .reduction_rules
                .iter()
                .map(|(name, rule)| (name.clone(), rule.clone()))
                .collect(),
            self.config.preprocess_options(),
        );
        let reports = preprocessor.run(&self.topics, split)?;
        info!(split = %split, topics = reports.len(), "preprocessing finished");
        Ok(reports)
    }

    /// Generate and save the catalog of every depth-1 topic from its
    /// training prep table.
    pub fn define_features(&self, mode: GenerationMode) -> Result<Vec<CatalogReport>> {
        self.topics
            .at_depth(Depth::Entity)
            .map(|topic| self.define_topic(topic, mode))
            .collect()
    }

    /// Generate and save the catalog of one depth-1 topic.
    pub fn define_topic(&self, topic: &Topic, mode: GenerationMode) -> Result<CatalogReport> {
        let sample = self.source.read_prep(topic, Split::Train)?;
        let definer = FeatureDefiner::new(
            topic.clone(),
            sample,
            self.config.definer_options(topic.name()),
        )?;
        let catalog = definer.define(mode)?;

        let path = self.config.catalog_path(topic.name());
        catalog.save(&path)?;
        info!(topic = %topic, features = catalog.len(), path = %path.display(), "saved catalog");

        Ok(CatalogReport {
            topic: topic.clone(),
            features: catalog.len(),
            path,
        })
    }

    /// Load the saved catalog of a topic.
    pub fn catalog(&self, topic: &str) -> Result<FeatureCatalog> {
        let path = self.config.catalog_path(topic);
        if !path.exists() {
            return Err(SdkError::CatalogNotFound(format!(
                "{} ({})",
                topic,
                path.display()
            )));
        }
        Ok(FeatureCatalog::load(&path)?)
    }

    /// Build every feature of a topic's catalog over `split`, skipping the
    /// first `skip` batches.
    pub fn build_features(&self, topic: &str, split: Split, skip: usize) -> Result<BuildReport> {
        let features: Vec<Feature> = self.catalog(topic)?.features().cloned().collect();
        self.build(topic, split, &features, skip)
    }

    /// Build the named features of a topic's catalog, in the given order.
    pub fn build_selected<S: AsRef<str>>(
        &self,
        topic: &str,
        split: Split,
        names: &[S],
        skip: usize,
    ) -> Result<BuildReport> {
        let features = self.catalog(topic)?.select(names)?;
        self.build(topic, split, &features, skip)
    }

    fn build(&self, topic: &str, split: Split, features: &[Feature], skip: usize) -> Result<BuildReport> {
        let topic = self.topics.resolve(topic, Depth::Entity)?;
        let frame = FeatureFrame::load(
            self.source.as_ref(),
            &self.engine,
            topic,
            split,
            &self.config.frame_options(),
        )?;
        let builder = FeatureBuilder::new(
            self.source.clone(),
            self.engine.clone(),
            frame,
            QueryCompiler::new(self.config.compiler_options(split)),
        );
        Ok(builder.run(features, self.config.batch_size, skip)?)
    }

    /// Prune every saved depth-1 catalog down to `selection` and write the
    /// results to `out_dir` under the same file names.
    pub fn prune_catalogs(
        &self,
        selection: &HashSet<String>,
        out_dir: &Path,
    ) -> Result<Vec<PruneReport>> {
        let mut reports = Vec::new();
        for topic in self.topics.at_depth(Depth::Entity) {
            let mut catalog = match self.catalog(topic.name()) {
                Ok(catalog) => catalog,
                Err(SdkError::CatalogNotFound(what)) => {
                    warn!(topic = %topic, "no catalog to prune: {}", what);
                    continue;
                }
                Err(err) => return Err(err),
            };

            let dropped = catalog.retain(selection);
            catalog.save(out_dir.join(format!("{}.json", topic.name())))?;
            reports.push(PruneReport {
                topic: topic.name().to_string(),
                kept: catalog.len(),
                dropped,
            });
        }

        info!(
            catalogs = reports.len(),
            kept = reports.iter().map(|r| r.kept).sum::<usize>(),
            "pruned catalogs"
        );
        Ok(reports)
    }
}
