//! Builder pattern for Workbench

use crate::config::WorkbenchConfig;
use crate::error::Result;
use crate::workbench::Workbench;
use std::path::PathBuf;
use std::sync::Arc;
use strata_runtime::{DataSource, Engine, ParquetStore};

/// Builder for Workbench
///
/// # Example
///
/// ```rust,ignore
/// use strata_sdk::{WorkbenchBuilder, WorkbenchConfig};
///
/// // Bundled preset over a local parquet store
/// let workbench = WorkbenchBuilder::new()
///     .with_config(WorkbenchConfig::home_credit()?)
///     .with_data_root("data/home-credit")
///     .build()?;
///
/// // In-memory tables (for testing)
/// let workbench = WorkbenchBuilder::new()
///     .with_config(config)
///     .with_source(Arc::new(MemorySource::new()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct WorkbenchBuilder {
    config: WorkbenchConfig,
    source: Option<Arc<dyn DataSource>>,
    engine: Option<Arc<Engine>>,
}

impl WorkbenchBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration
    pub fn with_config(mut self, config: WorkbenchConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the parquet store root
    pub fn with_data_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.config.data_root = root.into();
        self
    }

    /// Set the catalog directory
    pub fn with_catalog_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.catalog_dir = dir.into();
        self
    }

    /// Set the scratch directory for reduction shards
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = dir.into();
        self
    }

    /// Set features per compiled batch
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.config.batch_size = batch_size;
        self
    }

    /// Use a custom data source instead of a parquet store at `data_root`
    pub fn with_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Share an existing engine
    pub fn with_engine(mut self, engine: Arc<Engine>) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Validate the configuration and build the workbench
    pub fn build(self) -> Result<Workbench> {
        self.config.validate()?;
        let topics = self.config.topic_set();

        let source: Arc<dyn DataSource> = match self.source {
            Some(source) => source,
            None => Arc::new(ParquetStore::new(self.config.data_root.clone())),
        };
        let engine = match self.engine {
            Some(engine) => engine,
            None => Arc::new(Engine::new()?),
        };

        tracing::info!(
            topics = topics.len(),
            batch_size = self.config.batch_size,
            "workbench ready"
        );
        Ok(Workbench::new(self.config, topics, source, engine))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_runtime::MemorySource;

    #[test]
    fn test_builder_overrides() {
        let builder = WorkbenchBuilder::new()
            .with_data_root("/tmp/data")
            .with_catalog_dir("/tmp/catalogs")
            .with_batch_size(20);
        assert_eq!(builder.config.data_root, PathBuf::from("/tmp/data"));
        assert_eq!(builder.config.catalog_dir, PathBuf::from("/tmp/catalogs"));
        assert_eq!(builder.config.batch_size, 20);
    }

    #[test]
    fn test_build_validates_config() {
        let result = WorkbenchBuilder::new()
            .with_batch_size(0)
            .with_source(Arc::new(MemorySource::new()))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_home_credit() {
        let workbench = WorkbenchBuilder::new()
            .with_config(WorkbenchConfig::home_credit().unwrap())
            .with_source(Arc::new(MemorySource::new()))
            .build()
            .unwrap();
        assert_eq!(workbench.topics().len(), 16);
    }
}
