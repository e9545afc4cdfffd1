//! Embedded SQL engine
//!
//! Wraps a DataFusion session behind a synchronous API. Every query gets a
//! fresh session with the given tables registered in memory, identifier
//! normalisation disabled (mixed-case column names) and a single target
//! partition, and runs to completion on a private current-thread runtime.

pub mod udf;

use crate::error::{Result, RuntimeError};
use crate::table::Table;
use datafusion::datasource::MemTable;
use datafusion::prelude::{SessionConfig, SessionContext};
use std::sync::Arc;
use tokio::runtime::{Builder, Runtime};
use tracing::debug;

/// Synchronous SQL engine over in-memory tables
pub struct Engine {
    runtime: Runtime,
    target_partitions: usize,
}

impl Engine {
    /// Create an engine with sequential (single partition) execution.
    pub fn new() -> Result<Self> {
        Self::with_partitions(1)
    }

    pub fn with_partitions(target_partitions: usize) -> Result<Self> {
        let runtime = Builder::new_current_thread().enable_all().build()?;
        Ok(Self {
            runtime,
            target_partitions: target_partitions.max(1),
        })
    }

    fn session(&self) -> SessionContext {
        let mut config = SessionConfig::new()
            .with_target_partitions(self.target_partitions)
            .with_information_schema(false);
        config.options_mut().sql_parser.enable_ident_normalization = false;

        let ctx = SessionContext::new_with_config(config);
        ctx.register_udf(udf::to_days());
        ctx
    }

    /// Run `sql` against the named tables and collect the result.
    pub fn query(&self, sql: &str, tables: &[(&str, &Table)]) -> Result<Table> {
        debug!(tables = tables.len(), "executing query ({} chars)", sql.len());

        self.runtime.block_on(async {
            let ctx = self.session();
            for (name, table) in tables {
                let provider =
                    MemTable::try_new(table.schema().clone(), vec![table.batches().to_vec()])?;
                ctx.register_table(*name, Arc::new(provider))?;
            }

            let df = ctx.sql(sql).await?;
            let logical_schema = Arc::new(df.schema().as_arrow().clone());
            let batches = df.collect().await?;
            let schema = batches
                .first()
                .map(|batch| batch.schema())
                .unwrap_or(logical_schema);

            Ok::<_, RuntimeError>(Table::new(schema, batches))
        })
    }
}
