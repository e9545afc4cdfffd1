//! Feature query compiler
//!
//! Compiles a batch of features into one aggregation statement grouped by
//! the entity key (and the target column when present).

use crate::codegen::{qualified, quote_ident};
use crate::error::{CompileError, Result};
use crate::fixup::{apply_all, TextFixup};
use strata_core::{Element, Feature};

/// Compiler options
#[derive(Debug, Clone)]
pub struct CompilerOptions {
    /// Table the feature expressions read from
    pub table: String,
    /// Entity key column
    pub entity_key: String,
    /// Target column carried through the grouping, if any
    pub target_column: Option<String>,
    /// Rewrites applied to every feature expression
    pub fixups: Vec<TextFixup>,
}

impl Default for CompilerOptions {
    fn default() -> Self {
        Self {
            table: "frame".to_string(),
            entity_key: "case_id".to_string(),
            target_column: None,
            fixups: TextFixup::defaults::<&str>(&[]),
        }
    }
}

impl CompilerOptions {
    pub fn new(entity_key: impl Into<String>) -> Self {
        Self {
            entity_key: entity_key.into(),
            ..Self::default()
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_column = Some(target.into());
        self
    }

    pub fn with_fixups(mut self, fixups: Vec<TextFixup>) -> Self {
        self.fixups = fixups;
        self
    }
}

/// One compiled batch of features
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledBatch {
    /// Zero-based batch index, also the output artifact index
    pub index: usize,
    /// Output column names in select order
    pub features: Vec<String>,
    /// The aggregation statement
    pub sql: String,
}

/// Compiles feature batches into aggregation queries
#[derive(Debug, Clone, Default)]
pub struct QueryCompiler {
    options: CompilerOptions,
}

impl QueryCompiler {
    pub fn new(options: CompilerOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &CompilerOptions {
        &self.options
    }

    /// Compile all features into a single statement.
    pub fn compile(&self, features: &[Feature]) -> Result<String> {
        if features.is_empty() {
            return Err(CompileError::EmptyBatch(
                "at least one feature is required".to_string(),
            ));
        }

        let group_keys = self.group_keys();
        let mut sql = format!("SELECT {}", group_keys.join(", "));
        for feature in features {
            sql.push_str("\n    , ");
            sql.push_str(&self.select_item(feature));
        }
        sql.push_str(&format!("\nfrom {}", self.options.table));
        sql.push_str(&format!("\ngroup by {}", group_keys.join(", ")));
        Ok(sql)
    }

    /// Split features into batches of at most `batch_size` and compile each.
    pub fn compile_batches(
        &self,
        features: &[Feature],
        batch_size: usize,
    ) -> Result<Vec<CompiledBatch>> {
        if batch_size == 0 {
            return Err(CompileError::InvalidBatchSize(batch_size));
        }

        features
            .chunks(batch_size)
            .enumerate()
            .map(|(index, batch)| {
                Ok(CompiledBatch {
                    index,
                    features: batch.iter().map(|f| f.name().to_string()).collect(),
                    sql: self.compile(batch)?,
                })
            })
            .collect()
    }

    fn group_keys(&self) -> Vec<String> {
        let mut keys = vec![qualified(&self.options.table, &self.options.entity_key)];
        if let Some(target) = &self.options.target_column {
            keys.push(qualified(&self.options.table, target));
        }
        keys
    }

    /// `cast(<expr> as <type>) as "<name>"` for one feature.
    fn select_item(&self, feature: &Feature) -> String {
        let agg = feature.agg();
        let textual_moment = agg.is_moment()
            && agg
                .sole_column()
                .map(|column| column.data_type().is_textual())
                .unwrap_or(false);

        let expression = if textual_moment {
            "null".to_string()
        } else {
            apply_all(&self.options.fixups, feature.query())
        };

        format!(
            "cast({} as {}) as {}",
            expression,
            feature.data_type().sql_type(),
            quote_ident(feature.name())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::expr::logic;
    use strata_core::{Aggregation, Column, DataType, Filter};

    fn feature(column: &Column, agg_logic: &str, data_type: DataType) -> Feature {
        let agg = Aggregation::on(column, agg_logic, data_type);
        Feature::new(data_type, "applprev", agg, Vec::<Filter>::new())
    }

    #[test]
    fn test_compile_single_feature() {
        let amount = Column::field("credamount_590A", DataType::Float);
        let compiler = QueryCompiler::new(CompilerOptions::new("case_id").with_target("target"));
        let sql = compiler
            .compile(&[feature(&amount, logic::SUM, DataType::Float)])
            .unwrap();

        assert_eq!(
            sql,
            "SELECT frame.\"case_id\", frame.\"target\"\n    , \
             cast(sum(case when 1 = 1 then credamount_590A else null end) as double) \
             as \"sum__if_1_eq_1_then_credamount_590a__\"\nfrom frame\n\
             group by frame.\"case_id\", frame.\"target\""
        );
    }

    #[test]
    fn test_textual_moment_is_null() {
        let status = Column::field("status_219L", DataType::Categorical);
        let compiler = QueryCompiler::default();
        let sql = compiler
            .compile(&[feature(&status, logic::AVG, DataType::Float)])
            .unwrap();
        assert!(sql.contains("cast(null as double) as \"avg__if_1_eq_1_then_status_219l__\""));
    }

    #[test]
    fn test_year_fixup_applies_to_expression_only() {
        let year = Column::field("max_pmts_year_1139T507T__D", DataType::Date);
        let options = CompilerOptions::default()
            .with_fixups(TextFixup::defaults(&["max_pmts_year_1139T507T__D"]));
        let sql = QueryCompiler::new(options)
            .compile(&[feature(&year, logic::MAX, DataType::Text)])
            .unwrap();

        assert!(sql.contains(
            "then case when max_pmts_year_1139T507T__D='-01-01' then null \
             else replace(max_pmts_year_1139T507T__D, '.0', '') end else null end"
        ));
        assert!(sql.contains("as \"max__if_1_eq_1_then_max_pmts_year_1139t507t__d__\""));
    }

    #[test]
    fn test_batches_are_indexed() {
        let amount = Column::field("credamount_590A", DataType::Float);
        let features: Vec<Feature> = [logic::SUM, logic::MIN, logic::MAX, logic::COUNT, logic::AVG]
            .iter()
            .map(|l| feature(&amount, l, DataType::Float))
            .collect();

        let batches = QueryCompiler::default()
            .compile_batches(&features, 2)
            .unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].index, 2);
        assert_eq!(batches[2].features.len(), 1);
        assert_eq!(batches[0].features[0], features[0].name());
    }

    #[test]
    fn test_invalid_batches() {
        let compiler = QueryCompiler::default();
        assert!(matches!(
            compiler.compile_batches(&[], 0),
            Err(CompileError::InvalidBatchSize(0))
        ));
        assert!(matches!(compiler.compile(&[]), Err(CompileError::EmptyBatch(_))));
        assert!(compiler.compile_batches(&[], 10).unwrap().is_empty());
    }
}
