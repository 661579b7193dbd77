// Sharding Rule Configuration
//
// Serde-facing configuration structs. A config is loaded from any file
// format the `config` crate understands and validated into the immutable
// ShardingRule graph by `build()`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, ShardingError};
use crate::models::{ShardingRule, TableRule};
use crate::services::key_generator::DefaultKeyGenerator;
use crate::services::strategy::{
    DynamicModuloShardingAlgorithm, ModuloShardingAlgorithm, ShardingAlgorithm, ShardingStrategy,
};

/// Built-in algorithm selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlgorithmConfig {
    None,
    Modulo {
        #[serde(default)]
        modulus: Option<u64>,
    },
    DynamicModulo {
        prefix: String,
        modulus: u64,
    },
}

impl AlgorithmConfig {
    pub fn build(&self) -> Result<ShardingAlgorithm> {
        match self {
            AlgorithmConfig::None => Ok(ShardingAlgorithm::none()),
            AlgorithmConfig::Modulo { modulus: None } => {
                Ok(ShardingAlgorithm::single_key(ModuloShardingAlgorithm::new()))
            }
            AlgorithmConfig::Modulo {
                modulus: Some(modulus),
            } => {
                if *modulus == 0 {
                    return Err(ShardingError::Configuration(
                        "Modulo algorithm needs a positive modulus".to_string(),
                    ));
                }
                Ok(ShardingAlgorithm::single_key(ModuloShardingAlgorithm::with_modulus(*modulus)))
            }
            AlgorithmConfig::DynamicModulo { prefix, modulus } => Ok(ShardingAlgorithm::single_key(
                DynamicModuloShardingAlgorithm::new(prefix.clone(), *modulus)?,
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    #[serde(default)]
    pub sharding_columns: Vec<String>,
    pub algorithm: AlgorithmConfig,
}

impl StrategyConfig {
    pub fn build(&self) -> Result<ShardingStrategy> {
        let algorithm = self.algorithm.build()?;
        if matches!(algorithm, ShardingAlgorithm::SingleKey(_)) && self.sharding_columns.len() != 1 {
            return Err(ShardingError::Configuration(format!(
                "Single key algorithm needs exactly one sharding column, got {:?}",
                self.sharding_columns
            )));
        }
        Ok(ShardingStrategy::new(self.sharding_columns.clone(), algorithm))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyGeneratorConfig {
    #[serde(default)]
    pub worker_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRuleConfig {
    pub logic_table: String,
    #[serde(default)]
    pub dynamic: bool,
    /// `ds.table` entries, or bare table names spread over `data_source_names`
    #[serde(default)]
    pub actual_tables: Vec<String>,
    /// Defaults to every declared data source
    #[serde(default)]
    pub data_source_names: Vec<String>,
    #[serde(default)]
    pub database_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub table_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub generate_key_column: Option<String>,
    #[serde(default)]
    pub key_generator: Option<KeyGeneratorConfig>,
}

impl TableRuleConfig {
    fn build(&self, all_data_sources: &[String]) -> Result<TableRule> {
        let data_source_names = if self.data_source_names.is_empty() {
            all_data_sources.to_vec()
        } else {
            self.data_source_names.clone()
        };
        let mut builder = TableRule::builder(self.logic_table.clone())
            .dynamic(self.dynamic)
            .actual_tables(self.actual_tables.clone())
            .data_source_names(data_source_names);
        if let Some(strategy) = &self.database_strategy {
            builder = builder.database_strategy(strategy.build()?);
        }
        if let Some(strategy) = &self.table_strategy {
            builder = builder.table_strategy(strategy.build()?);
        }
        if let Some(column) = &self.generate_key_column {
            builder = builder.generate_key_column(column.clone());
        }
        if let Some(generator) = &self.key_generator {
            builder = builder.key_generator(Arc::new(DefaultKeyGenerator::new(generator.worker_id)?));
        }
        builder.build()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShardingRuleConfig {
    pub data_sources: Vec<String>,
    #[serde(default)]
    pub default_data_source: Option<String>,
    #[serde(default)]
    pub tables: Vec<TableRuleConfig>,
    #[serde(default)]
    pub binding_tables: Vec<Vec<String>>,
    #[serde(default)]
    pub default_database_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub default_table_strategy: Option<StrategyConfig>,
    #[serde(default)]
    pub key_generator: Option<KeyGeneratorConfig>,
}

impl ShardingRuleConfig {
    /// Load a rule file; the format follows the file extension
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Loading sharding rule from {}", path.display());
        let config = config::Config::builder()
            .add_source(config::File::from(path))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    /// Validate and build the rule graph
    pub fn build(&self) -> Result<ShardingRule> {
        let mut builder = ShardingRule::builder().data_source_names(self.data_sources.clone());
        if let Some(default_ds) = &self.default_data_source {
            builder = builder.default_data_source_name(default_ds.clone());
        }
        for table in &self.tables {
            builder = builder.table_rule(table.build(&self.data_sources)?);
        }
        for group in &self.binding_tables {
            builder = builder.binding_tables(group.clone());
        }
        if let Some(strategy) = &self.default_database_strategy {
            builder = builder.default_database_strategy(strategy.build()?);
        }
        if let Some(strategy) = &self.default_table_strategy {
            builder = builder.default_table_strategy(strategy.build()?);
        }
        if let Some(generator) = &self.key_generator {
            builder = builder.key_generator(Arc::new(DefaultKeyGenerator::new(generator.worker_id)?));
        }
        builder.build()
    }
}
