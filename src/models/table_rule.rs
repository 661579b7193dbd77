use std::fmt;
use std::sync::Arc;

use crate::error::{Result, ShardingError};
use crate::models::DataNode;
use crate::services::key_generator::KeyGenerator;
use crate::services::strategy::ShardingStrategy;

/// Sharding rule of one logic table
#[derive(Clone)]
pub struct TableRule {
    logic_table: String,
    dynamic: bool,
    actual_tables: Vec<DataNode>,
    database_strategy: Option<ShardingStrategy>,
    table_strategy: Option<ShardingStrategy>,
    generate_key_column: Option<String>,
    key_generator: Option<Arc<dyn KeyGenerator>>,
}

impl TableRule {
    pub fn builder(logic_table: impl Into<String>) -> TableRuleBuilder {
        TableRuleBuilder::new(logic_table)
    }

    pub fn logic_table(&self) -> &str {
        &self.logic_table
    }

    pub fn is_dynamic(&self) -> bool {
        self.dynamic
    }

    pub fn actual_tables(&self) -> &[DataNode] {
        &self.actual_tables
    }

    pub fn database_strategy(&self) -> Option<&ShardingStrategy> {
        self.database_strategy.as_ref()
    }

    pub fn table_strategy(&self) -> Option<&ShardingStrategy> {
        self.table_strategy.as_ref()
    }

    pub fn generate_key_column(&self) -> Option<&str> {
        self.generate_key_column.as_deref()
    }

    pub fn key_generator(&self) -> Option<&Arc<dyn KeyGenerator>> {
        self.key_generator.as_ref()
    }

    /// Data nodes for the routed data sources and tables.
    ///
    /// Dynamic rules have no fixed tables, so every combination is produced.
    pub fn actual_data_nodes(&self, target_data_sources: &[String], target_tables: &[String]) -> Vec<DataNode> {
        if self.dynamic {
            let mut result = Vec::with_capacity(target_data_sources.len() * target_tables.len());
            for ds in target_data_sources {
                for table in target_tables {
                    result.push(DataNode::new(ds.clone(), table.clone()));
                }
            }
            return result;
        }
        self.actual_tables
            .iter()
            .filter(|node| {
                target_data_sources
                    .iter()
                    .any(|ds| ds.eq_ignore_ascii_case(&node.data_source_name))
                    && target_tables
                        .iter()
                        .any(|t| t.eq_ignore_ascii_case(&node.table_name))
            })
            .cloned()
            .collect()
    }

    /// Data source names in declaration order
    pub fn actual_data_source_names(&self) -> Vec<String> {
        let mut result: Vec<String> = Vec::new();
        for node in &self.actual_tables {
            if !result.contains(&node.data_source_name) {
                result.push(node.data_source_name.clone());
            }
        }
        result
    }

    pub fn actual_table_names(&self, target_data_source: &str) -> Vec<String> {
        self.actual_tables
            .iter()
            .filter(|node| node.data_source_name.eq_ignore_ascii_case(target_data_source))
            .map(|node| node.table_name.clone())
            .collect()
    }

    /// Position of a physical table among all data nodes
    pub fn find_actual_table_index(&self, data_source_name: &str, actual_table_name: &str) -> Option<usize> {
        self.actual_tables.iter().position(|node| {
            node.data_source_name.eq_ignore_ascii_case(data_source_name)
                && node.table_name.eq_ignore_ascii_case(actual_table_name)
        })
    }
}

impl fmt::Debug for TableRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableRule")
            .field("logic_table", &self.logic_table)
            .field("dynamic", &self.dynamic)
            .field("actual_tables", &self.actual_tables)
            .field("database_strategy", &self.database_strategy)
            .field("table_strategy", &self.table_strategy)
            .field("generate_key_column", &self.generate_key_column)
            .field("key_generator", &self.key_generator.is_some())
            .finish()
    }
}

/// Builder validating a table rule
pub struct TableRuleBuilder {
    logic_table: String,
    dynamic: bool,
    actual_tables: Vec<String>,
    data_source_names: Vec<String>,
    database_strategy: Option<ShardingStrategy>,
    table_strategy: Option<ShardingStrategy>,
    generate_key_column: Option<String>,
    key_generator: Option<Arc<dyn KeyGenerator>>,
}

impl TableRuleBuilder {
    fn new(logic_table: impl Into<String>) -> Self {
        Self {
            logic_table: logic_table.into(),
            dynamic: false,
            actual_tables: Vec::new(),
            data_source_names: Vec::new(),
            database_strategy: None,
            table_strategy: None,
            generate_key_column: None,
            key_generator: None,
        }
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Actual tables as `ds.table` or bare table names
    pub fn actual_tables<I, S>(mut self, actual_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actual_tables = actual_tables.into_iter().map(Into::into).collect();
        self
    }

    /// Data sources the rule spans; bare actual tables are placed on each of them
    pub fn data_source_names<I, S>(mut self, data_source_names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_source_names = data_source_names.into_iter().map(Into::into).collect();
        self
    }

    pub fn database_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.database_strategy = Some(strategy);
        self
    }

    pub fn table_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.table_strategy = Some(strategy);
        self
    }

    pub fn generate_key_column(mut self, column: impl Into<String>) -> Self {
        self.generate_key_column = Some(column.into());
        self
    }

    pub fn key_generator(mut self, generator: Arc<dyn KeyGenerator>) -> Self {
        self.key_generator = Some(generator);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    /// Returns a rule error for an empty logic table, a rule with no data
    /// sources, a malformed `ds.table` entry, or a dynamic rule with fixed tables
    pub fn build(self) -> Result<TableRule> {
        if self.logic_table.trim().is_empty() {
            return Err(ShardingError::Rule("Logic table name can not be empty".to_string()));
        }
        if self.dynamic && !self.actual_tables.is_empty() {
            return Err(ShardingError::Rule(format!(
                "Dynamic table '{}' can not declare actual tables",
                self.logic_table
            )));
        }

        let actual_tables: Vec<DataNode> = if self.dynamic {
            if self.data_source_names.is_empty() {
                return Err(ShardingError::Rule(format!(
                    "Dynamic table '{}' needs at least one data source",
                    self.logic_table
                )));
            }
            self.data_source_names.iter().map(DataNode::dynamic).collect()
        } else {
            self.static_data_nodes()?
        };

        tracing::debug!(
            "Built table rule '{}' with {} data nodes",
            self.logic_table,
            actual_tables.len()
        );

        Ok(TableRule {
            logic_table: self.logic_table,
            dynamic: self.dynamic,
            actual_tables,
            database_strategy: self.database_strategy,
            table_strategy: self.table_strategy,
            generate_key_column: self.generate_key_column,
            key_generator: self.key_generator,
        })
    }

    fn static_data_nodes(&self) -> Result<Vec<DataNode>> {
        if self.actual_tables.is_empty() {
            if self.data_source_names.is_empty() {
                return Err(ShardingError::Rule(format!(
                    "Table '{}' needs actual tables or data sources",
                    self.logic_table
                )));
            }
            return Ok(self
                .data_source_names
                .iter()
                .map(|ds| DataNode::new(ds.clone(), self.logic_table.clone()))
                .collect());
        }

        let mut result = Vec::new();
        for actual_table in &self.actual_tables {
            if actual_table.contains('.') {
                result.push(DataNode::parse(actual_table)?);
                continue;
            }
            if self.data_source_names.is_empty() {
                return Err(ShardingError::Rule(format!(
                    "Actual table '{}' of '{}' has no data source",
                    actual_table, self.logic_table
                )));
            }
            for ds in &self.data_source_names {
                result.push(DataNode::new(ds.clone(), actual_table.trim()));
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_static_rule_with_qualified_tables() {
        let rule = TableRule::builder("t_order")
            .actual_tables(["ds_0.t_order_0", "ds_0.t_order_1", "ds_1.t_order_0", "ds_1.t_order_1"])
            .build()
            .unwrap();

        assert_eq!(rule.actual_data_source_names(), strings(&["ds_0", "ds_1"]));
        assert_eq!(rule.actual_table_names("ds_1"), strings(&["t_order_0", "t_order_1"]));
        assert_eq!(rule.find_actual_table_index("DS_1", "t_order_1"), Some(3));
        assert_eq!(rule.find_actual_table_index("ds_2", "t_order_1"), None);

        let nodes = rule.actual_data_nodes(&strings(&["ds_1"]), &strings(&["t_order_0"]));
        assert_eq!(nodes, vec![DataNode::new("ds_1", "t_order_0")]);
    }

    #[test]
    fn test_bare_tables_cross_data_sources() {
        let rule = TableRule::builder("t_order")
            .actual_tables(["t_order_0", "t_order_1"])
            .data_source_names(["ds_0", "ds_1"])
            .build()
            .unwrap();
        assert_eq!(rule.actual_tables().len(), 4);
        assert_eq!(rule.actual_tables()[1], DataNode::new("ds_1", "t_order_0"));
    }

    #[test]
    fn test_logic_table_as_actual_table() {
        let rule = TableRule::builder("t_config")
            .data_source_names(["ds_0", "ds_1"])
            .build()
            .unwrap();
        assert_eq!(rule.actual_table_names("ds_0"), strings(&["t_config"]));
    }

    #[test]
    fn test_dynamic_rule() {
        let rule = TableRule::builder("t_log")
            .dynamic(true)
            .data_source_names(["ds_0", "ds_1"])
            .build()
            .unwrap();
        assert!(rule.is_dynamic());
        assert!(rule.actual_tables().iter().all(|n| n.is_dynamic()));

        let nodes = rule.actual_data_nodes(&strings(&["ds_0"]), &strings(&["t_log_1", "t_log_2"]));
        assert_eq!(
            nodes,
            vec![DataNode::new("ds_0", "t_log_1"), DataNode::new("ds_0", "t_log_2")]
        );
    }

    #[test]
    fn test_invalid_rules() {
        assert!(TableRule::builder("t_order").build().is_err());
        assert!(TableRule::builder("t_order").actual_tables(["a.b.c"]).build().is_err());
        assert!(TableRule::builder("t_log")
            .dynamic(true)
            .actual_tables(["ds_0.t_log_0"])
            .data_source_names(["ds_0"])
            .build()
            .is_err());
    }
}
