use std::borrow::Cow;
use std::sync::Arc;

use crate::error::{Result, ShardingError};
use crate::models::{Column, TableRule};
use crate::services::key_generator::{DefaultKeyGenerator, KeyGenerator};
use crate::services::strategy::ShardingStrategy;

/// Logic tables sharded identically, so their physical tables pair up by position
#[derive(Debug, Clone)]
pub struct BindingTableRule {
    table_rules: Vec<TableRule>,
}

impl BindingTableRule {
    pub fn new(table_rules: Vec<TableRule>) -> Self {
        Self { table_rules }
    }

    pub fn table_rules(&self) -> &[TableRule] {
        &self.table_rules
    }

    pub fn has_logic_table(&self, logic_table: &str) -> bool {
        self.table_rules
            .iter()
            .any(|r| r.logic_table().eq_ignore_ascii_case(logic_table))
    }

    pub fn logic_tables(&self) -> Vec<String> {
        self.table_rules.iter().map(|r| r.logic_table().to_string()).collect()
    }

    /// Physical table of `logic_table` sitting at the same data node index as
    /// `other_actual_table` in its own rule.
    ///
    /// # Errors
    /// Returns error for dynamic rules or when no rule of the group holds the table
    pub fn binding_actual_table(
        &self,
        data_source: &str,
        logic_table: &str,
        other_actual_table: &str,
    ) -> Result<String> {
        let mut index = None;
        for rule in &self.table_rules {
            if rule.is_dynamic() {
                return Err(ShardingError::UnsupportedOperation(
                    "Dynamic table cannot support Binding table.".to_string(),
                ));
            }
            index = rule.find_actual_table_index(data_source, other_actual_table);
            if index.is_some() {
                break;
            }
        }
        let index = index.ok_or_else(|| {
            ShardingError::Routing(format!(
                "Actual table [{}].[{}] is not in table config",
                data_source, other_actual_table
            ))
        })?;
        self.table_rules
            .iter()
            .find(|r| r.logic_table().eq_ignore_ascii_case(logic_table))
            .and_then(|r| r.actual_tables().get(index))
            .map(|node| node.table_name.clone())
            .ok_or_else(|| {
                ShardingError::Routing(format!(
                    "Cannot find binding actual table, data source: {}, logic table: {}, other actual table: {}",
                    data_source, logic_table, other_actual_table
                ))
            })
    }
}

/// Complete sharding configuration; immutable and shared read-only once built
pub struct ShardingRule {
    data_source_names: Vec<String>,
    default_data_source_name: Option<String>,
    table_rules: Vec<TableRule>,
    binding_table_rules: Vec<BindingTableRule>,
    default_database_strategy: Option<ShardingStrategy>,
    default_table_strategy: Option<ShardingStrategy>,
    key_generator: Option<Arc<dyn KeyGenerator>>,
    default_key_generator: Arc<dyn KeyGenerator>,
    none_strategy: ShardingStrategy,
}

impl ShardingRule {
    pub fn builder() -> ShardingRuleBuilder {
        ShardingRuleBuilder::default()
    }

    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    pub fn default_data_source_name(&self) -> Option<&str> {
        self.default_data_source_name.as_deref()
    }

    pub fn table_rules(&self) -> &[TableRule] {
        &self.table_rules
    }

    pub fn binding_table_rules(&self) -> &[BindingTableRule] {
        &self.binding_table_rules
    }

    pub fn default_database_strategy(&self) -> &ShardingStrategy {
        self.default_database_strategy.as_ref().unwrap_or(&self.none_strategy)
    }

    pub fn default_table_strategy(&self) -> &ShardingStrategy {
        self.default_table_strategy.as_ref().unwrap_or(&self.none_strategy)
    }

    pub fn try_find_table_rule(&self, logic_table: &str) -> Option<&TableRule> {
        self.table_rules
            .iter()
            .find(|r| r.logic_table().eq_ignore_ascii_case(logic_table))
    }

    /// Table rule for a logic table, or a single-node rule on the default data
    /// source when the table is not sharded.
    ///
    /// # Errors
    /// Returns error when neither a rule nor a default data source exists
    pub fn table_rule(&self, logic_table: &str) -> Result<Cow<'_, TableRule>> {
        if let Some(rule) = self.try_find_table_rule(logic_table) {
            return Ok(Cow::Borrowed(rule));
        }
        match &self.default_data_source_name {
            Some(default_ds) => {
                let rule = TableRule::builder(logic_table)
                    .data_source_names([default_ds.as_str()])
                    .database_strategy(ShardingStrategy::none())
                    .table_strategy(ShardingStrategy::none())
                    .build()?;
                Ok(Cow::Owned(rule))
            }
            None => Err(ShardingError::Routing(format!(
                "Cannot find table rule and default data source with logic table: '{}'",
                logic_table
            ))),
        }
    }

    /// Per-table database strategy, falling back to the rule default
    pub fn database_strategy<'a>(&'a self, table_rule: &'a TableRule) -> &'a ShardingStrategy {
        table_rule
            .database_strategy()
            .unwrap_or_else(|| self.default_database_strategy())
    }

    /// Per-table table strategy, falling back to the rule default
    pub fn table_strategy<'a>(&'a self, table_rule: &'a TableRule) -> &'a ShardingStrategy {
        table_rule
            .table_strategy()
            .unwrap_or_else(|| self.default_table_strategy())
    }

    /// All logic tables belong to one binding group
    pub fn is_all_binding_tables(&self, logic_tables: &[String]) -> bool {
        let binding_tables = self.filter_all_binding_tables(logic_tables);
        !binding_tables.is_empty()
            && logic_tables
                .iter()
                .all(|t| binding_tables.iter().any(|b| b.eq_ignore_ascii_case(t)))
    }

    /// Tables of the first binding group touching `logic_tables`, intersected with them
    pub fn filter_all_binding_tables(&self, logic_tables: &[String]) -> Vec<String> {
        let binding_rule = logic_tables
            .iter()
            .find_map(|t| self.find_binding_table_rule(t));
        match binding_rule {
            Some(rule) => rule
                .logic_tables()
                .into_iter()
                .filter(|b| logic_tables.iter().any(|t| t.eq_ignore_ascii_case(b)))
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn find_binding_table_rule(&self, logic_table: &str) -> Option<&BindingTableRule> {
        self.binding_table_rules
            .iter()
            .find(|r| r.has_logic_table(logic_table))
    }

    /// Whether any strategy applying to the column's table shards on it
    pub fn is_sharding_column(&self, column: &Column) -> bool {
        let in_defaults = self
            .default_database_strategy
            .as_ref()
            .map(|s| s.contains_column(&column.name))
            .unwrap_or(false)
            || self
                .default_table_strategy
                .as_ref()
                .map(|s| s.contains_column(&column.name))
                .unwrap_or(false);
        if in_defaults {
            return true;
        }
        self.table_rules
            .iter()
            .filter(|r| r.logic_table().eq_ignore_ascii_case(&column.table_name))
            .any(|r| {
                r.database_strategy()
                    .map(|s| s.contains_column(&column.name))
                    .unwrap_or(false)
                    || r.table_strategy()
                        .map(|s| s.contains_column(&column.name))
                        .unwrap_or(false)
            })
    }

    pub fn generate_key_column(&self, logic_table: &str) -> Option<&str> {
        self.try_find_table_rule(logic_table)
            .and_then(|r| r.generate_key_column())
    }

    /// Generate a key for the logic table: table generator, then rule
    /// generator, then the built-in default.
    ///
    /// # Errors
    /// Returns error when the table has no rule or the generator fails
    pub fn generate_key(&self, logic_table: &str) -> Result<i64> {
        let table_rule = self.try_find_table_rule(logic_table).ok_or_else(|| {
            ShardingError::Rule(format!(
                "Cannot find strategy for generate keys of table '{}'.",
                logic_table
            ))
        })?;
        let generator = table_rule
            .key_generator()
            .or(self.key_generator.as_ref())
            .unwrap_or(&self.default_key_generator);
        generator.generate_key()
    }
}

impl std::fmt::Debug for ShardingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardingRule")
            .field("data_source_names", &self.data_source_names)
            .field("default_data_source_name", &self.default_data_source_name)
            .field("table_rules", &self.table_rules)
            .field("binding_table_rules", &self.binding_table_rules)
            .field("default_database_strategy", &self.default_database_strategy)
            .field("default_table_strategy", &self.default_table_strategy)
            .finish()
    }
}

/// Builder validating a sharding rule
#[derive(Default)]
pub struct ShardingRuleBuilder {
    data_source_names: Vec<String>,
    default_data_source_name: Option<String>,
    table_rules: Vec<TableRule>,
    binding_tables: Vec<Vec<String>>,
    default_database_strategy: Option<ShardingStrategy>,
    default_table_strategy: Option<ShardingStrategy>,
    key_generator: Option<Arc<dyn KeyGenerator>>,
}

impl ShardingRuleBuilder {
    pub fn data_source_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.data_source_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn default_data_source_name(mut self, name: impl Into<String>) -> Self {
        self.default_data_source_name = Some(name.into());
        self
    }

    pub fn table_rule(mut self, table_rule: TableRule) -> Self {
        self.table_rules.push(table_rule);
        self
    }

    /// Declare one binding group by logic table names
    pub fn binding_tables<I, S>(mut self, logic_tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binding_tables
            .push(logic_tables.into_iter().map(Into::into).collect());
        self
    }

    pub fn default_database_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.default_database_strategy = Some(strategy);
        self
    }

    pub fn default_table_strategy(mut self, strategy: ShardingStrategy) -> Self {
        self.default_table_strategy = Some(strategy);
        self
    }

    pub fn key_generator(mut self, generator: Arc<dyn KeyGenerator>) -> Self {
        self.key_generator = Some(generator);
        self
    }

    /// Validate and build.
    ///
    /// # Errors
    /// Returns a rule error when no data source is declared, when a table
    /// rule or the default data source refers to an unknown data source, when
    /// a logic table is declared twice, or when a binding group names a table
    /// without a rule
    pub fn build(self) -> Result<ShardingRule> {
        if self.data_source_names.is_empty() {
            return Err(ShardingError::Rule("Sharding rule needs at least one data source".to_string()));
        }
        let known = |name: &str| self.data_source_names.iter().any(|ds| ds == name);

        let default_data_source_name = match self.default_data_source_name {
            Some(name) if !known(&name) => {
                return Err(ShardingError::Rule(format!(
                    "Default data source '{}' is not declared",
                    name
                )))
            }
            Some(name) => Some(name),
            None if self.data_source_names.len() == 1 => self.data_source_names.first().cloned(),
            None => None,
        };

        for (i, rule) in self.table_rules.iter().enumerate() {
            if let Some(node) = rule
                .actual_tables()
                .iter()
                .find(|node| !known(&node.data_source_name))
            {
                return Err(ShardingError::Rule(format!(
                    "Table '{}' refers to undeclared data source '{}'",
                    rule.logic_table(),
                    node.data_source_name
                )));
            }
            if self.table_rules[..i]
                .iter()
                .any(|r| r.logic_table().eq_ignore_ascii_case(rule.logic_table()))
            {
                return Err(ShardingError::Rule(format!(
                    "Logic table '{}' is declared more than once",
                    rule.logic_table()
                )));
            }
        }

        let mut binding_table_rules = Vec::with_capacity(self.binding_tables.len());
        for group in &self.binding_tables {
            let mut rules = Vec::with_capacity(group.len());
            for logic_table in group {
                let rule = self
                    .table_rules
                    .iter()
                    .find(|r| r.logic_table().eq_ignore_ascii_case(logic_table))
                    .ok_or_else(|| {
                        ShardingError::Rule(format!(
                            "Binding table '{}' has no table rule",
                            logic_table
                        ))
                    })?;
                rules.push(rule.clone());
            }
            binding_table_rules.push(BindingTableRule::new(rules));
        }

        tracing::info!(
            "Sharding rule built: {} data sources, {} table rules, {} binding groups",
            self.data_source_names.len(),
            self.table_rules.len(),
            binding_table_rules.len()
        );

        Ok(ShardingRule {
            data_source_names: self.data_source_names,
            default_data_source_name,
            table_rules: self.table_rules,
            binding_table_rules,
            default_database_strategy: self.default_database_strategy,
            default_table_strategy: self.default_table_strategy,
            key_generator: self.key_generator,
            default_key_generator: Arc::new(DefaultKeyGenerator::default()),
            none_strategy: ShardingStrategy::none(),
        })
    }
}
