// Hint Manager
//
// Request-scoped sharding values supplied by the caller instead of being
// parsed from SQL. A manager is built per logical statement, passed to the
// router by reference and cleared (or dropped) when the request ends.

use std::collections::HashMap;

use crate::error::{Result, ShardingError};
use crate::models::{ShardingOperator, ShardingValue, SqlValue};

/// Logic table name used for database-only hint routing
pub const DB_TABLE_NAME: &str = "DB_TABLE_NAME";
/// Column name used for database-only hint routing
pub const DB_COLUMN_NAME: &str = "DB_COLUMN_NAME";

/// Case-insensitive `(logic_table, column)` key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ShardingKey {
    logic_table: String,
    column: String,
}

impl ShardingKey {
    fn new(logic_table: &str, column: &str) -> Self {
        Self {
            logic_table: logic_table.to_lowercase(),
            column: column.to_lowercase(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HintManager {
    database_sharding_values: HashMap<ShardingKey, ShardingValue>,
    table_sharding_values: HashMap<ShardingKey, ShardingValue>,
    sharding_hint: bool,
    database_sharding_only: bool,
    master_route_only: bool,
}

impl HintManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route by data source only; the SQL is executed as written
    pub fn set_database_sharding_value(&mut self, value: SqlValue) {
        self.database_sharding_only = true;
        self.sharding_hint = true;
        self.database_sharding_values.insert(
            ShardingKey::new(DB_TABLE_NAME, DB_COLUMN_NAME),
            ShardingValue::single(DB_TABLE_NAME, DB_COLUMN_NAME, value),
        );
    }

    /// Add a database sharding value for one logic table column.
    ///
    /// # Errors
    /// Returns error when the value count does not fit the operator
    pub fn add_database_sharding_value(
        &mut self,
        logic_table: &str,
        column: &str,
        operator: ShardingOperator,
        values: Vec<SqlValue>,
    ) -> Result<()> {
        let value = build_sharding_value(logic_table, column, operator, values)?;
        self.sharding_hint = true;
        self.database_sharding_values
            .insert(ShardingKey::new(logic_table, column), value);
        Ok(())
    }

    /// Add a table sharding value for one logic table column.
    ///
    /// # Errors
    /// Returns error when the value count does not fit the operator
    pub fn add_table_sharding_value(
        &mut self,
        logic_table: &str,
        column: &str,
        operator: ShardingOperator,
        values: Vec<SqlValue>,
    ) -> Result<()> {
        let value = build_sharding_value(logic_table, column, operator, values)?;
        self.sharding_hint = true;
        self.table_sharding_values
            .insert(ShardingKey::new(logic_table, column), value);
        Ok(())
    }

    pub fn database_sharding_value(&self, logic_table: &str, column: &str) -> Option<&ShardingValue> {
        self.database_sharding_values
            .get(&ShardingKey::new(logic_table, column))
    }

    pub fn table_sharding_value(&self, logic_table: &str, column: &str) -> Option<&ShardingValue> {
        self.table_sharding_values.get(&ShardingKey::new(logic_table, column))
    }

    /// Force reads to the master; carried for the read-write splitting layer
    pub fn set_master_route_only(&mut self) {
        self.master_route_only = true;
    }

    pub fn is_sharding_hint(&self) -> bool {
        self.sharding_hint
    }

    pub fn is_database_sharding_only(&self) -> bool {
        self.database_sharding_only
    }

    pub fn is_master_route_only(&self) -> bool {
        self.master_route_only
    }

    /// Reset every value and flag at the end of a request
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

fn build_sharding_value(
    logic_table: &str,
    column: &str,
    operator: ShardingOperator,
    mut values: Vec<SqlValue>,
) -> Result<ShardingValue> {
    match (operator, values.len()) {
        (ShardingOperator::Equal, 1) => Ok(ShardingValue::single(logic_table, column, values.remove(0))),
        (ShardingOperator::In, n) if n > 0 => Ok(ShardingValue::list(logic_table, column, values)),
        (ShardingOperator::Between, 2) => {
            let upper = values.remove(1);
            let lower = values.remove(0);
            Ok(ShardingValue::range(logic_table, column, lower, upper))
        }
        (operator, n) => Err(ShardingError::UnsupportedOperation(format!(
            "Hint operator {} can not take {} values",
            operator.as_str(),
            n
        ))),
    }
}
