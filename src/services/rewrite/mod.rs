// SQL Rewrite Engine
//
// Splices the parser's rewrite markers into the logical SQL. The result is
// a `SqlBuilder` holding table placeholders, rendered once per routed unit
// with that unit's physical tables. Pagination markers are rewritten only
// when the statement fans out to more than one physical statement.

pub mod builder;

pub use builder::SqlBuilder;

use std::collections::HashMap;

use crate::error::Result;
use crate::models::{
    unquote_identifier, CartesianTableReference, ShardingRule, SqlStatement, SqlToken, SqlValue, TableUnit,
};

pub struct SqlRewriteEngine<'a> {
    sharding_rule: &'a ShardingRule,
    original_sql: &'a str,
    statement: &'a SqlStatement,
    /// Bound parameters as supplied, before LIMIT parameter rewriting
    parameters: &'a [SqlValue],
}

impl<'a> SqlRewriteEngine<'a> {
    pub fn new(
        sharding_rule: &'a ShardingRule,
        original_sql: &'a str,
        statement: &'a SqlStatement,
        parameters: &'a [SqlValue],
    ) -> Self {
        Self {
            sharding_rule,
            original_sql,
            statement,
            parameters,
        }
    }

    /// Apply every marker in source order.
    ///
    /// # Arguments
    /// * `is_rewrite_limit` - the statement runs on more than one unit, so
    ///   offsets reset to 0 and row counts widen
    ///
    /// # Errors
    /// Returns error when a bound LIMIT offset is missing or negative
    pub fn rewrite(&self, is_rewrite_limit: bool) -> Result<SqlBuilder> {
        let mut builder = SqlBuilder::new();
        let mut tokens: Vec<&SqlToken> = self.statement.sql_tokens.iter().collect();
        tokens.sort_by_key(|t| t.begin_position());
        tokens.dedup();

        let mut cursor = 0;
        for token in tokens {
            let begin_position = token.begin_position();
            if begin_position < cursor {
                continue;
            }
            builder.append_literals(self.slice(cursor, begin_position));
            let length = match token {
                SqlToken::Table { original_literals, .. } => {
                    builder.append_table(&unquote_identifier(original_literals), original_literals);
                    original_literals.len()
                }
                SqlToken::Items { items, .. } => {
                    for item in items {
                        builder.append_literals(", ");
                        builder.append_literals(item);
                    }
                    0
                }
                SqlToken::OrderBy { .. } => {
                    builder.append_literals(&self.derived_order_by());
                    0
                }
                SqlToken::RowCount { length, row_count, .. } => {
                    let rewritten = self.row_count(*row_count, is_rewrite_limit)?;
                    if rewritten == *row_count {
                        builder.append_literals(self.slice(begin_position, begin_position + length));
                    } else {
                        builder.append_literals(&rewritten.to_string());
                    }
                    *length
                }
                SqlToken::Offset { length, .. } => {
                    if is_rewrite_limit {
                        builder.append_literals("0");
                    } else {
                        builder.append_literals(self.slice(begin_position, begin_position + length));
                    }
                    *length
                }
            };
            cursor = begin_position + length;
        }
        builder.append_literals(self.slice(cursor, self.original_sql.len()));
        Ok(builder)
    }

    /// Physical SQL for one table unit, binding partners included
    pub fn generate_sql(&self, table_unit: &TableUnit, builder: &SqlBuilder) -> Result<String> {
        let table_tokens = self.table_tokens(std::slice::from_ref(table_unit))?;
        Ok(builder.to_sql(&table_tokens))
    }

    /// Physical SQL for one cartesian combination
    pub fn generate_reference_sql(&self, reference: &CartesianTableReference, builder: &SqlBuilder) -> Result<String> {
        let table_tokens = self.table_tokens(&reference.table_units)?;
        Ok(builder.to_sql(&table_tokens))
    }

    fn slice(&self, begin: usize, end: usize) -> &'a str {
        if begin >= end {
            return "";
        }
        self.original_sql.get(begin..end).unwrap_or_default()
    }

    fn derived_order_by(&self) -> String {
        let columns: Vec<String> = self
            .statement
            .order_by_items
            .iter()
            .map(|item| {
                let label = item
                    .column_label()
                    .map(str::to_string)
                    .or_else(|| item.index.map(|i| i.to_string()))
                    .unwrap_or_default();
                format!("{} {}", label, item.order_type.as_str())
            })
            .collect();
        format!(" ORDER BY {}", columns.join(", "))
    }

    fn row_count(&self, row_count: i64, is_rewrite_limit: bool) -> Result<i64> {
        let Some(limit) = self.statement.limit.as_ref() else {
            return Ok(row_count);
        };
        if !is_rewrite_limit {
            return Ok(row_count);
        }
        if self.statement.needs_fetch_all() {
            return Ok(i32::MAX as i64);
        }
        if limit.row_count_rewrite {
            return Ok(row_count.saturating_add(limit.offset_value(self.parameters)?));
        }
        Ok(row_count)
    }

    /// Logic to actual table names, keyed lower-case; routed units win over
    /// binding partners derived from them
    fn table_tokens(&self, table_units: &[TableUnit]) -> Result<HashMap<String, String>> {
        let mut result = HashMap::new();
        for unit in table_units.iter().filter(|u| !u.logic_table_name.is_empty()) {
            result.insert(unit.logic_table_name.to_lowercase(), unit.actual_table_name.clone());
        }
        let table_names = self.statement.tables.table_names();
        for unit in table_units.iter().filter(|u| !u.logic_table_name.is_empty()) {
            let Some(binding_rule) = self.sharding_rule.find_binding_table_rule(&unit.logic_table_name) else {
                continue;
            };
            for name in &table_names {
                let key = name.to_lowercase();
                if result.contains_key(&key) || !binding_rule.has_logic_table(name) {
                    continue;
                }
                let actual_table =
                    binding_rule.binding_actual_table(&unit.data_source_name, name, &unit.actual_table_name)?;
                result.insert(key, actual_table);
            }
        }
        Ok(result)
    }
}
