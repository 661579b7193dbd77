use crate::error::{Result, ShardingError};
use crate::models::{
    RoutingResult, ShardingRule, ShardingValue, SqlStatement, SqlValue, TableRule, TableUnit, TableUnits,
};
use crate::services::hint::HintManager;
use crate::services::strategy::ShardingStrategy;

use super::RoutingEngine;

/// Routes one logic table, or a group of binding tables through one of them
pub struct SimpleRoutingEngine<'a> {
    sharding_rule: &'a ShardingRule,
    parameters: &'a [SqlValue],
    logic_table_name: &'a str,
    statement: &'a SqlStatement,
    hint: &'a HintManager,
}

#[derive(Clone, Copy)]
enum Dimension {
    Database,
    Table,
}

impl<'a> SimpleRoutingEngine<'a> {
    pub fn new(
        sharding_rule: &'a ShardingRule,
        parameters: &'a [SqlValue],
        logic_table_name: &'a str,
        statement: &'a SqlStatement,
        hint: &'a HintManager,
    ) -> Self {
        Self {
            sharding_rule,
            parameters,
            logic_table_name,
            statement,
            hint,
        }
    }

    fn route_data_sources(&self, table_rule: &TableRule) -> Result<Vec<String>> {
        let strategy = self.sharding_rule.database_strategy(table_rule);
        let sharding_values = self.sharding_values(strategy, Dimension::Database)?;
        let available = table_rule.actual_data_source_names();
        let result = strategy.do_static_sharding(self.statement.kind, &available, &sharding_values)?;
        if result.is_empty() {
            return Err(ShardingError::Routing("no database route info".to_string()));
        }
        tracing::debug!("Table '{}' routed to data sources {:?}", self.logic_table_name, result);
        Ok(result)
    }

    fn route_tables(&self, table_rule: &TableRule, data_source_name: &str) -> Result<Vec<String>> {
        let strategy = self.sharding_rule.table_strategy(table_rule);
        let sharding_values = self.sharding_values(strategy, Dimension::Table)?;
        let result = if table_rule.is_dynamic() {
            strategy.do_dynamic_sharding(&sharding_values)?
        } else {
            let available = table_rule.actual_table_names(data_source_name);
            strategy.do_static_sharding(self.statement.kind, &available, &sharding_values)?
        };
        if result.is_empty() {
            return Err(ShardingError::Routing("no table route info".to_string()));
        }
        Ok(result)
    }

    /// Values for the strategy's columns, from the hint when one is active,
    /// from the parsed conditions otherwise
    fn sharding_values(&self, strategy: &ShardingStrategy, dimension: Dimension) -> Result<Vec<ShardingValue>> {
        let mut result = Vec::new();
        for column in strategy.sharding_columns() {
            if self.hint.is_sharding_hint() {
                let value = match dimension {
                    Dimension::Database => self.hint.database_sharding_value(self.logic_table_name, column),
                    Dimension::Table => self.hint.table_sharding_value(self.logic_table_name, column),
                };
                if let Some(value) = value {
                    result.push(value.clone());
                }
            } else if let Some(condition) = self.statement.conditions.find(column, self.logic_table_name) {
                result.push(condition.sharding_value(self.parameters)?);
            }
        }
        Ok(result)
    }
}

impl RoutingEngine for SimpleRoutingEngine<'_> {
    fn route(&self) -> Result<RoutingResult> {
        let table_rule = self.sharding_rule.table_rule(self.logic_table_name)?;
        let data_sources = self.route_data_sources(&table_rule)?;
        let mut units = TableUnits::default();
        for data_source in &data_sources {
            for actual_table in self.route_tables(&table_rule, data_source)? {
                units.add(TableUnit::new(
                    data_source.as_str(),
                    table_rule.logic_table(),
                    actual_table,
                ));
            }
        }
        Ok(RoutingResult::Units(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::order_rule;
    use crate::models::ShardingOperator;
    use crate::services::parsing::{DatabaseType, SqlParsingEngine};

    fn route(sql: &str, parameters: &[SqlValue], hint: &HintManager) -> Result<Vec<(String, String)>> {
        let rule = order_rule();
        let statement = SqlParsingEngine::new(DatabaseType::MySQL, sql, &rule).parse(parameters.len())?;
        let table = statement.tables.table_names().remove(0);
        let result = SimpleRoutingEngine::new(&rule, parameters, &table, &statement, hint).route()?;
        Ok(result
            .table_units()
            .units()
            .iter()
            .map(|u| (u.data_source_name.clone(), u.actual_table_name.clone()))
            .collect())
    }

    fn pairs(expected: &[(&str, &str)]) -> Vec<(String, String)> {
        expected.iter().map(|(d, t)| (d.to_string(), t.to_string())).collect()
    }

    #[test]
    fn test_modulo_routing() {
        let hint = HintManager::new();
        let units = route(
            "SELECT * FROM t_order WHERE user_id = ? AND order_id = ?",
            &[SqlValue::Int(10), SqlValue::Int(1001)],
            &hint,
        )
        .unwrap();
        assert_eq!(units, pairs(&[("ds_0", "t_order_1")]));

        let units = route("SELECT * FROM t_order WHERE user_id = ?", &[SqlValue::Int(10)], &hint).unwrap();
        assert_eq!(units, pairs(&[("ds_0", "t_order_0"), ("ds_0", "t_order_1")]));
    }

    #[test]
    fn test_full_route_without_conditions() {
        let hint = HintManager::new();
        let units = route("SELECT * FROM t_order", &[], &hint).unwrap();
        assert_eq!(
            units,
            pairs(&[
                ("ds_0", "t_order_0"),
                ("ds_0", "t_order_1"),
                ("ds_1", "t_order_0"),
                ("ds_1", "t_order_1"),
            ])
        );
    }

    #[test]
    fn test_in_and_between_deduplicate() {
        let hint = HintManager::new();
        let units = route("SELECT * FROM t_order WHERE user_id IN (1, 3, 5) AND order_id BETWEEN 2 AND 4", &[], &hint).unwrap();
        assert_eq!(units, pairs(&[("ds_1", "t_order_0"), ("ds_1", "t_order_1")]));
    }

    #[test]
    fn test_dynamic_table() {
        let hint = HintManager::new();
        let units = route("SELECT * FROM t_log WHERE order_id = 13", &[], &hint).unwrap();
        assert_eq!(units, pairs(&[("ds_0", "t_log_3"), ("ds_1", "t_log_3")]));

        let err = route("SELECT * FROM t_log", &[], &hint).unwrap_err();
        assert!(matches!(err, ShardingError::Routing(_)));
    }

    #[test]
    fn test_hint_values_replace_conditions() {
        let mut hint = HintManager::new();
        hint.add_database_sharding_value("t_order", "user_id", ShardingOperator::Equal, vec![SqlValue::Int(1)])
            .unwrap();
        hint.add_table_sharding_value("t_order", "order_id", ShardingOperator::Equal, vec![SqlValue::Int(2)])
            .unwrap();
        let units = route("SELECT * FROM t_order WHERE user_id = 2", &[], &hint).unwrap();
        assert_eq!(units, pairs(&[("ds_1", "t_order_0")]));
    }

    #[test]
    fn test_insert_needs_sharding_value() {
        let hint = HintManager::new();
        let err = route("INSERT INTO t_order_item (item_id) VALUES (1)", &[], &hint).unwrap_err();
        assert!(matches!(err, ShardingError::Routing(_)));
    }
}
