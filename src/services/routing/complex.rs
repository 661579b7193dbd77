use crate::error::{Result, ShardingError};
use crate::models::{RoutingResult, ShardingRule, SqlStatement, SqlValue};
use crate::services::hint::HintManager;

use super::cartesian::CartesianRoutingEngine;
use super::simple::SimpleRoutingEngine;
use super::RoutingEngine;

/// Several logic tables that are not all bound together
pub struct ComplexRoutingEngine<'a> {
    sharding_rule: &'a ShardingRule,
    parameters: &'a [SqlValue],
    logic_tables: &'a [String],
    statement: &'a SqlStatement,
    hint: &'a HintManager,
}

impl<'a> ComplexRoutingEngine<'a> {
    pub fn new(
        sharding_rule: &'a ShardingRule,
        parameters: &'a [SqlValue],
        logic_tables: &'a [String],
        statement: &'a SqlStatement,
        hint: &'a HintManager,
    ) -> Self {
        Self {
            sharding_rule,
            parameters,
            logic_tables,
            statement,
            hint,
        }
    }
}

impl RoutingEngine for ComplexRoutingEngine<'_> {
    fn route(&self) -> Result<RoutingResult> {
        let mut results = Vec::new();
        let mut bound_tables: Vec<String> = Vec::new();
        for logic_table in self.logic_tables {
            if self.sharding_rule.try_find_table_rule(logic_table).is_none() {
                continue;
            }
            // one member of a binding group routes the whole group
            if bound_tables.iter().any(|t| t.eq_ignore_ascii_case(logic_table)) {
                continue;
            }
            let routed = SimpleRoutingEngine::new(
                self.sharding_rule,
                self.parameters,
                logic_table,
                self.statement,
                self.hint,
            )
            .route()?;
            results.push(routed.table_units().clone());
            if let Some(binding_rule) = self.sharding_rule.find_binding_table_rule(logic_table) {
                bound_tables.extend(binding_rule.logic_tables());
            }
        }
        match results.len() {
            0 => Err(ShardingError::Routing(format!(
                "Cannot find table rule and default data source with logic tables: '{:?}'",
                self.logic_tables
            ))),
            1 => Ok(RoutingResult::Units(results.remove(0))),
            _ => {
                tracing::debug!("Cartesian routing over {} tables", results.len());
                CartesianRoutingEngine::new(results).route()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::order_rule;
    use crate::services::parsing::{DatabaseType, SqlParsingEngine};

    fn route(sql: &str, parameters: &[SqlValue]) -> Result<RoutingResult> {
        let rule = order_rule();
        let hint = HintManager::new();
        let statement = SqlParsingEngine::new(DatabaseType::MySQL, sql, &rule).parse(parameters.len())?;
        let tables = statement.tables.table_names();
        ComplexRoutingEngine::new(&rule, parameters, &tables, &statement, &hint).route()
    }

    #[test]
    fn test_cartesian_two_by_two() {
        let result = route(
            "SELECT * FROM t_order o JOIN t_user u ON o.user_id = u.id WHERE o.user_id = ? AND u.user_id = ?",
            &[SqlValue::Int(10), SqlValue::Int(10)],
        )
        .unwrap();
        let RoutingResult::Cartesian(cartesian) = result else {
            panic!("expected cartesian result");
        };
        assert_eq!(cartesian.data_sources.len(), 1);
        assert_eq!(cartesian.data_sources[0].data_source_name, "ds_0");
        assert_eq!(cartesian.data_sources[0].table_references.len(), 4);
    }

    #[test]
    fn test_binding_partner_routes_once() {
        let result = route(
            "SELECT * FROM t_order o JOIN t_order_item i ON o.order_id = i.order_id JOIN t_user u ON u.id = o.user_id \
             WHERE o.user_id = 1 AND o.order_id = 2 AND u.id = 3 AND u.user_id = 1",
            &[],
        )
        .unwrap();
        let units: Vec<String> = result
            .table_units()
            .units()
            .iter()
            .map(|u| format!("{}.{}", u.data_source_name, u.actual_table_name))
            .collect();
        assert_eq!(units, vec!["ds_1.t_order_0", "ds_1.t_user_1"]);
    }

    #[test]
    fn test_unknown_tables_only() {
        let err = route("SELECT * FROM a, b", &[]).unwrap_err();
        assert!(matches!(err, ShardingError::Routing(_)));
    }
}
