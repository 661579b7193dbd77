// SQL Routing
//
// Turns one logical SQL plus its parameters into execution units. The
// parsing router parses, routes and rewrites; the database hint router
// skips parsing and sends the SQL as written to the hinted data sources.
// `SqlRouteEngine` is the entry point choosing between the two per request.

pub mod cartesian;
pub mod complex;
pub mod hint;
pub mod simple;

pub use cartesian::CartesianRoutingEngine;
pub use complex::ComplexRoutingEngine;
pub use hint::DatabaseHintRoutingEngine;
pub use simple::SimpleRoutingEngine;

use std::sync::Arc;

use crate::error::{Result, ShardingError};
use crate::models::{
    RoutingResult, ShardingRule, SqlExecutionUnit, SqlRouteResult, SqlStatement, SqlValue, TableUnit, TableUnits,
};
use crate::services::hint::HintManager;
use crate::services::parsing::{DatabaseType, SqlJudgeEngine, SqlParsingEngine};
use crate::services::rewrite::SqlRewriteEngine;

/// Produces the physical tables a statement touches
pub trait RoutingEngine {
    fn route(&self) -> Result<RoutingResult>;
}

/// Everything a router needs besides the request itself
#[derive(Debug, Clone)]
pub struct ShardingContext {
    pub sharding_rule: Arc<ShardingRule>,
    pub database_type: DatabaseType,
    /// Log logical and actual SQL at info level
    pub show_sql: bool,
}

impl ShardingContext {
    pub fn new(sharding_rule: Arc<ShardingRule>, database_type: DatabaseType, show_sql: bool) -> Self {
        Self {
            sharding_rule,
            database_type,
            show_sql,
        }
    }
}

pub trait SqlRouter {
    /// Analyse the logical SQL as far as this router needs.
    fn parse(&self, logic_sql: &str, parameters_size: usize) -> Result<SqlStatement>;

    /// Route an analysed statement to execution units.
    fn route(
        &self,
        logic_sql: &str,
        parameters: &[SqlValue],
        statement: SqlStatement,
        hint: &HintManager,
    ) -> Result<SqlRouteResult>;
}

/// Parse, route and rewrite
pub struct ParsingSqlRouter {
    context: ShardingContext,
}

impl ParsingSqlRouter {
    pub fn new(context: ShardingContext) -> Self {
        Self { context }
    }

    fn route_tables(&self, parameters: &[SqlValue], statement: &SqlStatement, hint: &HintManager) -> Result<RoutingResult> {
        let rule = self.context.sharding_rule.as_ref();
        let table_names = statement.tables.table_names();
        if table_names.is_empty() {
            return route_to_default_data_source(rule);
        }
        if table_names.len() == 1 || rule.is_all_binding_tables(&table_names) {
            return SimpleRoutingEngine::new(rule, parameters, &table_names[0], statement, hint).route();
        }
        ComplexRoutingEngine::new(rule, parameters, &table_names, statement, hint).route()
    }

    /// Fill in the generated key; a deferred key is inserted into the
    /// parameters where its placeholder sits in the rewritten SQL
    fn process_generated_key(&self, statement: &SqlStatement, result: &mut SqlRouteResult) -> Result<()> {
        let Some(generated_key) = statement.generated_key.as_ref() else {
            return Ok(());
        };
        let Some(table_name) = statement.tables.single_table_name() else {
            return Ok(());
        };
        match (generated_key.value, generated_key.parameter_index) {
            (Some(value), _) => result.generated_keys.push(value),
            (None, Some(index)) if generated_key.deferred => {
                if index > result.parameters.len() {
                    return Err(ShardingError::Routing(format!(
                        "Generated key placeholder {} is out of range for {} parameters",
                        index,
                        result.parameters.len()
                    )));
                }
                let value = self.context.sharding_rule.generate_key(table_name)?;
                result.parameters.insert(index, SqlValue::Int(value));
                result.generated_keys.push(value);
            }
            (None, Some(index)) => {
                if let Some(value) = result.parameters.get(index).and_then(SqlValue::as_i64) {
                    result.generated_keys.push(value);
                }
            }
            (None, None) => {}
        }
        Ok(())
    }
}

fn route_to_default_data_source(rule: &ShardingRule) -> Result<RoutingResult> {
    let data_source = rule.default_data_source_name().ok_or_else(|| {
        ShardingError::Routing("Cannot route a statement without tables: no default data source".to_string())
    })?;
    let mut units = TableUnits::default();
    units.add(TableUnit::new(data_source, "", ""));
    Ok(RoutingResult::Units(units))
}

impl SqlRouter for ParsingSqlRouter {
    fn parse(&self, logic_sql: &str, parameters_size: usize) -> Result<SqlStatement> {
        SqlParsingEngine::new(self.context.database_type, logic_sql, &self.context.sharding_rule).parse(parameters_size)
    }

    fn route(
        &self,
        logic_sql: &str,
        parameters: &[SqlValue],
        statement: SqlStatement,
        hint: &HintManager,
    ) -> Result<SqlRouteResult> {
        let mut result = SqlRouteResult::new(statement.clone(), parameters.to_vec());
        self.process_generated_key(&statement, &mut result)?;

        let routing_result = self.route_tables(&result.parameters, &statement, hint)?;
        let is_single_routing = routing_result.is_single_routing();
        let rewrite_engine =
            SqlRewriteEngine::new(&self.context.sharding_rule, logic_sql, &statement, &result.parameters);
        let builder = rewrite_engine.rewrite(!is_single_routing)?;

        let mut execution_units = Vec::new();
        match &routing_result {
            RoutingResult::Units(units) => {
                for unit in units.units() {
                    let sql = rewrite_engine.generate_sql(unit, &builder)?;
                    execution_units.push(SqlExecutionUnit::new(unit.data_source_name.as_str(), sql));
                }
            }
            RoutingResult::Cartesian(cartesian) => {
                for data_source in &cartesian.data_sources {
                    for reference in &data_source.table_references {
                        let sql = rewrite_engine.generate_reference_sql(reference, &builder)?;
                        execution_units.push(SqlExecutionUnit::new(data_source.data_source_name.as_str(), sql));
                    }
                }
            }
        }

        if !is_single_routing {
            if let Some(limit) = statement.limit.as_ref() {
                limit.rewrite_parameters(&mut result.parameters, statement.needs_fetch_all())?;
            }
        }
        result.execution_units = execution_units;
        Ok(result)
    }
}

/// Route by the hinted database value; the SQL is never rewritten
pub struct DatabaseHintSqlRouter {
    context: ShardingContext,
}

impl DatabaseHintSqlRouter {
    pub fn new(context: ShardingContext) -> Self {
        Self { context }
    }
}

impl SqlRouter for DatabaseHintSqlRouter {
    fn parse(&self, logic_sql: &str, _parameters_size: usize) -> Result<SqlStatement> {
        SqlJudgeEngine::new(self.context.database_type, logic_sql).judge()
    }

    fn route(
        &self,
        logic_sql: &str,
        parameters: &[SqlValue],
        statement: SqlStatement,
        hint: &HintManager,
    ) -> Result<SqlRouteResult> {
        let routing_result =
            DatabaseHintRoutingEngine::new(&self.context.sharding_rule, statement.kind, hint).route()?;
        let mut result = SqlRouteResult::new(statement, parameters.to_vec());
        for unit in routing_result.table_units().units() {
            result
                .execution_units
                .push(SqlExecutionUnit::new(unit.data_source_name.as_str(), logic_sql));
        }
        Ok(result)
    }
}

/// Entry point for routing one logical statement
#[derive(Debug, Clone)]
pub struct SqlRouteEngine {
    context: ShardingContext,
}

impl SqlRouteEngine {
    pub fn new(context: ShardingContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &ShardingContext {
        &self.context
    }

    /// Route one logical SQL.
    ///
    /// # Arguments
    /// * `logic_sql` - SQL written against logic tables
    /// * `parameters` - Bound parameters, positional
    /// * `hint` - Request hint values; a database-only hint skips parsing
    ///
    /// # Returns
    /// Execution units in routing order, with the parameters to bind on each
    pub fn route(&self, logic_sql: &str, parameters: &[SqlValue], hint: &HintManager) -> Result<SqlRouteResult> {
        let result = if hint.is_database_sharding_only() {
            self.route_with(&DatabaseHintSqlRouter::new(self.context.clone()), logic_sql, parameters, hint)?
        } else {
            self.route_with(&ParsingSqlRouter::new(self.context.clone()), logic_sql, parameters, hint)?
        };
        tracing::debug!(
            "Routed {} to {} execution units",
            result.sql_statement.kind.as_str(),
            result.execution_units.len()
        );
        Ok(result)
    }

    fn route_with<R: SqlRouter>(
        &self,
        router: &R,
        logic_sql: &str,
        parameters: &[SqlValue],
        hint: &HintManager,
    ) -> Result<SqlRouteResult> {
        let statement = router.parse(logic_sql, parameters.len())?;
        let result = router.route(logic_sql, parameters, statement, hint)?;
        if self.context.show_sql {
            log_sql(logic_sql, &result);
        }
        Ok(result)
    }
}

fn log_sql(logic_sql: &str, result: &SqlRouteResult) {
    tracing::info!("Logic SQL: {}", logic_sql);
    tracing::info!("SQLStatement: {:?}", result.sql_statement);
    for unit in &result.execution_units {
        if result.parameters.is_empty() {
            tracing::info!("Actual SQL: {} ::: {}", unit.data_source, unit.sql);
        } else {
            tracing::info!("Actual SQL: {} ::: {} ::: {:?}", unit.data_source, unit.sql, result.parameters);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::order_rule;

    fn engine() -> SqlRouteEngine {
        SqlRouteEngine::new(ShardingContext::new(Arc::new(order_rule()), DatabaseType::MySQL, true))
    }

    fn units(result: &SqlRouteResult) -> Vec<(&str, &str)> {
        result
            .execution_units
            .iter()
            .map(|u| (u.data_source.as_str(), u.sql.as_str()))
            .collect()
    }

    #[test]
    fn test_two_data_sources_two_tables() {
        let result = engine()
            .route("SELECT * FROM t_order", &[], &HintManager::new())
            .unwrap();
        assert_eq!(
            units(&result),
            vec![
                ("ds_0", "SELECT * FROM t_order_0"),
                ("ds_0", "SELECT * FROM t_order_1"),
                ("ds_1", "SELECT * FROM t_order_0"),
                ("ds_1", "SELECT * FROM t_order_1"),
            ]
        );

        let result = engine()
            .route(
                "SELECT * FROM t_order WHERE user_id = ? AND order_id = ?",
                &[SqlValue::Int(11), SqlValue::Int(20)],
                &HintManager::new(),
            )
            .unwrap();
        assert_eq!(
            units(&result),
            vec![("ds_1", "SELECT * FROM t_order_0 WHERE user_id = ? AND order_id = ?")]
        );
    }

    #[test]
    fn test_generated_key_extends_parameters() {
        let result = engine()
            .route(
                "INSERT INTO t_order (user_id, status) VALUES (?, ?)",
                &[SqlValue::Int(10), SqlValue::Text("INIT".to_string())],
                &HintManager::new(),
            )
            .unwrap();
        assert_eq!(result.generated_keys, vec![1000]);
        assert_eq!(
            result.parameters,
            vec![SqlValue::Int(10), SqlValue::Text("INIT".to_string()), SqlValue::Int(1000)]
        );
        assert_eq!(
            units(&result),
            vec![("ds_0", "INSERT INTO t_order_0 (user_id, status, order_id) VALUES (?, ?, ?)")]
        );
    }

    #[test]
    fn test_generated_key_before_trailing_parameters() {
        let result = engine()
            .route(
                "INSERT INTO t_order (user_id, status) VALUES (?, ?) ON DUPLICATE KEY UPDATE status = ?",
                &[
                    SqlValue::Int(10),
                    SqlValue::Text("A".to_string()),
                    SqlValue::Text("B".to_string()),
                ],
                &HintManager::new(),
            )
            .unwrap();
        assert_eq!(result.generated_keys, vec![1000]);
        assert_eq!(
            result.parameters,
            vec![
                SqlValue::Int(10),
                SqlValue::Text("A".to_string()),
                SqlValue::Int(1000),
                SqlValue::Text("B".to_string()),
            ]
        );
        assert_eq!(
            units(&result),
            vec![(
                "ds_0",
                "INSERT INTO t_order_0 (user_id, status, order_id) VALUES (?, ?, ?) ON DUPLICATE KEY UPDATE status = ?"
            )]
        );
    }

    #[test]
    fn test_supplied_key_is_reported() {
        let result = engine()
            .route(
                "INSERT INTO t_order (user_id, order_id) VALUES (?, ?)",
                &[SqlValue::Int(10), SqlValue::Int(7)],
                &HintManager::new(),
            )
            .unwrap();
        assert_eq!(result.generated_keys, vec![7]);
        assert_eq!(
            units(&result),
            vec![("ds_0", "INSERT INTO t_order_1 (user_id, order_id) VALUES (?, ?)")]
        );
    }

    #[test]
    fn test_limit_parameters_single_and_multiple() {
        let sql = "SELECT * FROM t_order WHERE user_id = ? ORDER BY order_id LIMIT ?, ?";
        let parameters = [SqlValue::Int(10), SqlValue::Int(2), SqlValue::Int(10)];
        let result = engine().route(sql, &parameters, &HintManager::new()).unwrap();
        assert_eq!(result.execution_units.len(), 2);
        assert_eq!(result.parameters, vec![SqlValue::Int(10), SqlValue::Int(0), SqlValue::Int(12)]);

        let sql = "SELECT * FROM t_order WHERE user_id = ? AND order_id = ? ORDER BY order_id LIMIT ?, ?";
        let parameters = [SqlValue::Int(10), SqlValue::Int(3), SqlValue::Int(2), SqlValue::Int(10)];
        let result = engine().route(sql, &parameters, &HintManager::new()).unwrap();
        assert_eq!(result.execution_units.len(), 1);
        assert_eq!(result.parameters, parameters.to_vec());
    }

    #[test]
    fn test_limit_parameters_saturate() {
        let sql = "SELECT * FROM t_order ORDER BY order_id LIMIT ?, ?";
        let parameters = [SqlValue::Int(5), SqlValue::Int(i64::MAX)];
        let result = engine().route(sql, &parameters, &HintManager::new()).unwrap();
        assert_eq!(result.execution_units.len(), 4);
        assert_eq!(result.parameters, vec![SqlValue::Int(0), SqlValue::Int(i64::MAX)]);
    }

    #[test]
    fn test_cartesian_units() {
        let sql = "SELECT * FROM t_order o JOIN t_user u ON o.user_id = u.id WHERE o.user_id = ? AND u.user_id = ?";
        let result = engine()
            .route(sql, &[SqlValue::Int(10), SqlValue::Int(10)], &HintManager::new())
            .unwrap();
        assert_eq!(result.execution_units.len(), 4);
        assert!(result.execution_units.iter().all(|u| u.data_source == "ds_0"));
        assert_eq!(
            result.execution_units[0].sql,
            "SELECT * FROM t_order_0 o JOIN t_user_0 u ON o.user_id = u.id WHERE o.user_id = ? AND u.user_id = ?"
        );
    }

    #[test]
    fn test_binding_tables_route_as_one() {
        let sql = "SELECT i.* FROM t_order o JOIN t_order_item i ON o.order_id = i.order_id WHERE o.order_id IN (?, ?)";
        let result = engine()
            .route(sql, &[SqlValue::Int(10), SqlValue::Int(11)], &HintManager::new())
            .unwrap();
        assert_eq!(result.execution_units.len(), 4);
        assert_eq!(
            result.execution_units[1].sql,
            "SELECT i.* FROM t_order_1 o JOIN t_order_item_1 i ON o.order_id = i.order_id WHERE o.order_id IN (?, ?)"
        );
    }

    #[test]
    fn test_database_hint_skips_parsing() {
        let mut hint = HintManager::new();
        hint.set_database_sharding_value(SqlValue::Int(1));
        let sql = "SELECT * FROM anything WHERE a = 1 OR b = 2";
        let result = engine().route(sql, &[], &hint).unwrap();
        assert_eq!(units(&result), vec![("ds_1", sql)]);
    }

    #[test]
    fn test_no_tables_without_default_data_source() {
        let err = engine().route("SELECT 1", &[], &HintManager::new()).unwrap_err();
        assert!(matches!(err, ShardingError::Routing(_)));
    }

    #[test]
    fn test_parse_errors_abort_routing() {
        let err = engine()
            .route("SELECT * FROM t_order WHERE user_id = 1 OR user_id = 2", &[], &HintManager::new())
            .unwrap_err();
        assert!(matches!(err, ShardingError::UnsupportedSql(_)));
    }
}
