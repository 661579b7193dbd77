use crate::error::{Result, ShardingError};
use crate::models::{RoutingResult, ShardingRule, StatementKind, TableUnit, TableUnits};
use crate::services::hint::{HintManager, DB_COLUMN_NAME, DB_TABLE_NAME};

use super::RoutingEngine;

/// Picks data sources from the hinted database value alone; tables are not touched
pub struct DatabaseHintRoutingEngine<'a> {
    sharding_rule: &'a ShardingRule,
    kind: StatementKind,
    hint: &'a HintManager,
}

impl<'a> DatabaseHintRoutingEngine<'a> {
    pub fn new(sharding_rule: &'a ShardingRule, kind: StatementKind, hint: &'a HintManager) -> Self {
        Self {
            sharding_rule,
            kind,
            hint,
        }
    }
}

impl RoutingEngine for DatabaseHintRoutingEngine<'_> {
    fn route(&self) -> Result<RoutingResult> {
        let value = self
            .hint
            .database_sharding_value(DB_TABLE_NAME, DB_COLUMN_NAME)
            .ok_or_else(|| ShardingError::Routing("No database sharding value in hint".to_string()))?;
        tracing::debug!("Database hint value: {:?}", value);
        let data_sources = self.sharding_rule.default_database_strategy().do_static_sharding(
            self.kind,
            self.sharding_rule.data_source_names(),
            std::slice::from_ref(value),
        )?;
        if data_sources.is_empty() {
            return Err(ShardingError::Routing("no database route info".to_string()));
        }
        let mut units = TableUnits::default();
        for data_source in data_sources {
            units.add(TableUnit::new(data_source, "", ""));
        }
        Ok(RoutingResult::Units(units))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::order_rule;
    use crate::models::SqlValue;

    #[test]
    fn test_route_by_database_value() {
        let rule = order_rule();
        let mut hint = HintManager::new();
        hint.set_database_sharding_value(SqlValue::Int(3));
        let result = DatabaseHintRoutingEngine::new(&rule, StatementKind::Select, &hint)
            .route()
            .unwrap();
        let units = result.table_units().units();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].data_source_name, "ds_1");
        assert!(units[0].actual_table_name.is_empty());
    }

    #[test]
    fn test_missing_value() {
        let rule = order_rule();
        let hint = HintManager::new();
        let err = DatabaseHintRoutingEngine::new(&rule, StatementKind::Select, &hint)
            .route()
            .unwrap_err();
        assert!(matches!(err, ShardingError::Routing(_)));
    }
}
