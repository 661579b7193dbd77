// Sharding Strategy Evaluator
//
// A strategy binds a set of sharding columns to one algorithm and turns
// sharding values into target data source or table names.

pub mod algorithm;

pub use algorithm::*;

use crate::error::{Result, ShardingError};
use crate::models::{ShardingValue, ShardingValueKind, StatementKind};

/// Sharding columns plus the algorithm evaluating them
#[derive(Debug, Clone)]
pub struct ShardingStrategy {
    sharding_columns: Vec<String>,
    algorithm: ShardingAlgorithm,
}

impl ShardingStrategy {
    pub fn new<I, S>(sharding_columns: I, algorithm: ShardingAlgorithm) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sharding_columns: case_insensitive_set(sharding_columns.into_iter().map(Into::into)),
            algorithm,
        }
    }

    /// Strategy with no columns; every target is kept
    pub fn none() -> Self {
        Self::new(Vec::<String>::new(), ShardingAlgorithm::none())
    }

    pub fn sharding_columns(&self) -> &[String] {
        &self.sharding_columns
    }

    pub fn algorithm(&self) -> &ShardingAlgorithm {
        &self.algorithm
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.sharding_columns.iter().any(|c| c.eq_ignore_ascii_case(column))
    }

    /// Pick targets out of a known list.
    ///
    /// # Arguments
    /// * `kind` - statement kind; an INSERT may not fan out to several targets
    /// * `available_targets` - data source or actual table names to choose from
    /// * `sharding_values` - values for this strategy's columns, possibly empty
    ///
    /// # Returns
    /// Case-insensitive sorted set of target names
    pub fn do_static_sharding(
        &self,
        kind: StatementKind,
        available_targets: &[String],
        sharding_values: &[ShardingValue],
    ) -> Result<Vec<String>> {
        if sharding_values.is_empty() {
            if kind == StatementKind::Insert && available_targets.len() > 1 {
                return Err(ShardingError::Routing(
                    "INSERT statement should contain sharding value.".to_string(),
                ));
            }
            return Ok(case_insensitive_set(available_targets.iter().cloned()));
        }
        let targets = self.do_sharding(available_targets, sharding_values)?;
        Ok(case_insensitive_set(targets))
    }

    /// Compute target names without a known list, for dynamic tables.
    ///
    /// # Errors
    /// Returns error when no sharding value is present
    pub fn do_dynamic_sharding(&self, sharding_values: &[ShardingValue]) -> Result<Vec<String>> {
        if sharding_values.is_empty() {
            return Err(ShardingError::Routing(
                "Dynamic table should contain sharding value.".to_string(),
            ));
        }
        let targets = self.do_sharding(&[], sharding_values)?;
        Ok(case_insensitive_set(targets))
    }

    fn do_sharding(&self, available_targets: &[String], sharding_values: &[ShardingValue]) -> Result<Vec<String>> {
        match &self.algorithm {
            ShardingAlgorithm::None(algorithm) => {
                let value = single_value(sharding_values, "none-key")?;
                Ok(vec![algorithm.do_sharding(available_targets, value)?])
            }
            ShardingAlgorithm::SingleKey(algorithm) => {
                let value = single_value(sharding_values, "single-key")?;
                match &value.kind {
                    ShardingValueKind::Single { value } => {
                        Ok(vec![algorithm.do_equal_sharding(available_targets, value)?])
                    }
                    ShardingValueKind::List { values } => algorithm.do_in_sharding(available_targets, values),
                    ShardingValueKind::Range { lower, upper } => {
                        algorithm.do_between_sharding(available_targets, lower, upper)
                    }
                }
            }
            ShardingAlgorithm::MultipleKeys(algorithm) => algorithm.do_sharding(available_targets, sharding_values),
        }
    }
}

fn single_value<'a>(sharding_values: &'a [ShardingValue], arity: &str) -> Result<&'a ShardingValue> {
    match sharding_values {
        [value] => Ok(value),
        _ => Err(ShardingError::UnsupportedOperation(format!(
            "A {} sharding algorithm needs exactly one sharding value, got {}",
            arity,
            sharding_values.len()
        ))),
    }
}

/// Deduplicate ignoring case and sort the same way
pub fn case_insensitive_set(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for value in values {
        if !result.iter().any(|v| v.eq_ignore_ascii_case(&value)) {
            result.push(value);
        }
    }
    result.sort_by_key(|v| v.to_lowercase());
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SqlValue;

    fn targets() -> Vec<String> {
        vec!["ds_0".to_string(), "ds_1".to_string()]
    }

    fn modulo() -> ShardingStrategy {
        ShardingStrategy::new(["user_id"], ShardingAlgorithm::single_key(ModuloShardingAlgorithm::new()))
    }

    #[test]
    fn test_static_sharding_without_values() {
        let result = modulo().do_static_sharding(StatementKind::Select, &targets(), &[]).unwrap();
        assert_eq!(result, targets());
    }

    #[test]
    fn test_static_sharding_insert_requires_value() {
        let result = modulo().do_static_sharding(StatementKind::Insert, &targets(), &[]);
        assert!(result.is_err());

        let single = vec!["ds_0".to_string()];
        assert_eq!(
            modulo().do_static_sharding(StatementKind::Insert, &single, &[]).unwrap(),
            single
        );
    }

    #[test]
    fn test_static_sharding_dispatch() {
        let strategy = modulo();
        let equal = ShardingValue::single("t_order", "user_id", SqlValue::Int(11));
        assert_eq!(
            strategy.do_static_sharding(StatementKind::Select, &targets(), &[equal]).unwrap(),
            vec!["ds_1"]
        );

        let list = ShardingValue::list(
            "t_order",
            "user_id",
            vec![SqlValue::Int(1), SqlValue::Int(3), SqlValue::Int(5)],
        );
        assert_eq!(
            strategy.do_static_sharding(StatementKind::Select, &targets(), &[list]).unwrap(),
            vec!["ds_1"]
        );

        let range = ShardingValue::range("t_order", "user_id", SqlValue::Int(1), SqlValue::Int(2));
        assert_eq!(
            strategy.do_static_sharding(StatementKind::Select, &targets(), &[range]).unwrap(),
            targets()
        );
    }

    #[test]
    fn test_single_key_arity_mismatch() {
        let values = vec![
            ShardingValue::single("t_order", "user_id", SqlValue::Int(1)),
            ShardingValue::single("t_order", "order_id", SqlValue::Int(2)),
        ];
        let result = modulo().do_static_sharding(StatementKind::Select, &targets(), &values);
        assert!(matches!(result, Err(ShardingError::UnsupportedOperation(_))));
    }

    #[test]
    fn test_dynamic_sharding_requires_value() {
        let strategy = ShardingStrategy::new(
            ["order_id"],
            ShardingAlgorithm::single_key(DynamicModuloShardingAlgorithm::new("t_log_", 10).unwrap()),
        );
        assert!(strategy.do_dynamic_sharding(&[]).is_err());
        let value = ShardingValue::list("t_log", "order_id", vec![SqlValue::Int(12), SqlValue::Int(2)]);
        assert_eq!(strategy.do_dynamic_sharding(&[value]).unwrap(), vec!["t_log_2"]);
    }

    struct ConcatAlgorithm;

    impl MultipleKeysShardingAlgorithm for ConcatAlgorithm {
        fn do_sharding(&self, _available_targets: &[String], sharding_values: &[ShardingValue]) -> Result<Vec<String>> {
            Ok(vec![format!("t_{}", sharding_values.len())])
        }
    }

    #[test]
    fn test_multiple_keys_receives_all_values() {
        let strategy = ShardingStrategy::new(["a", "b"], ShardingAlgorithm::multiple_keys(ConcatAlgorithm));
        let values = vec![
            ShardingValue::single("t", "a", SqlValue::Int(1)),
            ShardingValue::single("t", "b", SqlValue::Int(2)),
        ];
        assert_eq!(strategy.do_dynamic_sharding(&values).unwrap(), vec!["t_2"]);
    }

    #[test]
    fn test_case_insensitive_columns() {
        let strategy = ShardingStrategy::new(["User_Id", "user_id"], ShardingAlgorithm::none());
        assert_eq!(strategy.sharding_columns().len(), 1);
        assert!(strategy.contains_column("USER_ID"));
    }
}
