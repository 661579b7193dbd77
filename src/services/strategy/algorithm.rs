// Sharding Algorithms
//
// Algorithm contracts grouped by arity, plus the built-in modulo
// implementations used by rule configuration.

use std::fmt;
use std::sync::Arc;

use crate::error::{Result, ShardingError};
use crate::models::{ShardingValue, SqlValue};

/// Algorithm that takes no sharding column and picks a single target
pub trait NoneKeyShardingAlgorithm: Send + Sync {
    fn do_sharding(&self, available_targets: &[String], sharding_value: &ShardingValue) -> Result<String>;
}

/// Algorithm over exactly one sharding column
///
/// Only `do_equal_sharding` is required: IN maps every member through it and
/// BETWEEN iterates the inclusive integer range.
pub trait SingleKeyShardingAlgorithm: Send + Sync {
    fn do_equal_sharding(&self, available_targets: &[String], value: &SqlValue) -> Result<String>;

    fn do_in_sharding(&self, available_targets: &[String], values: &[SqlValue]) -> Result<Vec<String>> {
        values
            .iter()
            .map(|v| self.do_equal_sharding(available_targets, v))
            .collect()
    }

    fn do_between_sharding(
        &self,
        available_targets: &[String],
        lower: &SqlValue,
        upper: &SqlValue,
    ) -> Result<Vec<String>> {
        let (lower, upper) = match (lower.as_i64(), upper.as_i64()) {
            (Some(l), Some(u)) => (l, u),
            _ => {
                return Err(ShardingError::UnsupportedOperation(format!(
                    "BETWEEN sharding needs integer bounds, got {} and {}",
                    lower, upper
                )))
            }
        };
        let mut result = Vec::new();
        for value in lower..=upper {
            let target = self.do_equal_sharding(available_targets, &SqlValue::Int(value))?;
            if !result.contains(&target) {
                result.push(target);
            }
            // Every target already hit, the rest of the range adds nothing
            if !available_targets.is_empty() && result.len() == available_targets.len() {
                break;
            }
        }
        Ok(result)
    }
}

/// Algorithm that sees every sharding column value at once
pub trait MultipleKeysShardingAlgorithm: Send + Sync {
    fn do_sharding(&self, available_targets: &[String], sharding_values: &[ShardingValue]) -> Result<Vec<String>>;
}

/// Sharding algorithm tagged by arity
#[derive(Clone)]
pub enum ShardingAlgorithm {
    None(Arc<dyn NoneKeyShardingAlgorithm>),
    SingleKey(Arc<dyn SingleKeyShardingAlgorithm>),
    MultipleKeys(Arc<dyn MultipleKeysShardingAlgorithm>),
}

impl ShardingAlgorithm {
    pub fn none() -> Self {
        ShardingAlgorithm::None(Arc::new(NoneShardingAlgorithm))
    }

    pub fn single_key(algorithm: impl SingleKeyShardingAlgorithm + 'static) -> Self {
        ShardingAlgorithm::SingleKey(Arc::new(algorithm))
    }

    pub fn multiple_keys(algorithm: impl MultipleKeysShardingAlgorithm + 'static) -> Self {
        ShardingAlgorithm::MultipleKeys(Arc::new(algorithm))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ShardingAlgorithm::None(_) => "none",
            ShardingAlgorithm::SingleKey(_) => "single_key",
            ShardingAlgorithm::MultipleKeys(_) => "multiple_keys",
        }
    }
}

impl fmt::Debug for ShardingAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShardingAlgorithm::{}", self.kind())
    }
}

/// Picks the first available target
#[derive(Debug, Clone, Default)]
pub struct NoneShardingAlgorithm;

impl NoneKeyShardingAlgorithm for NoneShardingAlgorithm {
    fn do_sharding(&self, available_targets: &[String], _sharding_value: &ShardingValue) -> Result<String> {
        available_targets
            .first()
            .cloned()
            .ok_or_else(|| ShardingError::Routing("No available targets to shard to".to_string()))
    }
}

/// Picks the target whose name ends with `value % modulus`
///
/// Without an explicit modulus the number of available targets is used.
#[derive(Debug, Clone, Default)]
pub struct ModuloShardingAlgorithm {
    modulus: Option<u64>,
}

impl ModuloShardingAlgorithm {
    pub fn new() -> Self {
        Self { modulus: None }
    }

    pub fn with_modulus(modulus: u64) -> Self {
        Self {
            modulus: Some(modulus),
        }
    }
}

impl SingleKeyShardingAlgorithm for ModuloShardingAlgorithm {
    fn do_equal_sharding(&self, available_targets: &[String], value: &SqlValue) -> Result<String> {
        let number = value.as_i64().ok_or_else(|| {
            ShardingError::UnsupportedOperation(format!("Modulo sharding needs an integer value, got {}", value))
        })?;
        let modulus = self.modulus.unwrap_or(available_targets.len() as u64) as i64;
        if modulus == 0 {
            return Err(ShardingError::Routing("No available targets to shard to".to_string()));
        }
        let suffix = number.rem_euclid(modulus).to_string();
        available_targets
            .iter()
            .find(|t| t.ends_with(&suffix))
            .cloned()
            .ok_or_else(|| {
                ShardingError::Routing(format!(
                    "No target in {:?} ends with '{}' for value {}",
                    available_targets, suffix, value
                ))
            })
    }
}

/// Builds `prefix + value % modulus` for dynamic tables; available targets are ignored
#[derive(Debug, Clone)]
pub struct DynamicModuloShardingAlgorithm {
    prefix: String,
    modulus: u64,
}

impl DynamicModuloShardingAlgorithm {
    pub fn new(prefix: impl Into<String>, modulus: u64) -> Result<Self> {
        if modulus == 0 {
            return Err(ShardingError::Rule("Dynamic modulo needs a positive modulus".to_string()));
        }
        Ok(Self {
            prefix: prefix.into(),
            modulus,
        })
    }
}

impl SingleKeyShardingAlgorithm for DynamicModuloShardingAlgorithm {
    fn do_equal_sharding(&self, _available_targets: &[String], value: &SqlValue) -> Result<String> {
        let number = value.as_i64().ok_or_else(|| {
            ShardingError::UnsupportedOperation(format!("Modulo sharding needs an integer value, got {}", value))
        })?;
        Ok(format!("{}{}", self.prefix, number.rem_euclid(self.modulus as i64)))
    }

    fn do_between_sharding(&self, available_targets: &[String], lower: &SqlValue, upper: &SqlValue) -> Result<Vec<String>> {
        let (lower, upper) = match (lower.as_i64(), upper.as_i64()) {
            (Some(l), Some(u)) => (l, u),
            _ => {
                return Err(ShardingError::UnsupportedOperation(format!(
                    "BETWEEN sharding needs integer bounds, got {} and {}",
                    lower, upper
                )))
            }
        };
        // At most `modulus` distinct tables exist
        let upper = upper.min(lower.saturating_add(self.modulus as i64 - 1));
        let mut result = Vec::new();
        for value in lower..=upper {
            let target = self.do_equal_sharding(available_targets, &SqlValue::Int(value))?;
            if !result.contains(&target) {
                result.push(target);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets() -> Vec<String> {
        vec!["t_order_0".to_string(), "t_order_1".to_string()]
    }

    #[test]
    fn test_modulo_equal() {
        let algorithm = ModuloShardingAlgorithm::new();
        assert_eq!(algorithm.do_equal_sharding(&targets(), &SqlValue::Int(10)).unwrap(), "t_order_0");
        assert_eq!(algorithm.do_equal_sharding(&targets(), &SqlValue::Int(11)).unwrap(), "t_order_1");
        assert_eq!(algorithm.do_equal_sharding(&targets(), &SqlValue::Text("7".into())).unwrap(), "t_order_1");
        assert!(algorithm.do_equal_sharding(&targets(), &SqlValue::Text("abc".into())).is_err());
    }

    #[test]
    fn test_modulo_between_stops_when_all_targets_hit() {
        let algorithm = ModuloShardingAlgorithm::new();
        let result = algorithm
            .do_between_sharding(&targets(), &SqlValue::Int(0), &SqlValue::Int(1_000_000_000))
            .unwrap();
        assert_eq!(result, targets());
    }

    #[test]
    fn test_modulo_without_match() {
        let algorithm = ModuloShardingAlgorithm::with_modulus(4);
        assert!(algorithm.do_equal_sharding(&targets(), &SqlValue::Int(3)).is_err());
    }

    #[test]
    fn test_dynamic_modulo() {
        let algorithm = DynamicModuloShardingAlgorithm::new("t_log_", 10).unwrap();
        assert_eq!(algorithm.do_equal_sharding(&[], &SqlValue::Int(23)).unwrap(), "t_log_3");
        let range = algorithm
            .do_between_sharding(&[], &SqlValue::Int(8), &SqlValue::Int(100))
            .unwrap();
        assert_eq!(range.len(), 10);
        assert!(DynamicModuloShardingAlgorithm::new("t_", 0).is_err());
    }

    #[test]
    fn test_none_algorithm() {
        let value = ShardingValue::single("t_order", "user_id", SqlValue::Int(1));
        assert_eq!(NoneShardingAlgorithm.do_sharding(&targets(), &value).unwrap(), "t_order_0");
        assert!(NoneShardingAlgorithm.do_sharding(&[], &value).is_err());
    }
}
