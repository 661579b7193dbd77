use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::SqlValue;

/// Condition operators that can carry sharding values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShardingOperator {
    Equal,
    In,
    Between,
}

impl ShardingOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShardingOperator::Equal => "=",
            ShardingOperator::In => "IN",
            ShardingOperator::Between => "BETWEEN",
        }
    }
}

/// Shape of the values bound to one sharding column
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ShardingValueKind {
    Single { value: SqlValue },
    List { values: Vec<SqlValue> },
    /// Inclusive on both ends
    Range { lower: SqlValue, upper: SqlValue },
}

/// Values for one (logic table, column) pair handed to a sharding algorithm
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShardingValue {
    pub logic_table_name: String,
    pub column_name: String,
    pub kind: ShardingValueKind,
}

impl ShardingValue {
    pub fn single(
        logic_table_name: impl Into<String>,
        column_name: impl Into<String>,
        value: SqlValue,
    ) -> Self {
        Self {
            logic_table_name: logic_table_name.into(),
            column_name: column_name.into(),
            kind: ShardingValueKind::Single { value },
        }
    }

    pub fn list(
        logic_table_name: impl Into<String>,
        column_name: impl Into<String>,
        values: Vec<SqlValue>,
    ) -> Self {
        Self {
            logic_table_name: logic_table_name.into(),
            column_name: column_name.into(),
            kind: ShardingValueKind::List { values },
        }
    }

    pub fn range(
        logic_table_name: impl Into<String>,
        column_name: impl Into<String>,
        lower: SqlValue,
        upper: SqlValue,
    ) -> Self {
        Self {
            logic_table_name: logic_table_name.into(),
            column_name: column_name.into(),
            kind: ShardingValueKind::Range { lower, upper },
        }
    }

    pub fn operator(&self) -> ShardingOperator {
        match self.kind {
            ShardingValueKind::Single { .. } => ShardingOperator::Equal,
            ShardingValueKind::List { .. } => ShardingOperator::In,
            ShardingValueKind::Range { .. } => ShardingOperator::Between,
        }
    }
}

impl fmt::Display for ShardingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} ", self.logic_table_name, self.column_name)?;
        match &self.kind {
            ShardingValueKind::Single { value } => write!(f, "= {}", value),
            ShardingValueKind::List { values } => {
                let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                write!(f, "IN ({})", rendered.join(", "))
            }
            ShardingValueKind::Range { lower, upper } => {
                write!(f, "BETWEEN {} AND {}", lower, upper)
            }
        }
    }
}
