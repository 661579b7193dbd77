use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, ShardingError};

const DELIMITER: char = '.';

/// Table name carried by the single node a dynamic table rule keeps per data source
pub const DYNAMIC_TABLE_PLACEHOLDER: &str = "DYNAMIC_TABLE_PLACEHOLDER";

/// A physical table location: `data_source.table`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataNode {
    pub data_source_name: String,
    pub table_name: String,
}

impl DataNode {
    pub fn new(data_source_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            table_name: table_name.into(),
        }
    }

    /// Parse `ds.table`
    ///
    /// # Errors
    /// Returns a rule error unless the text splits into exactly two non-empty segments
    pub fn parse(data_node: &str) -> Result<Self> {
        if !Self::is_valid(data_node) {
            return Err(ShardingError::Rule(format!(
                "Invalid format for actual data nodes: '{}'",
                data_node
            )));
        }
        let mut segments = data_node.split(DELIMITER);
        match (segments.next(), segments.next()) {
            (Some(ds), Some(table)) => Ok(Self::new(ds.trim(), table.trim())),
            _ => Err(ShardingError::Rule(format!(
                "Invalid format for actual data nodes: '{}'",
                data_node
            ))),
        }
    }

    /// Whether the text is a `ds.table` reference
    pub fn is_valid(data_node: &str) -> bool {
        let segments: Vec<&str> = data_node.split(DELIMITER).collect();
        segments.len() == 2 && segments.iter().all(|s| !s.trim().is_empty())
    }

    pub fn dynamic(data_source_name: impl Into<String>) -> Self {
        Self::new(data_source_name, DYNAMIC_TABLE_PLACEHOLDER)
    }

    pub fn is_dynamic(&self) -> bool {
        self.table_name == DYNAMIC_TABLE_PLACEHOLDER
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.data_source_name, DELIMITER, self.table_name)
    }
}
