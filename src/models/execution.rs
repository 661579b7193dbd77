use serde::Serialize;

use crate::models::{SqlStatement, SqlValue};

/// A physical SQL bound to the data source it runs on
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SqlExecutionUnit {
    pub data_source: String,
    pub sql: String,
}

impl SqlExecutionUnit {
    pub fn new(data_source: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            data_source: data_source.into(),
            sql: sql.into(),
        }
    }
}

/// Output of routing one logical SQL
#[derive(Debug, Clone, Serialize)]
pub struct SqlRouteResult {
    #[serde(skip)]
    pub sql_statement: SqlStatement,
    pub execution_units: Vec<SqlExecutionUnit>,
    /// Parameters to bind on every unit, after generated-key and LIMIT rewriting
    pub parameters: Vec<SqlValue>,
    pub generated_keys: Vec<i64>,
}

impl SqlRouteResult {
    pub fn new(sql_statement: SqlStatement, parameters: Vec<SqlValue>) -> Self {
        Self {
            sql_statement,
            execution_units: Vec::new(),
            parameters,
            generated_keys: Vec::new(),
        }
    }
}
