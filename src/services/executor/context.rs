use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::models::SqlExecutionUnit;

/// Caller state handed to every execution of one request
///
/// Captured once on the calling thread and cloned into each worker task,
/// so callbacks see the same policy and data wherever they run.
#[derive(Debug, Clone)]
pub struct ExecutorContext {
    /// Rethrow callback failures; when false they are logged and the unit yields `None`
    pub exception_thrown: bool,
    pub data_map: HashMap<String, serde_json::Value>,
}

impl Default for ExecutorContext {
    fn default() -> Self {
        Self {
            exception_thrown: true,
            data_map: HashMap::new(),
        }
    }
}

impl ExecutorContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Log failures and keep going
    pub fn swallowing() -> Self {
        Self {
            exception_thrown: false,
            ..Self::default()
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data_map.insert(key.into(), value);
        self
    }
}

/// An execution unit paired with the connection it runs on.
///
/// Units sharing a connection share the `Arc`; the mutex keeps their
/// executions from interleaving.
pub struct StatementUnit<C> {
    pub execution_unit: SqlExecutionUnit,
    pub connection: Arc<Mutex<C>>,
}

impl<C> StatementUnit<C> {
    pub fn new(execution_unit: SqlExecutionUnit, connection: Arc<Mutex<C>>) -> Self {
        Self {
            execution_unit,
            connection,
        }
    }
}

impl<C> Clone for StatementUnit<C> {
    fn clone(&self) -> Self {
        Self {
            execution_unit: self.execution_unit.clone(),
            connection: Arc::clone(&self.connection),
        }
    }
}
