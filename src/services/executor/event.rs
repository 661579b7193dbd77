use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{SqlExecutionUnit, SqlType, SqlValue};

/// Lifecycle phase of one physical execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionPhase {
    BeforeExecute,
    ExecuteSuccess,
    ExecuteFailure,
}

/// Published once per phase for each (unit, parameter set) pair
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionEvent {
    /// Shared by the before and after events of the same execution
    pub id: Uuid,
    pub sql_type: SqlType,
    pub phase: ExecutionPhase,
    pub data_source: String,
    pub sql: String,
    pub parameters: Vec<SqlValue>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionEvent {
    pub fn before(sql_type: SqlType, unit: &SqlExecutionUnit, parameters: Vec<SqlValue>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sql_type,
            phase: ExecutionPhase::BeforeExecute,
            data_source: unit.data_source.clone(),
            sql: unit.sql.clone(),
            parameters,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn set_success(&mut self) {
        self.phase = ExecutionPhase::ExecuteSuccess;
        self.timestamp = Utc::now();
    }

    pub fn set_failure(&mut self, error: &str) {
        self.phase = ExecutionPhase::ExecuteFailure;
        self.error = Some(error.to_string());
        self.timestamp = Utc::now();
    }
}

pub trait ExecutionEventListener: Send + Sync {
    fn on_event(&self, event: &ExecutionEvent);
}

/// Logs every event through `tracing`
#[derive(Debug, Default)]
pub struct TracingEventListener;

impl ExecutionEventListener for TracingEventListener {
    fn on_event(&self, event: &ExecutionEvent) {
        match event.phase {
            ExecutionPhase::BeforeExecute => tracing::debug!(
                "Before execute {} on {}: {}",
                event.sql_type.as_str(),
                event.data_source,
                event.sql
            ),
            ExecutionPhase::ExecuteSuccess => {
                tracing::debug!("Execute success on {}: {}", event.data_source, event.sql)
            }
            ExecutionPhase::ExecuteFailure => tracing::warn!(
                "Execute failure on {}: {} ({})",
                event.data_source,
                event.sql,
                event.error.as_deref().unwrap_or_default()
            ),
        }
    }
}

/// Listeners registered on one executor; publishing never blocks registration for long
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Arc<dyn ExecutionEventListener>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, listener: Arc<dyn ExecutionEventListener>) {
        let mut listeners = self.listeners.write().unwrap_or_else(|e| e.into_inner());
        listeners.push(listener);
    }

    pub fn publish(&self, event: &ExecutionEvent) {
        let listeners = self.listeners.read().unwrap_or_else(|e| e.into_inner());
        for listener in listeners.iter() {
            listener.on_event(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
