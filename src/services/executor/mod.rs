// Executor Engine
//
// Runs routed statement units in parallel. The first unit runs on the
// calling thread while the rest go to a bounded pool of blocking workers;
// results come back in input order. Every execution publishes before,
// success and failure events to the registered listeners.

pub mod context;
pub mod event;

pub use context::*;
pub use event::*;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::runtime::Runtime;

use crate::config::ExecutorConfig;
use crate::error::{Result, ShardingError};
use crate::models::{SqlExecutionUnit, SqlType, SqlValue};

const WORKER_THREAD_NAME: &str = "sharding-executor";

pub struct ExecutorEngine {
    runtime: Option<Runtime>,
    event_bus: Arc<EventBus>,
    in_flight: Arc<AtomicUsize>,
    closed: AtomicBool,
    shutdown_timeout: Duration,
}

impl ExecutorEngine {
    /// Create an engine with at most `size` worker threads.
    ///
    /// # Errors
    /// Returns error when `size` is zero or the worker pool cannot start
    pub fn new(size: usize, shutdown_timeout: Duration) -> Result<Self> {
        if size == 0 {
            return Err(ShardingError::Configuration(
                "Executor size must be greater than 0".to_string(),
            ));
        }
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(size)
            .thread_name(WORKER_THREAD_NAME)
            .enable_all()
            .build()
            .map_err(|e| ShardingError::Internal(format!("Failed to start executor pool: {}", e)))?;
        let event_bus = Arc::new(EventBus::new());
        event_bus.register(Arc::new(TracingEventListener));
        tracing::info!("Executor engine started with {} workers", size);
        Ok(Self {
            runtime: Some(runtime),
            event_bus,
            in_flight: Arc::new(AtomicUsize::new(0)),
            closed: AtomicBool::new(false),
            shutdown_timeout,
        })
    }

    pub fn from_config(config: &ExecutorConfig) -> Result<Self> {
        Self::new(config.size, Duration::from_secs(config.shutdown_timeout_secs))
    }

    pub fn register_listener(&self, listener: Arc<dyn ExecutionEventListener>) {
        self.event_bus.register(listener);
    }

    /// Execute units without bound parameters
    pub fn execute_statement<C, T, F>(
        &self,
        sql_type: SqlType,
        units: Vec<StatementUnit<C>>,
        context: &ExecutorContext,
        callback: F,
    ) -> Result<Vec<Option<T>>>
    where
        C: Send + 'static,
        T: Send + 'static,
        F: Fn(&SqlExecutionUnit, &mut C, &ExecutorContext) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.execute(sql_type, units, &[], context, callback)
    }

    /// Execute units bound to one parameter list
    pub fn execute_prepared_statement<C, T, F>(
        &self,
        sql_type: SqlType,
        units: Vec<StatementUnit<C>>,
        parameters: &[SqlValue],
        context: &ExecutorContext,
        callback: F,
    ) -> Result<Vec<Option<T>>>
    where
        C: Send + 'static,
        T: Send + 'static,
        F: Fn(&SqlExecutionUnit, &mut C, &ExecutorContext) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.execute(sql_type, units, &[parameters.to_vec()], context, callback)
    }

    /// Execute units, each carrying a batch of parameter lists
    pub fn execute_batch<C, T, F>(
        &self,
        sql_type: SqlType,
        units: Vec<StatementUnit<C>>,
        parameter_sets: &[Vec<SqlValue>],
        context: &ExecutorContext,
        callback: F,
    ) -> Result<Vec<Option<T>>>
    where
        C: Send + 'static,
        T: Send + 'static,
        F: Fn(&SqlExecutionUnit, &mut C, &ExecutorContext) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        self.execute(sql_type, units, parameter_sets, context, callback)
    }

    /// Run every unit and collect results in input order.
    ///
    /// # Arguments
    /// * `sql_type` - carried on the published events
    /// * `units` - statement units; units sharing a connection never overlap
    /// * `parameter_sets` - one event per set is published for each unit
    /// * `context` - exception policy and data map, cloned into every task
    /// * `callback` - runs one unit on its locked connection
    ///
    /// # Returns
    /// One entry per unit; `None` where a failure was swallowed
    ///
    /// # Errors
    /// The first failure in input order when the context rethrows, or an
    /// error when the engine is closed
    ///
    /// Blocks the calling thread until every unit has finished.
    pub fn execute<C, T, F>(
        &self,
        sql_type: SqlType,
        units: Vec<StatementUnit<C>>,
        parameter_sets: &[Vec<SqlValue>],
        context: &ExecutorContext,
        callback: F,
    ) -> Result<Vec<Option<T>>>
    where
        C: Send + 'static,
        T: Send + 'static,
        F: Fn(&SqlExecutionUnit, &mut C, &ExecutorContext) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let runtime = self.runtime()?;
        let mut units = units.into_iter();
        let Some(first) = units.next() else {
            return Ok(Vec::new());
        };
        let callback = Arc::new(callback);
        let parameter_sets = Arc::new(parameter_sets.to_vec());
        let task = |unit: StatementUnit<C>| UnitTask {
            sql_type,
            unit,
            parameter_sets: Arc::clone(&parameter_sets),
            context: context.clone(),
            callback: Arc::clone(&callback),
            event_bus: Arc::clone(&self.event_bus),
            _guard: InFlightGuard::new(&self.in_flight),
        };

        let handles: Vec<_> = units
            .map(|unit| {
                let task = task(unit);
                runtime.spawn_blocking(move || task.run())
            })
            .collect();
        let first_result = task(first).run();
        let rest = futures::executor::block_on(futures::future::join_all(handles));

        let mut results = Vec::with_capacity(rest.len() + 1);
        results.push(first_result?);
        for joined in rest {
            let result = joined.map_err(|e| ShardingError::Internal(format!("Execution task failed: {}", e)))?;
            results.push(result?);
        }
        Ok(results)
    }

    /// Stop accepting work and wait for running units to finish.
    ///
    /// # Errors
    /// Returns error when units are still running after the shutdown timeout
    pub fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let deadline = Instant::now() + self.shutdown_timeout;
        while self.in_flight.load(Ordering::SeqCst) > 0 {
            if Instant::now() >= deadline {
                return Err(ShardingError::Internal(
                    "ExecutorEngine can not be terminated".to_string(),
                ));
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        tracing::info!("Executor engine closed");
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn runtime(&self) -> Result<&Runtime> {
        match &self.runtime {
            Some(runtime) if !self.is_closed() => Ok(runtime),
            _ => Err(ShardingError::Internal("ExecutorEngine is closed".to_string())),
        }
    }
}

impl Drop for ExecutorEngine {
    fn drop(&mut self) {
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

/// Counts a unit as running until dropped
struct InFlightGuard {
    in_flight: Arc<AtomicUsize>,
}

impl InFlightGuard {
    fn new(in_flight: &Arc<AtomicUsize>) -> Self {
        in_flight.fetch_add(1, Ordering::SeqCst);
        Self {
            in_flight: Arc::clone(in_flight),
        }
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

struct UnitTask<C, F> {
    sql_type: SqlType,
    unit: StatementUnit<C>,
    parameter_sets: Arc<Vec<Vec<SqlValue>>>,
    context: ExecutorContext,
    callback: Arc<F>,
    event_bus: Arc<EventBus>,
    _guard: InFlightGuard,
}

impl<C, F> UnitTask<C, F> {
    fn run<T>(self) -> Result<Option<T>>
    where
        F: Fn(&SqlExecutionUnit, &mut C, &ExecutorContext) -> anyhow::Result<T>,
    {
        let execution_unit = &self.unit.execution_unit;
        let mut connection = self.unit.connection.lock().map_err(|_| ShardingError::Execution {
            data_source: execution_unit.data_source.clone(),
            message: "connection lock poisoned".to_string(),
        })?;

        let mut events: Vec<ExecutionEvent> = if self.parameter_sets.is_empty() {
            vec![ExecutionEvent::before(self.sql_type, execution_unit, Vec::new())]
        } else {
            self.parameter_sets
                .iter()
                .map(|parameters| ExecutionEvent::before(self.sql_type, execution_unit, parameters.clone()))
                .collect()
        };
        for event in &events {
            self.event_bus.publish(event);
        }

        match (self.callback)(execution_unit, &mut *connection, &self.context) {
            Ok(result) => {
                for event in &mut events {
                    event.set_success();
                    self.event_bus.publish(event);
                }
                Ok(Some(result))
            }
            Err(err) => {
                let message = format!("{:#}", err);
                for event in &mut events {
                    event.set_failure(&message);
                    self.event_bus.publish(event);
                }
                tracing::error!(
                    "Execution failed on {}: {} ({})",
                    execution_unit.data_source,
                    execution_unit.sql,
                    message
                );
                if self.context.exception_thrown {
                    Err(ShardingError::Execution {
                        data_source: execution_unit.data_source.clone(),
                        message,
                    })
                } else {
                    Ok(None)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::thread::ThreadId;

    fn engine(size: usize) -> ExecutorEngine {
        ExecutorEngine::new(size, Duration::from_secs(5)).unwrap()
    }

    fn units(count: usize) -> Vec<StatementUnit<()>> {
        (0..count)
            .map(|i| {
                StatementUnit::new(
                    SqlExecutionUnit::new(format!("ds_{}", i % 2), format!("SELECT {}", i)),
                    Arc::new(Mutex::new(())),
                )
            })
            .collect()
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<ExecutionEvent>>,
    }

    impl ExecutionEventListener for Recorder {
        fn on_event(&self, event: &ExecutionEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }

    #[test]
    fn test_results_keep_input_order() {
        let engine = engine(2);
        let results: Vec<Option<(String, ThreadId, Option<String>)>> = engine
            .execute_statement(SqlType::Dql, units(5), &ExecutorContext::new(), |unit, _, _| {
                // later units finish first
                let index: u64 = unit.sql["SELECT ".len()..].parse().unwrap_or(0);
                std::thread::sleep(Duration::from_millis((5 - index) * 10));
                let current = std::thread::current();
                Ok((unit.sql.clone(), current.id(), current.name().map(str::to_string)))
            })
            .unwrap();

        let results: Vec<_> = results.into_iter().map(Option::unwrap).collect();
        let sqls: Vec<&str> = results.iter().map(|r| r.0.as_str()).collect();
        assert_eq!(sqls, vec!["SELECT 0", "SELECT 1", "SELECT 2", "SELECT 3", "SELECT 4"]);

        let caller = std::thread::current().id();
        assert_eq!(results.iter().filter(|r| r.1 == caller).count(), 1);
        assert_eq!(results[0].1, caller);

        let workers: HashSet<ThreadId> = results.iter().skip(1).map(|r| r.1).collect();
        assert!(workers.len() <= 2);
        assert!(results
            .iter()
            .skip(1)
            .all(|r| r.2.as_deref() == Some(WORKER_THREAD_NAME)));
    }

    #[test]
    fn test_empty_units() {
        let engine = engine(1);
        let results: Vec<Option<()>> = engine
            .execute_statement(SqlType::Dql, units(0), &ExecutorContext::new(), |_, _, _| Ok(()))
            .unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_exception_policy() {
        let engine = engine(2);
        let fail_on_ds_1 = |unit: &SqlExecutionUnit, _: &mut (), _: &ExecutorContext| {
            if unit.data_source == "ds_1" {
                anyhow::bail!("connection reset");
            }
            Ok(unit.sql.clone())
        };

        let results = engine
            .execute_statement(SqlType::Dml, units(3), &ExecutorContext::swallowing(), fail_on_ds_1)
            .unwrap();
        assert_eq!(
            results,
            vec![Some("SELECT 0".to_string()), None, Some("SELECT 2".to_string())]
        );

        let err = engine
            .execute_statement(SqlType::Dml, units(3), &ExecutorContext::new(), fail_on_ds_1)
            .unwrap_err();
        match err {
            ShardingError::Execution { data_source, message } => {
                assert_eq!(data_source, "ds_1");
                assert_eq!(message, "connection reset");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_events_per_parameter_set() {
        let engine = engine(1);
        let recorder = Arc::new(Recorder::default());
        engine.register_listener(recorder.clone());

        let parameter_sets = vec![vec![SqlValue::Int(1)], vec![SqlValue::Int(2)]];
        engine
            .execute_batch(SqlType::Dml, units(1), &parameter_sets, &ExecutorContext::new(), |_, _, _| Ok(2))
            .unwrap();

        let events = recorder.events.lock().unwrap();
        let phases: Vec<ExecutionPhase> = events.iter().map(|e| e.phase).collect();
        assert_eq!(
            phases,
            vec![
                ExecutionPhase::BeforeExecute,
                ExecutionPhase::BeforeExecute,
                ExecutionPhase::ExecuteSuccess,
                ExecutionPhase::ExecuteSuccess,
            ]
        );
        assert_eq!(events[0].id, events[2].id);
        assert_eq!(events[1].parameters, vec![SqlValue::Int(2)]);
        assert_eq!(events[0].data_source, "ds_0");
    }

    #[test]
    fn test_failure_event_without_parameters() {
        let engine = engine(1);
        let recorder = Arc::new(Recorder::default());
        engine.register_listener(recorder.clone());

        let results: Vec<Option<()>> = engine
            .execute_statement(SqlType::Dql, units(1), &ExecutorContext::swallowing(), |_, _, _| {
                anyhow::bail!("table missing")
            })
            .unwrap();
        assert_eq!(results, vec![None]);

        let events = recorder.events.lock().unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].phase, ExecutionPhase::ExecuteFailure);
        assert_eq!(events[1].error.as_deref(), Some("table missing"));
    }

    #[test]
    fn test_context_reaches_workers() {
        let engine = engine(2);
        let context = ExecutorContext::new().with_data("tenant", serde_json::json!("acme"));
        let results = engine
            .execute_statement(SqlType::Dql, units(3), &context, |_, _, context| {
                Ok(context.data_map.get("tenant").cloned())
            })
            .unwrap();
        assert!(results
            .into_iter()
            .all(|r| r == Some(Some(serde_json::json!("acme")))));
    }

    #[test]
    fn test_shared_connection_is_exclusive() {
        let engine = engine(4);
        let connection = Arc::new(Mutex::new(Vec::<String>::new()));
        let shared: Vec<StatementUnit<Vec<String>>> = (0..4)
            .map(|i| StatementUnit::new(SqlExecutionUnit::new("ds_0", format!("SELECT {}", i)), connection.clone()))
            .collect();
        engine
            .execute_statement(SqlType::Dql, shared, &ExecutorContext::new(), |unit, log, _| {
                log.push(format!("begin {}", unit.sql));
                std::thread::sleep(Duration::from_millis(5));
                log.push(format!("end {}", unit.sql));
                Ok(())
            })
            .unwrap();

        let log = connection.lock().unwrap();
        assert_eq!(log.len(), 8);
        for pair in log.chunks(2) {
            assert_eq!(pair[0].replace("begin", "end"), pair[1]);
        }
    }

    #[test]
    fn test_close_rejects_new_work() {
        let engine = engine(1);
        engine.close().unwrap();
        assert!(engine.is_closed());
        let err = engine
            .execute_statement(SqlType::Dql, units(1), &ExecutorContext::new(), |_, _, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, ShardingError::Internal(_)));
    }

    #[test]
    fn test_close_times_out_on_running_units() {
        let engine = Arc::new(ExecutorEngine::new(1, Duration::from_millis(50)).unwrap());
        let running = Arc::clone(&engine);
        let worker = std::thread::spawn(move || {
            running.execute_statement(SqlType::Dql, units(1), &ExecutorContext::new(), |_, _, _| {
                std::thread::sleep(Duration::from_millis(500));
                Ok(())
            })
        });
        std::thread::sleep(Duration::from_millis(100));

        let err = engine.close().unwrap_err();
        assert_eq!(err.to_string(), "Internal error: ExecutorEngine can not be terminated");
        assert!(worker.join().unwrap().is_ok());
    }

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(
            ExecutorEngine::new(0, Duration::from_secs(1)),
            Err(ShardingError::Configuration(_))
        ));
    }
}
