use serde::Deserialize;
use std::env;

use crate::error::{Result, ShardingError};
use crate::services::parsing::DatabaseType;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub executor: ExecutorConfig,
    pub sql: SqlConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rule: RuleConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExecutorConfig {
    pub size: usize,
    pub shutdown_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SqlConfig {
    pub show: bool,
    pub database_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub style: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuleConfig {
    /// Rule file read by the CLI; any format the `config` crate knows
    pub path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Try to load from .env file
        let _ = dotenv::dotenv();

        let mut builder = config::Config::builder()
            .set_default("executor.size", num_cpus::get() as u64)?
            .set_default("executor.shutdown_timeout_secs", 5)?
            .set_default("sql.show", false)?
            .set_default("sql.database_type", DatabaseType::MySQL.as_str())?
            .set_default("logging.level", "info")?
            .set_default("logging.style", "auto")?;

        if let Ok(size) = env::var("SHARDING_EXECUTOR_SIZE") {
            let size = size.parse::<u64>().map_err(|_| {
                ShardingError::Configuration(format!("SHARDING_EXECUTOR_SIZE is not a number: {}", size))
            })?;
            builder = builder.set_override("executor.size", size)?;
        }

        if let Ok(timeout) = env::var("SHARDING_EXECUTOR_SHUTDOWN_TIMEOUT") {
            let timeout = timeout.parse::<u64>().map_err(|_| {
                ShardingError::Configuration(format!(
                    "SHARDING_EXECUTOR_SHUTDOWN_TIMEOUT is not a number: {}",
                    timeout
                ))
            })?;
            builder = builder.set_override("executor.shutdown_timeout_secs", timeout)?;
        }

        if let Ok(show) = env::var("SHARDING_SQL_SHOW") {
            builder = builder.set_override("sql.show", matches!(show.to_lowercase().as_str(), "true" | "1" | "yes"))?;
        }

        if let Ok(database_type) = env::var("SHARDING_DATABASE_TYPE") {
            builder = builder.set_override("sql.database_type", database_type)?;
        }

        if let Ok(path) = env::var("SHARDING_RULE_PATH") {
            builder = builder.set_override("rule.path", Some(path))?;
        }

        if let Ok(log_level) = env::var("RUST_LOG") {
            builder = builder.set_override("logging.level", log_level)?;
        }

        if let Ok(log_style) = env::var("RUST_LOG_STYLE") {
            builder = builder.set_override("logging.style", log_style)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Dialect named by `sql.database_type`
    pub fn database_type(&self) -> Result<DatabaseType> {
        DatabaseType::from_str(&self.sql.database_type).map_err(ShardingError::Configuration)
    }

    fn validate(&self) -> Result<()> {
        if self.executor.size == 0 {
            return Err(ShardingError::Configuration(
                "executor.size must be greater than 0".to_string(),
            ));
        }
        self.database_type()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // from_env reads process-wide variables
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const VARS: [&str; 5] = [
        "SHARDING_EXECUTOR_SIZE",
        "SHARDING_EXECUTOR_SHUTDOWN_TIMEOUT",
        "SHARDING_SQL_SHOW",
        "SHARDING_DATABASE_TYPE",
        "SHARDING_RULE_PATH",
    ];

    fn clear_env() {
        for var in VARS {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_config_defaults() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();

        let config = Config::from_env().unwrap();
        assert_eq!(config.executor.size, num_cpus::get());
        assert_eq!(config.executor.shutdown_timeout_secs, 5);
        assert!(!config.sql.show);
        assert_eq!(config.database_type().unwrap(), DatabaseType::MySQL);
        assert!(config.rule.path.is_none());
    }

    #[test]
    fn test_config_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("SHARDING_EXECUTOR_SIZE", "3");
        env::set_var("SHARDING_SQL_SHOW", "true");
        env::set_var("SHARDING_DATABASE_TYPE", "postgresql");
        env::set_var("SHARDING_RULE_PATH", "/etc/sharding/rule.toml");

        let config = Config::from_env();
        clear_env();
        let config = config.unwrap();
        assert_eq!(config.executor.size, 3);
        assert!(config.sql.show);
        assert_eq!(config.database_type().unwrap(), DatabaseType::PostgreSQL);
        assert_eq!(config.rule.path.as_deref(), Some("/etc/sharding/rule.toml"));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        let _lock = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("SHARDING_EXECUTOR_SIZE", "0");
        let zero = Config::from_env();
        env::set_var("SHARDING_EXECUTOR_SIZE", "many");
        let not_a_number = Config::from_env();
        clear_env();
        env::set_var("SHARDING_DATABASE_TYPE", "db2");
        let unknown_dialect = Config::from_env();
        clear_env();

        assert!(matches!(zero, Err(ShardingError::Configuration(_))));
        assert!(matches!(not_a_number, Err(ShardingError::Configuration(_))));
        assert!(matches!(unknown_dialect, Err(ShardingError::Configuration(_))));
    }
}
