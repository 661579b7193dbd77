use thiserror::Error;

/// Sharding error types
#[derive(Debug, Error)]
pub enum ShardingError {
    #[error("SQL parsing error: {0}")]
    Parsing(String),

    #[error("Unsupported SQL: {0}")]
    UnsupportedSql(String),

    #[error("Sharding rule error: {0}")]
    Rule(String),

    #[error("Routing error: {0}")]
    Routing(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Execution error on data source {data_source}: {message}")]
    Execution { data_source: String, message: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ShardingError>;

impl From<config::ConfigError> for ShardingError {
    fn from(err: config::ConfigError) -> Self {
        ShardingError::Configuration(err.to_string())
    }
}

impl From<serde_json::Error> for ShardingError {
    fn from(err: serde_json::Error) -> Self {
        ShardingError::Internal(format!("JSON error: {}", err))
    }
}

impl From<anyhow::Error> for ShardingError {
    fn from(err: anyhow::Error) -> Self {
        ShardingError::Internal(err.to_string())
    }
}
