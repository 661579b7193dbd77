pub mod config;
pub mod error;
pub mod models;
pub mod services;

#[cfg(test)]
mod fixtures;

pub use error::{Result, ShardingError};
pub use models::*;
pub use services::*;
