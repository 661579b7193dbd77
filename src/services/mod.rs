pub mod executor;
pub mod hint;
pub mod key_generator;
pub mod parsing;
pub mod rewrite;
pub mod routing;
pub mod strategy;

pub use executor::{ExecutorContext, ExecutorEngine, StatementUnit};
pub use hint::HintManager;
pub use key_generator::*;
pub use parsing::{DatabaseType, SqlJudgeEngine, SqlParsingEngine};
pub use rewrite::{SqlBuilder, SqlRewriteEngine};
pub use routing::{ShardingContext, SqlRouteEngine, SqlRouter};
pub use strategy::*;
