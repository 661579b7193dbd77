pub mod data_node;
pub mod execution;
pub mod routing;
pub mod rule_config;
pub mod sharding_rule;
pub mod sharding_value;
pub mod statement;
pub mod table_rule;
pub mod value;

pub use data_node::*;
pub use execution::*;
pub use routing::*;
pub use rule_config::*;
pub use sharding_rule::*;
pub use sharding_value::*;
pub use statement::*;
pub use table_rule::*;
pub use value::*;
