// Shared test fixtures
//
// Two data sources (ds_0, ds_1), each holding t_order_0/1, t_order_item_0/1
// and t_user_0/1. Databases shard on user_id, order tables on order_id.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::models::{ShardingRule, TableRule};
use crate::services::key_generator::KeyGenerator;
use crate::services::strategy::{
    DynamicModuloShardingAlgorithm, ModuloShardingAlgorithm, ShardingAlgorithm, ShardingStrategy,
};

/// Deterministic generator for asserting generated keys
pub struct IncrementKeyGenerator {
    next: AtomicI64,
}

impl IncrementKeyGenerator {
    pub fn starting_at(start: i64) -> Self {
        Self {
            next: AtomicI64::new(start),
        }
    }
}

impl KeyGenerator for IncrementKeyGenerator {
    fn generate_key(&self) -> Result<i64> {
        Ok(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

pub fn modulo_strategy(column: &str) -> ShardingStrategy {
    ShardingStrategy::new([column], ShardingAlgorithm::single_key(ModuloShardingAlgorithm::new()))
}

fn nodes(table_prefix: &str) -> Vec<String> {
    let mut result = Vec::new();
    for ds in 0..2 {
        for table in 0..2 {
            result.push(format!("ds_{}.{}_{}", ds, table_prefix, table));
        }
    }
    result
}

pub fn order_rule() -> ShardingRule {
    let order = TableRule::builder("t_order")
        .actual_tables(nodes("t_order"))
        .table_strategy(modulo_strategy("order_id"))
        .generate_key_column("order_id")
        .key_generator(Arc::new(IncrementKeyGenerator::starting_at(1000)))
        .build()
        .unwrap();
    let order_item = TableRule::builder("t_order_item")
        .actual_tables(nodes("t_order_item"))
        .table_strategy(modulo_strategy("order_id"))
        .build()
        .unwrap();
    let user = TableRule::builder("t_user")
        .actual_tables(nodes("t_user"))
        .table_strategy(modulo_strategy("id"))
        .build()
        .unwrap();
    let log = TableRule::builder("t_log")
        .dynamic(true)
        .data_source_names(["ds_0", "ds_1"])
        .table_strategy(ShardingStrategy::new(
            ["order_id"],
            ShardingAlgorithm::single_key(DynamicModuloShardingAlgorithm::new("t_log_", 10).unwrap()),
        ))
        .build()
        .unwrap();

    ShardingRule::builder()
        .data_source_names(["ds_0", "ds_1"])
        .table_rule(order)
        .table_rule(order_item)
        .table_rule(user)
        .table_rule(log)
        .binding_tables(["t_order", "t_order_item"])
        .default_database_strategy(modulo_strategy("user_id"))
        .build()
        .unwrap()
}
