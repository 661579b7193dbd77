use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use sharding_core::config::Config;
use sharding_core::models::{ShardingRuleConfig, SqlValue};
use sharding_core::services::{HintManager, ShardingContext, SqlRouteEngine};

/// Route one logical SQL and print the physical statements it becomes
#[derive(Debug, Parser)]
#[command(name = "sharding-explain", version, about)]
struct Args {
    /// Logical SQL written against logic tables
    #[arg(long)]
    sql: String,

    /// Positional parameter for `?` placeholders, repeatable
    #[arg(long = "param")]
    params: Vec<String>,

    /// Rule file; defaults to SHARDING_RULE_PATH
    #[arg(long)]
    rule: Option<String>,

    /// Route by data source only, with this value, and leave the SQL as written
    #[arg(long)]
    hint_database_value: Option<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    let rule_path = args
        .rule
        .or_else(|| config.rule.path.clone())
        .ok_or("No rule file given: pass --rule or set SHARDING_RULE_PATH")?;
    let rule = ShardingRuleConfig::from_file(&rule_path)
        .and_then(|c| c.build())
        .map_err(|e| {
            error!("Failed to load sharding rule {}: {}", rule_path, e);
            e
        })?;
    info!("Loaded sharding rule from {}", rule_path);

    let context = ShardingContext::new(Arc::new(rule), config.database_type()?, config.sql.show);
    let mut hint = HintManager::new();
    if let Some(value) = &args.hint_database_value {
        hint.set_database_sharding_value(SqlValue::parse_literal(value));
    }
    let parameters: Vec<SqlValue> = args.params.iter().map(|p| SqlValue::parse_literal(p)).collect();

    let result = SqlRouteEngine::new(context).route(&args.sql, &parameters, &hint)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
