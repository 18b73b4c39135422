use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use shardroute::{ConnectionContext, ShardingRouter, ShardingRuleConfig, SqlDialect};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shardroute")]
#[command(about = "Show where logical SQL statements route under a sharding rule")]
struct Cli {
    /// Sharding rule configuration (JSON)
    #[arg(long)]
    config: PathBuf,

    #[arg(long, default_value_t = SqlDialect::Postgres)]
    dialect: SqlDialect,

    /// Preferred data sources for the session
    #[arg(long = "prefer")]
    preferred: Vec<String>,

    /// Log logic and actual SQL at info level
    #[arg(long)]
    sql_show: bool,

    #[arg(long)]
    pretty: bool,

    /// Statements, routed in order on one connection
    #[arg(required = true)]
    sql: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ShardingRuleConfig::from_json_file(&cli.config)
        .with_context(|| format!("Failed to load sharding rule '{}'", cli.config.display()))?;
    if cli.sql_show {
        config.props.sql_show = true;
    }

    let router = ShardingRouter::new(&config)
        .context("Invalid sharding rule")?
        .with_dialect(cli.dialect);
    let mut conn = ConnectionContext::new();
    conn.set_preferred_data_source_names(cli.preferred);

    for sql in &cli.sql {
        let routes = router
            .route_sql(sql, &mut conn)
            .with_context(|| format!("Failed to route '{}'", sql))?;
        let output = json!({
            "sql": sql,
            "routes": routes,
            "used_data_sources": conn.used_data_source_names(),
        });
        let rendered = if cli.pretty {
            serde_json::to_string_pretty(&output)?
        } else {
            serde_json::to_string(&output)?
        };
        println!("{}", rendered);
    }
    Ok(())
}
