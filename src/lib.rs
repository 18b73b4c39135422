// ============================================================================
// shardroute Library
// ============================================================================

pub mod binder;
pub mod config;
pub mod connection;
pub mod core;
pub mod route;
pub mod rule;

// Re-export main types for convenience
pub use binder::{
    ShardingConditions, SqlDialect, SqlStatementBinder, StatementContext, StatementKind, TclOp,
};
pub use config::{PinningMode, RouterProps, ShardingRuleConfig, ShardingTableConfig};
pub use connection::{ConnectionContext, ConnectionState};
pub use core::{Result, RouteError};
pub use route::{
    DataSourceSelector, RouteContext, RouteEngine, RouteEngineDispatcher, RouteMapper, RouteUnit,
};
pub use rule::{DataNode, ShardingRule, ShardingRuleHolder, ShardingTable};

use std::sync::{Arc, RwLock};
use tracing::{debug, info};

// ============================================================================
// High-level Router API
// ============================================================================

/// Sharding router over one logical schema
///
/// Binds SQL, picks a route engine and records the chosen data sources into
/// the caller's [`ConnectionContext`]. The rule can be reloaded while other
/// threads route; each statement sees exactly one rule snapshot.
///
/// # Examples
///
/// ```
/// use shardroute::{ConnectionContext, ShardingRouter, ShardingRuleConfig};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ShardingRuleConfig::new(["ds_0", "ds_1"])
///     .table("t_order", ["ds_0.t_order_0", "ds_1.t_order_1"])
///     .broadcast_table("t_config");
/// let router = ShardingRouter::new(&config)?;
/// let mut conn = ConnectionContext::new();
///
/// let routes = router.route_sql("UPDATE t_config SET v = 1", &mut conn)?;
/// assert_eq!(routes[0].len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ShardingRouter {
    rules: ShardingRuleHolder,
    props: RwLock<RouterProps>,
    binder: SqlStatementBinder,
}

impl ShardingRouter {
    /// Build a router from a configuration; invalid configurations are
    /// rejected before anything is published.
    pub fn new(config: &ShardingRuleConfig) -> Result<Self> {
        let rule = ShardingRule::new(config)?;
        Ok(Self::from_rule(rule, config.props.clone()))
    }

    pub fn from_rule(rule: ShardingRule, props: RouterProps) -> Self {
        info!(
            data_sources = rule.data_source_names().len(),
            pinning = ?props.pinning,
            "Sharding router created"
        );
        Self {
            rules: ShardingRuleHolder::new(rule),
            props: RwLock::new(props),
            binder: SqlStatementBinder::new(),
        }
    }

    pub fn with_dialect(mut self, dialect: SqlDialect) -> Self {
        self.binder = SqlStatementBinder::with_dialect(dialect);
        self
    }

    pub fn binder(&self) -> &SqlStatementBinder {
        &self.binder
    }

    /// Current rule snapshot
    pub fn rule(&self) -> Result<Arc<ShardingRule>> {
        self.rules.snapshot()
    }

    pub fn props(&self) -> Result<RouterProps> {
        Ok(self.props.read()?.clone())
    }

    /// Replace rule and props; routes already in flight finish on the old rule.
    pub fn reload(&self, config: &ShardingRuleConfig) -> Result<()> {
        self.rules.reload(config)?;
        *self.props.write()? = config.props.clone();
        Ok(())
    }

    /// Bind `sql` and route every statement in it, in order.
    ///
    /// `BEGIN`, `COMMIT` and `ROLLBACK` also move `connection` through its
    /// transaction lifecycle, so used data sources are released when the
    /// transaction ends.
    pub fn route_sql(&self, sql: &str, connection: &mut ConnectionContext) -> Result<Vec<RouteContext>> {
        connection.ensure_open()?;
        let statements = self.binder.bind(sql)?;
        let mut results = Vec::with_capacity(statements.len());
        for statement in &statements {
            results.push(self.route_logged(statement, connection, Some(sql))?);
        }
        Ok(results)
    }

    /// Route an already bound statement. Transaction control is applied to
    /// `connection` as in [`route_sql`](Self::route_sql).
    pub fn route(&self, statement: &StatementContext, connection: &mut ConnectionContext) -> Result<RouteContext> {
        self.route_logged(statement, connection, None)
    }

    fn route_logged(
        &self,
        statement: &StatementContext,
        connection: &mut ConnectionContext,
        sql: Option<&str>,
    ) -> Result<RouteContext> {
        connection.ensure_open()?;
        let rule = self.rules.snapshot()?;
        let props = self.props()?;

        let dispatcher = RouteEngineDispatcher::new(DataSourceSelector::new(props.pinning));
        let result = dispatcher.route(&rule, statement, connection)?;

        match statement.kind() {
            StatementKind::Tcl(op) => apply_transaction_control(op, connection)?,
            _ => connection.record_route(&result)?,
        }

        if props.sql_show {
            info!(
                connection_id = connection.id(),
                logic_sql = sql.unwrap_or_default(),
                kind = ?statement.kind(),
                "Logic SQL"
            );
            for unit in result.route_units() {
                info!(
                    data_source = unit.data_source_name(),
                    tables = ?unit.table_mappers,
                    "Actual SQL"
                );
            }
        } else {
            debug!(
                connection_id = connection.id(),
                units = result.len(),
                "Statement routed"
            );
        }
        Ok(result)
    }
}

/// Transaction control runs on connections already held and records nothing.
fn apply_transaction_control(op: TclOp, connection: &mut ConnectionContext) -> Result<()> {
    match op {
        TclOp::Begin if !connection.is_in_transaction() => connection.begin(),
        TclOp::Commit if connection.is_in_transaction() => connection.commit(),
        TclOp::Rollback if connection.is_in_transaction() => connection.rollback(),
        // Autocommit statement boundary
        TclOp::Commit | TclOp::Rollback => {
            connection.clear_used_data_source_names();
            Ok(())
        }
        TclOp::Begin | TclOp::Other => Ok(()),
    }
}

// ============================================================================
// TESTS
// ============================================================================
