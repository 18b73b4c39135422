use super::engine::{
    BroadcastRouteEngine, ComplexRouteEngine, FullRouteEngine, IgnoreRouteEngine, RouteEngine,
    StandardRouteEngine, TableBroadcastRouteEngine, UnicastRouteEngine,
};
use super::{DataSourceSelector, RouteContext};
use crate::binder::{DalKind, StatementContext, StatementKind};
use crate::connection::ConnectionContext;
use crate::core::Result;
use crate::rule::ShardingRule;
use tracing::debug;

/// Chooses the route engine for a bound statement.
///
/// The choice depends only on the statement kind and on how its tables sit
/// in the rule; the engine then does the actual mapping.
#[derive(Debug, Clone, Copy, Default)]
pub struct RouteEngineDispatcher {
    selector: DataSourceSelector,
}

impl RouteEngineDispatcher {
    pub fn new(selector: DataSourceSelector) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> DataSourceSelector {
        self.selector
    }

    /// Select and run the engine in one step.
    pub fn route(
        &self,
        rule: &ShardingRule,
        statement: &StatementContext,
        connection: &ConnectionContext,
    ) -> Result<RouteContext> {
        let engine = self.dispatch(rule, statement, connection);
        debug!(
            engine = engine.name(),
            kind = ?statement.kind(),
            tables = ?statement.tables(),
            "Route engine selected"
        );
        engine.route(rule)
    }

    pub fn dispatch<'a>(
        &self,
        rule: &ShardingRule,
        statement: &'a StatementContext,
        connection: &'a ConnectionContext,
    ) -> Box<dyn RouteEngine + 'a> {
        let tables = statement.tables();
        match statement.kind() {
            StatementKind::Tcl(_) => Box::new(FullRouteEngine::new()),
            StatementKind::View(_) | StatementKind::Cursor(_) => {
                self.unicast(statement, tables.to_vec(), connection)
            }
            StatementKind::Ddl(_) => {
                if tables.is_empty() {
                    Box::new(FullRouteEngine::new())
                } else if rule.rule_table_names(tables).is_empty() {
                    Box::new(IgnoreRouteEngine::new())
                } else {
                    Box::new(TableBroadcastRouteEngine::new(tables.to_vec()))
                }
            }
            StatementKind::Dal(DalKind::Use) => Box::new(IgnoreRouteEngine::new()),
            StatementKind::Dal(DalKind::Set) => Box::new(FullRouteEngine::new()),
            StatementKind::Dal(_) => {
                if !tables.is_empty() && rule.rule_table_names(tables).is_empty() {
                    Box::new(IgnoreRouteEngine::new())
                } else {
                    self.unicast(statement, tables.to_vec(), connection)
                }
            }
            StatementKind::Dcl => {
                let sharded = rule.sharding_logic_table_names(tables);
                if tables.len() == 1 && sharded.len() == 1 {
                    Box::new(TableBroadcastRouteEngine::new(sharded))
                } else if !tables.is_empty() && rule.rule_table_names(tables).is_empty() {
                    Box::new(IgnoreRouteEngine::new())
                } else {
                    Box::new(FullRouteEngine::new())
                }
            }
            StatementKind::Dml(_) => self.dispatch_dml(rule, statement, connection),
        }
    }

    fn dispatch_dml<'a>(
        &self,
        rule: &ShardingRule,
        statement: &'a StatementContext,
        connection: &'a ConnectionContext,
    ) -> Box<dyn RouteEngine + 'a> {
        let tables = statement.tables();
        if rule.is_all_broadcast_tables(tables) {
            return if statement.is_select() {
                self.unicast(statement, tables.to_vec(), connection)
            } else {
                Box::new(BroadcastRouteEngine::new(tables.to_vec()))
            };
        }
        if tables.is_empty() || statement.conditions().is_always_false() {
            return self.unicast(statement, tables.to_vec(), connection);
        }

        let sharded = rule.sharding_logic_table_names(tables);
        if sharded.is_empty() {
            return self.unicast(statement, tables.to_vec(), connection);
        }
        if sharded.len() > 1 && !rule.is_all_binding_tables(&sharded) {
            return Box::new(ComplexRouteEngine::new(sharded, statement));
        }

        let conditions = statement.conditions();
        let primary = sharded
            .iter()
            .find(|table| conditions.has_condition(table))
            .unwrap_or(&sharded[0]);
        Box::new(StandardRouteEngine::new(primary.as_str(), statement))
    }

    fn unicast<'a>(
        &self,
        statement: &'a StatementContext,
        logic_tables: Vec<String>,
        connection: &'a ConnectionContext,
    ) -> Box<dyn RouteEngine + 'a> {
        Box::new(UnicastRouteEngine::new(
            statement,
            logic_tables,
            connection,
            self.selector,
        ))
    }
}
