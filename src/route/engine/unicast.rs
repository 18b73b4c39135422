use super::RouteEngine;
use crate::binder::StatementContext;
use crate::connection::ConnectionContext;
use crate::core::{RouteError, Result};
use crate::route::{DataSourceSelector, RouteContext, RouteMapper, RouteUnit};
use crate::rule::ShardingRule;
use tracing::{debug, warn};

/// Routes a statement that must run on exactly one data source.
///
/// Used for statements without tables, cursor and view DDL, SHOW-style
/// statements and selects over broadcast tables.
pub struct UnicastRouteEngine<'a> {
    statement: &'a StatementContext,
    logic_tables: Vec<String>,
    connection: &'a ConnectionContext,
    selector: DataSourceSelector,
}

impl<'a> UnicastRouteEngine<'a> {
    pub fn new(
        statement: &'a StatementContext,
        logic_tables: Vec<String>,
        connection: &'a ConnectionContext,
        selector: DataSourceSelector,
    ) -> Self {
        Self {
            statement,
            logic_tables,
            connection,
            selector,
        }
    }

    /// Any data source of the rule will do.
    fn resolve_any_data_source(&self, rule: &ShardingRule) -> Result<String> {
        if self.statement.requires_pinned_data_source() {
            return Ok(rule.first_data_source_name().to_string());
        }
        self.selector.select(rule.data_source_names(), self.connection)
    }

    /// Cursor and view statements stay on the first configured data source
    /// among `candidates`; everything else goes through the selector.
    fn resolve_data_source(&self, rule: &ShardingRule, candidates: &[String]) -> Result<String> {
        if self.statement.requires_pinned_data_source() {
            return rule
                .data_source_names()
                .iter()
                .find(|name| candidates.contains(name))
                .cloned()
                .ok_or_else(|| RouteError::DataSourceIntersectionNotFound(self.logic_tables.clone()));
        }
        self.selector.select(candidates, self.connection)
    }

    fn route_single(&self, rule: &ShardingRule, logic_table: &str) -> Result<RouteUnit> {
        match rule.data_node(logic_table) {
            Some(node) => Ok(RouteUnit::for_data_source(
                node.data_source_name(),
                vec![RouteMapper::new(logic_table, node.table_name())],
            )),
            None => {
                debug!(logic_table, "Table outside sharding rule, routing unsharded");
                let data_source = self.resolve_any_data_source(rule)?;
                Ok(RouteUnit::for_data_source(&data_source, Vec::new()))
            }
        }
    }

    fn route_join(&self, rule: &ShardingRule) -> Result<RouteUnit> {
        let mut table_mappers = Vec::with_capacity(self.logic_tables.len());
        let mut intersection: Option<Vec<String>> = None;

        for logic_table in &self.logic_tables {
            let Some(table) = rule.find_table(logic_table) else {
                debug!(logic_table = %logic_table, "Join table outside sharding rule, skipped");
                continue;
            };
            table_mappers.push(RouteMapper::new(
                logic_table.as_str(),
                table.first_data_node().table_name(),
            ));

            let placed_on = table.actual_data_source_names();
            intersection = Some(match intersection {
                None => placed_on.to_vec(),
                Some(mut current) => {
                    current.retain(|name| placed_on.contains(name));
                    current
                }
            });
        }

        let candidates = intersection.unwrap_or_else(|| rule.data_source_names().to_vec());
        if candidates.is_empty() {
            warn!(tables = ?self.logic_tables, "No data source holds every joined table");
            return Err(RouteError::DataSourceIntersectionNotFound(
                self.logic_tables.clone(),
            ));
        }

        let data_source = self.resolve_data_source(rule, &candidates)?;
        Ok(RouteUnit::for_data_source(&data_source, table_mappers))
    }
}

impl RouteEngine for UnicastRouteEngine<'_> {
    fn name(&self) -> &'static str {
        "unicast"
    }

    fn route(&self, rule: &ShardingRule) -> Result<RouteContext> {
        let unit = match self.logic_tables.as_slice() {
            [] => {
                let data_source = self.resolve_any_data_source(rule)?;
                RouteUnit::for_data_source(&data_source, Vec::new())
            }
            [logic_table] => self.route_single(rule, logic_table)?,
            _ => self.route_join(rule)?,
        };
        Ok(RouteContext::from_units(vec![unit]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binder::{CursorOp, DalKind, DmlKind, StatementKind, ViewOp};
    use crate::config::{PinningMode, ShardingRuleConfig};
    use std::collections::HashSet;

    fn rule() -> ShardingRule {
        let config = ShardingRuleConfig::new(["ds_0", "ds_1", "ds_2"])
            .table("t_order", ["ds_0.t_order_0", "ds_1.t_order_1"])
            .table("t_item", ["ds_1.t_item_0"])
            .table("t_user", ["ds_2.t_user_0"])
            .broadcast_table("t_config");
        ShardingRule::new(&config).unwrap()
    }

    fn statement(kind: StatementKind, tables: &[&str]) -> StatementContext {
        StatementContext::new(kind, tables.iter().copied())
    }

    fn route(stmt: &StatementContext, conn: &ConnectionContext) -> Result<RouteContext> {
        UnicastRouteEngine::new(stmt, stmt.tables().to_vec(), conn, DataSourceSelector::default())
            .route(&rule())
    }

    const SELECT: StatementKind = StatementKind::Dml(DmlKind::Select);

    #[test]
    fn test_no_tables_routes_to_one_configured_source() {
        let stmt = statement(StatementKind::Dal(DalKind::Show), &[]);
        let conn = ConnectionContext::new();
        let mut seen = HashSet::new();

        for _ in 0..100 {
            let result = route(&stmt, &conn).unwrap();
            assert_eq!(result.len(), 1);
            let unit = &result.route_units()[0];
            assert!(unit.table_mappers.is_empty());
            assert_eq!(unit.data_source_mapper.logic_name, unit.data_source_mapper.actual_name);
            seen.insert(unit.data_source_name().to_string());
        }
        assert!(seen.iter().all(|ds| ["ds_0", "ds_1", "ds_2"].contains(&ds.as_str())));
    }

    #[test]
    fn test_unknown_single_table_routes_unsharded() {
        let stmt = statement(SELECT, &["t_unknown"]);
        let result = route(&stmt, &ConnectionContext::new()).unwrap();

        assert_eq!(result.len(), 1);
        assert!(result.route_units()[0].table_mappers.is_empty());
    }

    #[test]
    fn test_single_sharded_table_uses_first_node() {
        let stmt = statement(SELECT, &["t_order"]);
        for _ in 0..50 {
            let result = route(&stmt, &ConnectionContext::new()).unwrap();
            let unit = &result.route_units()[0];
            assert_eq!(unit.data_source_name(), "ds_0");
            assert_eq!(unit.table_mappers, vec![RouteMapper::new("t_order", "t_order_0")]);
        }
    }

    #[test]
    fn test_single_broadcast_table_uses_first_source() {
        let stmt = statement(SELECT, &["t_config"]);
        let result = route(&stmt, &ConnectionContext::new()).unwrap();
        let unit = &result.route_units()[0];
        assert_eq!(unit.data_source_name(), "ds_0");
        assert_eq!(unit.table_mappers, vec![RouteMapper::new("t_config", "t_config")]);
    }

    #[test]
    fn test_join_picks_intersection() {
        let stmt = statement(SELECT, &["t_order", "t_item"]);
        for _ in 0..50 {
            let result = route(&stmt, &ConnectionContext::new()).unwrap();
            assert_eq!(result.len(), 1);
            let unit = &result.route_units()[0];
            assert_eq!(unit.data_source_name(), "ds_1");
            assert_eq!(
                unit.table_mappers,
                vec![
                    RouteMapper::new("t_order", "t_order_0"),
                    RouteMapper::new("t_item", "t_item_0"),
                ]
            );
        }
    }

    #[test]
    fn test_join_without_common_source_fails() {
        let stmt = statement(SELECT, &["t_item", "t_user"]);
        let err = route(&stmt, &ConnectionContext::new()).unwrap_err();
        assert_eq!(
            err,
            RouteError::DataSourceIntersectionNotFound(vec![
                "t_item".to_string(),
                "t_user".to_string()
            ])
        );
    }

    #[test]
    fn test_join_with_broadcast_table() {
        let stmt = statement(SELECT, &["t_user", "t_config"]);
        let result = route(&stmt, &ConnectionContext::new()).unwrap();
        let unit = &result.route_units()[0];
        assert_eq!(unit.data_source_name(), "ds_2");
        assert_eq!(unit.table_mappers.len(), 2);
    }

    #[test]
    fn test_join_skips_tables_outside_rule() {
        let stmt = statement(SELECT, &["t_item", "t_unknown"]);
        let result = route(&stmt, &ConnectionContext::new()).unwrap();
        let unit = &result.route_units()[0];
        assert_eq!(unit.data_source_name(), "ds_1");
        assert_eq!(unit.table_mappers, vec![RouteMapper::new("t_item", "t_item_0")]);
    }

    #[test]
    fn test_pinned_connection_reuses_used_source() {
        let stmt = statement(StatementKind::Dal(DalKind::Show), &[]);
        let mut conn = ConnectionContext::new();
        conn.add_used_data_source_name("ds_2");

        for _ in 0..50 {
            let result = route(&stmt, &conn).unwrap();
            assert_eq!(result.route_units()[0].data_source_name(), "ds_2");
        }
    }

    #[test]
    fn test_candidate_filtered_join_ignores_foreign_pin() {
        let stmt = statement(SELECT, &["t_order", "t_item"]);
        let mut conn = ConnectionContext::new();
        conn.add_used_data_source_name("ds_2");

        let engine = UnicastRouteEngine::new(
            &stmt,
            stmt.tables().to_vec(),
            &conn,
            DataSourceSelector::new(PinningMode::CandidateFiltered),
        );
        let result = engine.route(&rule()).unwrap();
        assert_eq!(result.route_units()[0].data_source_name(), "ds_1");
    }

    #[test]
    fn test_cursor_and_view_pin_first_source() {
        let mut conn = ConnectionContext::new();
        conn.add_used_data_source_name("ds_2");

        for kind in [
            StatementKind::Cursor(CursorOp::Declare),
            StatementKind::Cursor(CursorOp::Fetch),
            StatementKind::View(ViewOp::Create),
            StatementKind::View(ViewOp::Drop),
        ] {
            let stmt = statement(kind, &[]);
            for _ in 0..20 {
                let result = route(&stmt, &conn).unwrap();
                assert_eq!(result.route_units()[0].data_source_name(), "ds_0");
            }
        }
    }

    #[test]
    fn test_cursor_over_unknown_table_uses_first_source() {
        let rule = rule();
        let mut conn = ConnectionContext::new();
        conn.add_used_data_source_name("ds_2");

        let stmt = statement(StatementKind::Cursor(CursorOp::Declare), &["t_unknown"]);
        let result = route(&stmt, &conn).unwrap();
        let unit = &result.route_units()[0];
        assert_eq!(unit.data_source_name(), rule.first_data_source_name());
        assert!(unit.table_mappers.is_empty());

        let stmt = statement(StatementKind::Cursor(CursorOp::Declare), &["t_user"]);
        let result = route(&stmt, &conn).unwrap();
        let node = rule.data_node("t_user").unwrap();
        assert_eq!(result.route_units()[0].data_source_name(), node.data_source_name());
    }

    #[test]
    fn test_pinned_join_takes_first_common_source_in_config_order() {
        let stmt = statement(StatementKind::View(ViewOp::Create), &["t_order", "t_item"]);
        let result = route(&stmt, &ConnectionContext::new()).unwrap();
        assert_eq!(result.route_units()[0].data_source_name(), "ds_1");
    }

    #[test]
    fn test_engine_does_not_touch_connection() {
        let stmt = statement(SELECT, &[]);
        let conn = ConnectionContext::new();
        route(&stmt, &conn).unwrap();
        assert!(conn.used_data_source_names().is_empty());
    }
}
