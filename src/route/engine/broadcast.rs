use super::RouteEngine;
use crate::core::Result;
use crate::route::{RouteContext, RouteMapper, RouteUnit};
use crate::rule::ShardingRule;

/// Writes to broadcast tables: one unit per configured data source.
pub struct BroadcastRouteEngine {
    logic_tables: Vec<String>,
}

impl BroadcastRouteEngine {
    pub fn new(logic_tables: Vec<String>) -> Self {
        Self { logic_tables }
    }
}

impl RouteEngine for BroadcastRouteEngine {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn route(&self, rule: &ShardingRule) -> Result<RouteContext> {
        let table_mappers: Vec<RouteMapper> = self
            .logic_tables
            .iter()
            .filter(|table| rule.is_broadcast_table(table))
            .map(|table| RouteMapper::new(table.as_str(), table.as_str()))
            .collect();

        Ok(rule
            .data_source_names()
            .iter()
            .map(|ds| RouteUnit::for_data_source(ds, table_mappers.clone()))
            .collect::<Vec<_>>()
            .into())
    }
}

/// Schema changes on rule tables: one unit per physical table.
///
/// Sharded tables yield a unit per data node, broadcast tables a unit per
/// data source. Tables outside the rule are left alone.
pub struct TableBroadcastRouteEngine {
    logic_tables: Vec<String>,
}

impl TableBroadcastRouteEngine {
    pub fn new(logic_tables: Vec<String>) -> Self {
        Self { logic_tables }
    }
}

impl RouteEngine for TableBroadcastRouteEngine {
    fn name(&self) -> &'static str {
        "table_broadcast"
    }

    fn route(&self, rule: &ShardingRule) -> Result<RouteContext> {
        let mut result = RouteContext::new();
        for logic_table in &self.logic_tables {
            let Some(table) = rule.find_table(logic_table) else {
                continue;
            };
            for node in table.actual_data_nodes() {
                result.add_unit(RouteUnit::for_data_source(
                    node.data_source_name(),
                    vec![RouteMapper::new(logic_table.as_str(), node.table_name())],
                ));
            }
        }
        Ok(result)
    }
}

/// Statements every data source must see, such as transaction control.
#[derive(Debug, Default)]
pub struct FullRouteEngine;

impl FullRouteEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RouteEngine for FullRouteEngine {
    fn name(&self) -> &'static str {
        "full"
    }

    fn route(&self, rule: &ShardingRule) -> Result<RouteContext> {
        Ok(rule
            .data_source_names()
            .iter()
            .map(|ds| RouteUnit::for_data_source(ds, Vec::new()))
            .collect::<Vec<_>>()
            .into())
    }
}
