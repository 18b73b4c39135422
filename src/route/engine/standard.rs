use super::RouteEngine;
use crate::binder::StatementContext;
use crate::core::{RouteError, Result, normalize_name};
use crate::route::{RouteContext, RouteMapper, RouteUnit};
use crate::rule::{DataNode, ShardingRule, ShardingTable};

/// Routes one sharded logic table to the nodes its sharding value selects.
///
/// Other statement tables bound to it ride along on the same units with the
/// actual table at the matching shard position.
pub struct StandardRouteEngine<'a> {
    logic_table: String,
    statement: &'a StatementContext,
}

impl<'a> StandardRouteEngine<'a> {
    pub fn new(logic_table: impl Into<String>, statement: &'a StatementContext) -> Self {
        Self {
            logic_table: logic_table.into(),
            statement,
        }
    }

    fn route_data_nodes(&self, table: &ShardingTable) -> Result<Vec<DataNode>> {
        let Some(resolved) = self.statement.conditions().resolved_nodes(&self.logic_table) else {
            return Ok(table.actual_data_nodes().to_vec());
        };

        if let Some(unknown) = resolved.iter().find(|node| !table.contains_data_node(node)) {
            return Err(RouteError::DataNodeNotConfigured {
                logic_table: self.logic_table.clone(),
                data_node: unknown.to_string(),
            });
        }

        let nodes: Vec<DataNode> = table
            .actual_data_nodes()
            .iter()
            .filter(|node| resolved.contains(node))
            .cloned()
            .collect();
        if nodes.is_empty() {
            return Err(RouteError::NoDataNodeRouted(self.logic_table.clone()));
        }
        Ok(nodes)
    }

    fn binding_partners(&self, rule: &ShardingRule) -> Vec<String> {
        let Some(group) = rule.find_binding_group(&self.logic_table) else {
            return Vec::new();
        };
        let own = normalize_name(&self.logic_table);
        self.statement
            .tables()
            .iter()
            .filter(|table| normalize_name(table) != own && group.contains(table))
            .cloned()
            .collect()
    }
}

impl RouteEngine for StandardRouteEngine<'_> {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn route(&self, rule: &ShardingRule) -> Result<RouteContext> {
        let table = rule
            .find_sharding_table(&self.logic_table)
            .ok_or_else(|| RouteError::ShardingTableNotFound(vec![self.logic_table.clone()]))?;
        let nodes = self.route_data_nodes(table)?;
        let partners = self.binding_partners(rule);
        let group = rule.find_binding_group(&self.logic_table);

        let mut data_sources: Vec<&str> = Vec::new();
        for node in &nodes {
            if !data_sources.contains(&node.data_source_name()) {
                data_sources.push(node.data_source_name());
            }
        }

        let mut result = RouteContext::new();
        for data_source in data_sources {
            for node in nodes.iter().filter(|n| n.data_source_name() == data_source) {
                let mut table_mappers = vec![RouteMapper::new(
                    self.logic_table.as_str(),
                    node.table_name(),
                )];
                if let Some(group) = group {
                    for partner in &partners {
                        if let Some(actual) = group.binding_actual_table(
                            data_source,
                            &self.logic_table,
                            partner,
                            node.table_name(),
                        ) {
                            table_mappers.push(RouteMapper::new(partner.as_str(), actual));
                        }
                    }
                }
                result.add_unit(RouteUnit::for_data_source(data_source, table_mappers));
            }
        }
        Ok(result)
    }
}
