use super::{RouteEngine, StandardRouteEngine};
use crate::binder::StatementContext;
use crate::core::{RouteError, Result};
use crate::route::{RouteContext, RouteMapper, RouteUnit};
use crate::rule::ShardingRule;
use tracing::{debug, warn};

/// Routes statements over several sharded tables that are not all bound.
///
/// Each unbound table is routed on its own; the results are then combined
/// per data source as a cartesian product of their actual tables.
pub struct ComplexRouteEngine<'a> {
    logic_tables: Vec<String>,
    statement: &'a StatementContext,
}

impl<'a> ComplexRouteEngine<'a> {
    pub fn new(logic_tables: Vec<String>, statement: &'a StatementContext) -> Self {
        Self {
            logic_tables,
            statement,
        }
    }

    fn route_each(&self, rule: &ShardingRule) -> Result<Vec<RouteContext>> {
        let mut routed: Vec<&str> = Vec::new();
        let mut results = Vec::new();

        for logic_table in &self.logic_tables {
            if !rule.is_sharding_table(logic_table) {
                continue;
            }
            let bound = rule
                .find_binding_group(logic_table)
                .is_some_and(|group| routed.iter().any(|t| group.contains(t)));
            if bound {
                debug!(logic_table = %logic_table, "Bound to a routed table, skipped");
                continue;
            }
            results.push(StandardRouteEngine::new(logic_table.as_str(), self.statement).route(rule)?);
            routed.push(logic_table);
        }
        Ok(results)
    }

    fn common_data_sources<'r>(&self, results: &'r [RouteContext]) -> Result<Vec<&'r str>> {
        let mut common = results[0].actual_data_source_names();
        for result in &results[1..] {
            let names = result.actual_data_source_names();
            common.retain(|name| names.contains(name));
        }
        if common.is_empty() {
            warn!(tables = ?self.logic_tables, "Sharded tables share no data source");
            return Err(RouteError::DataSourceIntersectionNotFound(
                self.logic_tables.clone(),
            ));
        }
        Ok(common)
    }
}

impl RouteEngine for ComplexRouteEngine<'_> {
    fn name(&self) -> &'static str {
        "complex"
    }

    fn route(&self, rule: &ShardingRule) -> Result<RouteContext> {
        let mut results = self.route_each(rule)?;
        match results.len() {
            0 => return Err(RouteError::ShardingTableNotFound(self.logic_tables.clone())),
            1 => return Ok(results.remove(0)),
            _ => {}
        }

        let mut combined = RouteContext::new();
        for data_source in self.common_data_sources(&results)? {
            let mut products: Vec<Vec<RouteMapper>> = vec![Vec::new()];
            for result in &results {
                let mut next = Vec::new();
                for prefix in &products {
                    for unit in result.units_in(data_source) {
                        let mut mappers = prefix.clone();
                        mappers.extend(unit.table_mappers.iter().cloned());
                        next.push(mappers);
                    }
                }
                products = next;
            }
            for table_mappers in products {
                combined.add_unit(RouteUnit::for_data_source(data_source, table_mappers));
            }
        }
        Ok(combined)
    }
}
