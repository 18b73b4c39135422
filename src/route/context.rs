use serde::Serialize;
use std::collections::HashSet;

/// Logic name to actual name, used for both data sources and tables.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RouteMapper {
    pub logic_name: String,
    pub actual_name: String,
}

impl RouteMapper {
    pub fn new(logic_name: impl Into<String>, actual_name: impl Into<String>) -> Self {
        Self {
            logic_name: logic_name.into(),
            actual_name: actual_name.into(),
        }
    }
}

/// Send the statement to one data source, touching these actual tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteUnit {
    pub data_source_mapper: RouteMapper,
    pub table_mappers: Vec<RouteMapper>,
}

impl RouteUnit {
    pub fn new(data_source_mapper: RouteMapper, table_mappers: Vec<RouteMapper>) -> Self {
        Self {
            data_source_mapper,
            table_mappers,
        }
    }

    /// Unit addressed to `data_source_name` under its own name.
    pub fn for_data_source(data_source_name: &str, table_mappers: Vec<RouteMapper>) -> Self {
        Self::new(
            RouteMapper::new(data_source_name, data_source_name),
            table_mappers,
        )
    }

    pub fn data_source_name(&self) -> &str {
        &self.data_source_mapper.actual_name
    }

    pub fn find_table_mapper(&self, logic_table: &str) -> Option<&RouteMapper> {
        self.table_mappers
            .iter()
            .find(|mapper| mapper.logic_name.eq_ignore_ascii_case(logic_table))
    }
}

/// Complete routing decision for one statement, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RouteContext {
    pub route_units: Vec<RouteUnit>,
}

impl RouteContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_units(route_units: Vec<RouteUnit>) -> Self {
        Self { route_units }
    }

    pub fn add_unit(&mut self, unit: RouteUnit) {
        self.route_units.push(unit);
    }

    pub fn route_units(&self) -> &[RouteUnit] {
        &self.route_units
    }

    pub fn is_empty(&self) -> bool {
        self.route_units.is_empty()
    }

    pub fn len(&self) -> usize {
        self.route_units.len()
    }

    /// Distinct actual data sources, in unit order.
    pub fn actual_data_source_names(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.route_units
            .iter()
            .map(RouteUnit::data_source_name)
            .filter(|name| seen.insert(*name))
            .collect()
    }

    /// Units addressed to `data_source_name`.
    pub fn units_in<'a, 'b>(&'a self, data_source_name: &'b str) -> impl Iterator<Item = &'a RouteUnit> + 'b
    where
        'a: 'b,
    {
        self.route_units
            .iter()
            .filter(move |unit| unit.data_source_name() == data_source_name)
    }

    pub fn find_unit(&self, data_source_name: &str) -> Option<&RouteUnit> {
        self.route_units
            .iter()
            .find(|unit| unit.data_source_name() == data_source_name)
    }
}

impl From<Vec<RouteUnit>> for RouteContext {
    fn from(route_units: Vec<RouteUnit>) -> Self {
        Self::from_units(route_units)
    }
}

impl IntoIterator for RouteContext {
    type Item = RouteUnit;
    type IntoIter = std::vec::IntoIter<RouteUnit>;

    fn into_iter(self) -> Self::IntoIter {
        self.route_units.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RouteContext {
        RouteContext::from_units(vec![
            RouteUnit::for_data_source("ds_1", vec![RouteMapper::new("t_order", "t_order_0")]),
            RouteUnit::for_data_source("ds_0", vec![RouteMapper::new("t_order", "t_order_1")]),
            RouteUnit::for_data_source("ds_1", vec![RouteMapper::new("t_order", "t_order_2")]),
        ])
    }

    #[test]
    fn test_actual_data_source_names_distinct_in_order() {
        assert_eq!(context().actual_data_source_names(), vec!["ds_1", "ds_0"]);
    }

    #[test]
    fn test_units_in() {
        let context = context();
        assert_eq!(context.units_in("ds_1").count(), 2);
        let unit = context.find_unit("ds_0").unwrap();
        assert_eq!(unit.find_table_mapper("T_ORDER").unwrap().actual_name, "t_order_1");
        assert!(context.find_unit("ds_9").is_none());
    }

    #[test]
    fn test_find_unit_outlives_lookup_key() {
        let context = context();
        let unit = {
            let key = String::from("ds_1");
            context.find_unit(&key)
        };
        assert_eq!(unit.unwrap().table_mappers[0].actual_name, "t_order_0");

        let first = context.units_in(&String::from("ds_1")).next();
        assert_eq!(first.unwrap().table_mappers[0].actual_name, "t_order_0");
    }

    #[test]
    fn test_empty_context() {
        let context = RouteContext::new();
        assert!(context.is_empty());
        assert_eq!(context.len(), 0);
        assert!(context.actual_data_source_names().is_empty());
    }

    #[test]
    fn test_serializes_for_output() {
        let value = serde_json::to_value(context()).unwrap();
        assert_eq!(value["route_units"][0]["data_source_mapper"]["actual_name"], "ds_1");
        assert_eq!(value["route_units"][2]["table_mappers"][0]["actual_name"], "t_order_2");
    }
}
