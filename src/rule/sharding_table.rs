use super::DataNode;
use crate::core::{RouteError, Result};
use std::collections::HashSet;

/// Placement of one logic table across its data nodes.
///
/// Node order is the configured shard enumeration order; it decides which
/// node a unicast statement lands on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardingTable {
    logic_table_name: String,
    actual_data_nodes: Vec<DataNode>,
    actual_data_source_names: Vec<String>,
}

impl ShardingTable {
    pub fn new(logic_table_name: impl Into<String>, actual_data_nodes: Vec<DataNode>) -> Result<Self> {
        let logic_table_name = logic_table_name.into();
        if actual_data_nodes.is_empty() {
            return Err(RouteError::ConfigError(format!(
                "Logic table '{}' has no actual data nodes",
                logic_table_name
            )));
        }

        let mut seen = HashSet::new();
        let actual_data_source_names = actual_data_nodes
            .iter()
            .filter(|node| seen.insert(node.data_source_name()))
            .map(|node| node.data_source_name().to_string())
            .collect();

        Ok(Self {
            logic_table_name,
            actual_data_nodes,
            actual_data_source_names,
        })
    }

    /// A broadcast table: the logic table itself on every data source.
    pub(crate) fn broadcast(logic_table_name: &str, data_source_names: &[String]) -> Result<Self> {
        let nodes = data_source_names
            .iter()
            .map(|ds| DataNode::new(ds.clone(), logic_table_name))
            .collect();
        Self::new(logic_table_name, nodes)
    }

    pub fn logic_table_name(&self) -> &str {
        &self.logic_table_name
    }

    pub fn actual_data_nodes(&self) -> &[DataNode] {
        &self.actual_data_nodes
    }

    /// Distinct data sources in first-appearance order
    pub fn actual_data_source_names(&self) -> &[String] {
        &self.actual_data_source_names
    }

    pub fn first_data_node(&self) -> &DataNode {
        // Construction rejects an empty node list.
        &self.actual_data_nodes[0]
    }

    /// Nodes placed on `data_source_name`, in configured order.
    pub fn data_nodes_in<'a>(&'a self, data_source_name: &'a str) -> impl Iterator<Item = &'a DataNode> + 'a {
        self.actual_data_nodes
            .iter()
            .filter(move |node| node.data_source_name() == data_source_name)
    }

    pub fn contains_data_node(&self, node: &DataNode) -> bool {
        self.actual_data_nodes.contains(node)
    }

    pub fn contains_data_source(&self, data_source_name: &str) -> bool {
        self.actual_data_source_names
            .iter()
            .any(|name| name == data_source_name)
    }
}
