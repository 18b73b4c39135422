use crate::core::normalize_name;
use crate::rule::DataNode;
use std::collections::HashMap;

/// Placements already resolved by the pluggable shard algorithm.
///
/// A table without an entry is unconstrained and routes to all of its nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShardingConditions {
    resolved: HashMap<String, Vec<DataNode>>,
    always_false: bool,
}

impl ShardingConditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The WHERE clause can never match; no shard needs to be scanned.
    pub fn always_false() -> Self {
        Self {
            resolved: HashMap::new(),
            always_false: true,
        }
    }

    pub fn resolve(mut self, logic_table: &str, data_nodes: Vec<DataNode>) -> Self {
        self.resolved
            .entry(normalize_name(logic_table))
            .or_default()
            .extend(data_nodes);
        self
    }

    pub fn is_always_false(&self) -> bool {
        self.always_false
    }

    pub fn is_empty(&self) -> bool {
        self.resolved.is_empty()
    }

    pub fn has_condition(&self, logic_table: &str) -> bool {
        self.resolved.contains_key(&normalize_name(logic_table))
    }

    pub fn resolved_nodes(&self, logic_table: &str) -> Option<&[DataNode]> {
        self.resolved
            .get(&normalize_name(logic_table))
            .map(Vec::as_slice)
    }
}
