use super::{BindingTableGroup, DataNode, ShardingTable};
use crate::config::ShardingRuleConfig;
use crate::core::{Result, normalize_name};
use std::collections::HashMap;

/// Immutable sharding topology of one logical schema.
///
/// Built once from a validated [`ShardingRuleConfig`] and shared read-only by
/// every routing call. A configuration change builds a new rule; see
/// [`ShardingRuleHolder`](super::ShardingRuleHolder).
#[derive(Debug, Clone)]
pub struct ShardingRule {
    data_source_names: Vec<String>,
    sharding_tables: HashMap<String, ShardingTable>,
    broadcast_tables: HashMap<String, ShardingTable>,
    binding_groups: Vec<BindingTableGroup>,
}

impl ShardingRule {
    pub fn new(config: &ShardingRuleConfig) -> Result<Self> {
        config.validate()?;

        let mut sharding_tables = HashMap::new();
        for table in &config.tables {
            let nodes = table
                .actual_data_nodes
                .iter()
                .map(|raw| DataNode::parse(raw))
                .collect::<Result<Vec<_>>>()?;
            sharding_tables.insert(
                normalize_name(&table.logic_table),
                ShardingTable::new(table.logic_table.clone(), nodes)?,
            );
        }

        let mut broadcast_tables = HashMap::new();
        for table in &config.broadcast_tables {
            broadcast_tables.insert(
                normalize_name(table),
                ShardingTable::broadcast(table, &config.data_sources)?,
            );
        }

        let binding_groups = config
            .binding_table_groups
            .iter()
            .map(|group| {
                BindingTableGroup::new(
                    group
                        .iter()
                        .filter_map(|name| sharding_tables.get(&normalize_name(name)).cloned())
                        .collect(),
                )
            })
            .collect();

        Ok(Self {
            data_source_names: config.data_sources.clone(),
            sharding_tables,
            broadcast_tables,
            binding_groups,
        })
    }

    /// Every configured data source, in configured order
    pub fn data_source_names(&self) -> &[String] {
        &self.data_source_names
    }

    pub fn first_data_source_name(&self) -> &str {
        // Validation rejects an empty data source list.
        &self.data_source_names[0]
    }

    pub fn find_sharding_table(&self, logic_table: &str) -> Option<&ShardingTable> {
        self.sharding_tables.get(&normalize_name(logic_table))
    }

    /// Sharded or broadcast placement of a logic table.
    pub fn find_table(&self, logic_table: &str) -> Option<&ShardingTable> {
        let key = normalize_name(logic_table);
        self.sharding_tables
            .get(&key)
            .or_else(|| self.broadcast_tables.get(&key))
    }

    pub fn is_sharding_table(&self, logic_table: &str) -> bool {
        self.find_sharding_table(logic_table).is_some()
    }

    pub fn is_broadcast_table(&self, logic_table: &str) -> bool {
        self.broadcast_tables.contains_key(&normalize_name(logic_table))
    }

    /// True when the rule knows the table, sharded or broadcast.
    pub fn contains_table(&self, logic_table: &str) -> bool {
        self.find_table(logic_table).is_some()
    }

    pub fn is_all_broadcast_tables(&self, logic_tables: &[String]) -> bool {
        !logic_tables.is_empty() && logic_tables.iter().all(|t| self.is_broadcast_table(t))
    }

    /// Subset of `logic_tables` that is sharded, order kept.
    pub fn sharding_logic_table_names(&self, logic_tables: &[String]) -> Vec<String> {
        logic_tables
            .iter()
            .filter(|t| self.is_sharding_table(t))
            .cloned()
            .collect()
    }

    /// Subset of `logic_tables` that is sharded or broadcast, order kept.
    pub fn rule_table_names(&self, logic_tables: &[String]) -> Vec<String> {
        logic_tables
            .iter()
            .filter(|t| self.contains_table(t))
            .cloned()
            .collect()
    }

    pub fn find_binding_group(&self, logic_table: &str) -> Option<&BindingTableGroup> {
        self.binding_groups
            .iter()
            .find(|group| group.contains(logic_table))
    }

    /// True when every table belongs to the same binding group.
    pub fn is_all_binding_tables(&self, logic_tables: &[String]) -> bool {
        let Some(first) = logic_tables.first() else {
            return false;
        };
        match self.find_binding_group(first) {
            Some(group) => logic_tables.iter().all(|t| group.contains(t)),
            None => false,
        }
    }

    /// First configured node of a sharded or broadcast table.
    pub fn data_node(&self, logic_table: &str) -> Option<&DataNode> {
        self.find_table(logic_table).map(ShardingTable::first_data_node)
    }

    pub fn broadcast_table_names(&self) -> impl Iterator<Item = &str> {
        self.broadcast_tables
            .values()
            .map(|table| table.logic_table_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RouteError;

    fn rule() -> ShardingRule {
        let config = ShardingRuleConfig::new(["ds_0", "ds_1"])
            .table("t_order", ["ds_0.t_order_0", "ds_1.t_order_1"])
            .table("t_order_item", ["ds_0.t_order_item_0", "ds_1.t_order_item_1"])
            .table("t_user", ["ds_1.t_user_0"])
            .binding_group(["t_order", "t_order_item"])
            .broadcast_table("t_config");
        ShardingRule::new(&config).unwrap()
    }

    fn names(tables: &[&str]) -> Vec<String> {
        tables.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_table_lookups() {
        let rule = rule();
        assert!(rule.is_sharding_table("T_ORDER"));
        assert!(!rule.is_sharding_table("t_config"));
        assert!(rule.is_broadcast_table("t_config"));
        assert!(rule.contains_table("t_config"));
        assert!(!rule.contains_table("t_unknown"));
        assert_eq!(rule.first_data_source_name(), "ds_0");
        assert_eq!(rule.broadcast_table_names().collect::<Vec<_>>(), vec!["t_config"]);
    }

    #[test]
    fn test_data_node_is_first_configured() {
        let rule = rule();
        assert_eq!(rule.data_node("t_order"), Some(&DataNode::new("ds_0", "t_order_0")));
        assert_eq!(rule.data_node("t_config"), Some(&DataNode::new("ds_0", "t_config")));
        assert_eq!(rule.data_node("t_unknown"), None);
    }

    #[test]
    fn test_broadcast_helpers() {
        let rule = rule();
        assert!(rule.is_all_broadcast_tables(&names(&["t_config"])));
        assert!(!rule.is_all_broadcast_tables(&names(&["t_config", "t_order"])));
        assert!(!rule.is_all_broadcast_tables(&[]));
    }

    #[test]
    fn test_sharding_logic_table_names_keep_order() {
        let rule = rule();
        assert_eq!(
            rule.sharding_logic_table_names(&names(&["t_user", "t_config", "x", "t_order"])),
            names(&["t_user", "t_order"])
        );
        assert_eq!(
            rule.rule_table_names(&names(&["x", "t_config"])),
            names(&["t_config"])
        );
    }

    #[test]
    fn test_binding_tables() {
        let rule = rule();
        assert!(rule.is_all_binding_tables(&names(&["t_order", "t_order_item"])));
        assert!(!rule.is_all_binding_tables(&names(&["t_order", "t_user"])));
        assert!(!rule.is_all_binding_tables(&names(&["t_user"])));
        assert!(!rule.is_all_binding_tables(&[]));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ShardingRuleConfig::new(Vec::<String>::new());
        assert!(matches!(
            ShardingRule::new(&config),
            Err(RouteError::ConfigError(_))
        ));
    }
}
