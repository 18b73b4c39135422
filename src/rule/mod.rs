// ============================================================================
// Sharding Rule Module
// ============================================================================
//
// Immutable topology consulted by every route engine:
// - DataNode: one (data source, table) placement
// - ShardingTable: ordered placements of one logic table
// - BindingTableGroup: tables sharded identically
// - ShardingRule: the whole schema, swapped atomically via ShardingRuleHolder
//
// ============================================================================

pub mod binding;
pub mod data_node;
pub mod holder;
pub mod sharding_rule;
pub mod sharding_table;

pub use binding::BindingTableGroup;
pub use data_node::DataNode;
pub use holder::ShardingRuleHolder;
pub use sharding_rule::ShardingRule;
pub use sharding_table::ShardingTable;
