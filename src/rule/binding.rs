use super::ShardingTable;
use crate::core::normalize_name;

/// Logic tables sharded identically, so their shards join locally.
///
/// Tables are matched by position: the n-th node of one table on a data
/// source pairs with the n-th node of every other table on that source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingTableGroup {
    tables: Vec<ShardingTable>,
}

impl BindingTableGroup {
    pub(crate) fn new(tables: Vec<ShardingTable>) -> Self {
        Self { tables }
    }

    pub fn logic_table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|table| table.logic_table_name())
    }

    pub fn contains(&self, logic_table: &str) -> bool {
        self.find(logic_table).is_some()
    }

    /// Actual table of `other_logic_table` paired with `actual_table` of
    /// `logic_table` on `data_source_name`.
    pub fn binding_actual_table(
        &self,
        data_source_name: &str,
        logic_table: &str,
        other_logic_table: &str,
        actual_table: &str,
    ) -> Option<String> {
        let source = self.find(logic_table)?;
        let target = self.find(other_logic_table)?;
        let index = source
            .data_nodes_in(data_source_name)
            .position(|node| node.table_name() == actual_table)?;
        target
            .data_nodes_in(data_source_name)
            .nth(index)
            .map(|node| node.table_name().to_string())
    }

    fn find(&self, logic_table: &str) -> Option<&ShardingTable> {
        let key = normalize_name(logic_table);
        self.tables
            .iter()
            .find(|table| normalize_name(table.logic_table_name()) == key)
    }
}
