use crate::core::{RouteError, Result, normalize_name};
use crate::rule::DataNode;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// How a connection's pinned data sources restrict later random choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinningMode {
    /// A non-empty used/preferred set is the selection pool as is.
    #[default]
    Trusted,
    /// The used/preferred set is intersected with the candidates; an empty
    /// intersection falls back to the candidates.
    CandidateFiltered,
}

/// Router-wide switches, independent of the sharding topology.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouterProps {
    /// Log every logical statement with its route units at info level
    #[serde(default)]
    pub sql_show: bool,

    #[serde(default)]
    pub pinning: PinningMode,
}

impl RouterProps {
    pub fn sql_show(mut self, enabled: bool) -> Self {
        self.sql_show = enabled;
        self
    }

    pub fn pinning(mut self, mode: PinningMode) -> Self {
        self.pinning = mode;
        self
    }
}

/// Placement of one sharded logic table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardingTableConfig {
    pub logic_table: String,

    /// `"<data_source>.<table>"` entries in shard enumeration order
    pub actual_data_nodes: Vec<String>,
}

impl ShardingTableConfig {
    pub fn new<I, S>(logic_table: &str, actual_data_nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            logic_table: logic_table.to_string(),
            actual_data_nodes: actual_data_nodes.into_iter().map(Into::into).collect(),
        }
    }
}

/// Sharding topology of one logical schema.
///
/// Built with the chained setters or deserialized from JSON:
///
/// ```
/// use shardroute::ShardingRuleConfig;
///
/// let config = ShardingRuleConfig::new(["ds_0", "ds_1"])
///     .table("t_order", ["ds_0.t_order_0", "ds_1.t_order_1"])
///     .broadcast_table("t_config");
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShardingRuleConfig {
    /// Every physical data source, in configured order
    pub data_sources: Vec<String>,

    #[serde(default)]
    pub tables: Vec<ShardingTableConfig>,

    #[serde(default)]
    pub binding_table_groups: Vec<Vec<String>>,

    #[serde(default)]
    pub broadcast_tables: Vec<String>,

    #[serde(default)]
    pub props: RouterProps,
}

impl ShardingRuleConfig {
    pub fn new<I, S>(data_sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            data_sources: data_sources.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Add a sharded logic table
    pub fn table<I, S>(mut self, logic_table: &str, actual_data_nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tables
            .push(ShardingTableConfig::new(logic_table, actual_data_nodes));
        self
    }

    /// Add a group of tables sharded identically
    pub fn binding_group<I, S>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.binding_table_groups
            .push(tables.into_iter().map(Into::into).collect());
        self
    }

    /// Add a table replicated onto every data source
    pub fn broadcast_table(mut self, table: &str) -> Self {
        self.broadcast_tables.push(table.to_string());
        self
    }

    pub fn props(mut self, props: RouterProps) -> Self {
        self.props = props;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.data_sources.is_empty() {
            return Err(config_error("data_sources must not be empty"));
        }

        let mut data_sources = HashSet::new();
        for name in &self.data_sources {
            if name.trim().is_empty() {
                return Err(config_error("data source name must not be empty"));
            }
            if !data_sources.insert(name.as_str()) {
                return Err(config_error(format!(
                    "Data source '{}' appears more than once",
                    name
                )));
            }
        }

        let mut node_counts: HashMap<String, HashMap<String, usize>> = HashMap::new();
        for table in &self.tables {
            let key = normalize_name(&table.logic_table);
            if key.is_empty() {
                return Err(config_error("logic table name must not be empty"));
            }
            if node_counts.contains_key(&key) {
                return Err(config_error(format!(
                    "Logic table '{}' is configured more than once",
                    table.logic_table
                )));
            }
            if table.actual_data_nodes.is_empty() {
                return Err(config_error(format!(
                    "Logic table '{}' has no actual data nodes",
                    table.logic_table
                )));
            }

            let mut per_source = HashMap::new();
            let mut seen = HashSet::new();
            for raw in &table.actual_data_nodes {
                let node = DataNode::parse(raw)?;
                if !data_sources.contains(node.data_source_name()) {
                    return Err(config_error(format!(
                        "Data node '{}' of logic table '{}' refers to unknown data source",
                        raw, table.logic_table
                    )));
                }
                if !seen.insert(node.clone()) {
                    return Err(config_error(format!(
                        "Data node '{}' appears more than once for logic table '{}'",
                        raw, table.logic_table
                    )));
                }
                *per_source
                    .entry(node.data_source_name().to_string())
                    .or_insert(0usize) += 1;
            }
            node_counts.insert(key, per_source);
        }

        let mut broadcast = HashSet::new();
        for table in &self.broadcast_tables {
            let key = normalize_name(table);
            if key.is_empty() {
                return Err(config_error("broadcast table name must not be empty"));
            }
            if node_counts.contains_key(&key) {
                return Err(config_error(format!(
                    "Table '{}' cannot be both sharded and broadcast",
                    table
                )));
            }
            broadcast.insert(key);
        }

        let mut bound = HashSet::new();
        for group in &self.binding_table_groups {
            if group.len() < 2 {
                return Err(config_error(
                    "binding table group needs at least two tables",
                ));
            }
            let mut shape: Option<&HashMap<String, usize>> = None;
            for table in group {
                let key = normalize_name(table);
                let Some(counts) = node_counts.get(&key) else {
                    return Err(config_error(format!(
                        "Binding table '{}' is not a sharded table",
                        table
                    )));
                };
                if !bound.insert(key) {
                    return Err(config_error(format!(
                        "Table '{}' belongs to more than one binding group",
                        table
                    )));
                }
                match shape {
                    None => shape = Some(counts),
                    Some(expected) if expected != counts => {
                        return Err(config_error(format!(
                            "Binding table '{}' is not sharded like the rest of its group",
                            table
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> RouteError {
    RouteError::ConfigError(message.into())
}
