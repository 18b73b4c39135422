use crate::core::{RouteError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

const DELIMITER: char = '.';

/// One physical placement of a logic table: a table inside a data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataNode {
    data_source_name: String,
    table_name: String,
}

impl DataNode {
    pub fn new(data_source_name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self {
            data_source_name: data_source_name.into(),
            table_name: table_name.into(),
        }
    }

    /// Parses the `"<data_source>.<table>"` form used in configuration.
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let Some((data_source, table)) = text.split_once(DELIMITER) else {
            return Err(RouteError::ConfigError(format!(
                "Invalid data node format '{}', expected '<data_source>.<table>'",
                text
            )));
        };
        let (data_source, table) = (data_source.trim(), table.trim());
        if data_source.is_empty() || table.is_empty() || table.contains(DELIMITER) {
            return Err(RouteError::ConfigError(format!(
                "Invalid data node format '{}', expected '<data_source>.<table>'",
                text
            )));
        }
        Ok(Self::new(data_source, table))
    }

    pub fn data_source_name(&self) -> &str {
        &self.data_source_name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl fmt::Display for DataNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.data_source_name, DELIMITER, self.table_name)
    }
}
