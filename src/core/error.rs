use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("No common data source found for logic tables [{}]", .0.join(", "))]
    DataSourceIntersectionNotFound(Vec<String>),

    #[error("Sharding table rule not found for logic tables [{}]", .0.join(", "))]
    ShardingTableNotFound(Vec<String>),

    #[error("Data node '{data_node}' is not configured for logic table '{logic_table}'")]
    DataNodeNotConfigured {
        logic_table: String,
        data_node: String,
    },

    #[error("No data node routed for logic table '{0}'")]
    NoDataNodeRouted(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

pub type Result<T> = std::result::Result<T, RouteError>;

impl<T> From<std::sync::PoisonError<T>> for RouteError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for RouteError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for RouteError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}
