use crate::core::{RouteError, Result};
use crate::route::RouteContext;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Routing state of one logical client connection
///
/// Records which data sources the connection has already touched so that
/// later random choices converge on them. Owned by exactly one connection and
/// never shared; route engines only read it, the caller writes it through
/// [`record_route`](Self::record_route) after routing.
#[derive(Debug)]
pub struct ConnectionContext {
    /// Unique connection ID
    id: u64,
    state: ConnectionState,
    used_data_source_names: Vec<String>,
    /// Session hint consulted when nothing has been used yet
    preferred_data_source_names: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Active,
    InTransaction,
    Closed,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self::with_id(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn with_id(id: u64) -> Self {
        Self {
            id,
            state: ConnectionState::Active,
            used_data_source_names: Vec::new(),
            preferred_data_source_names: Vec::new(),
        }
    }

    /// Get connection ID
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Data sources already used, in first-use order
    pub fn used_data_source_names(&self) -> &[String] {
        &self.used_data_source_names
    }

    pub fn preferred_data_source_names(&self) -> &[String] {
        &self.preferred_data_source_names
    }

    /// Pool that pins random selection: used names first, then the session
    /// preference. Empty when the connection is unpinned.
    pub fn pinned_data_source_names(&self) -> &[String] {
        if self.used_data_source_names.is_empty() {
            &self.preferred_data_source_names
        } else {
            &self.used_data_source_names
        }
    }

    pub fn set_preferred_data_source_names<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_data_source_names.clear();
        for name in names {
            push_distinct(&mut self.preferred_data_source_names, name.into());
        }
    }

    /// Record a data source chosen for this connection.
    pub fn add_used_data_source_name(&mut self, name: impl Into<String>) {
        push_distinct(&mut self.used_data_source_names, name.into());
    }

    /// Record every data source a finished route dispatches to.
    pub fn record_route(&mut self, route_context: &RouteContext) -> Result<()> {
        self.ensure_open()?;
        for name in route_context.actual_data_source_names() {
            push_distinct(&mut self.used_data_source_names, name.to_string());
        }
        Ok(())
    }

    pub fn clear_used_data_source_names(&mut self) {
        self.used_data_source_names.clear();
    }

    /// Begin a new transaction
    pub fn begin(&mut self) -> Result<()> {
        self.ensure_open()?;

        if self.state == ConnectionState::InTransaction {
            return Err(RouteError::ConnectionError("Transaction already active".into()));
        }

        self.state = ConnectionState::InTransaction;
        debug!(connection_id = self.id, "Transaction started");
        Ok(())
    }

    /// Commit the current transaction
    pub fn commit(&mut self) -> Result<()> {
        self.finish_transaction("committed")
    }

    /// Rollback the current transaction
    pub fn rollback(&mut self) -> Result<()> {
        self.finish_transaction("rolled back")
    }

    /// Check if connection is in a transaction
    pub fn is_in_transaction(&self) -> bool {
        self.state == ConnectionState::InTransaction
    }

    /// Check if connection is active
    pub fn is_active(&self) -> bool {
        self.state != ConnectionState::Closed
    }

    /// Close the connection
    pub fn close(&mut self) -> Result<()> {
        if self.state == ConnectionState::InTransaction {
            self.rollback()?;
        }

        self.used_data_source_names.clear();
        self.preferred_data_source_names.clear();
        self.state = ConnectionState::Closed;
        Ok(())
    }

    pub(crate) fn ensure_open(&self) -> Result<()> {
        if self.state == ConnectionState::Closed {
            return Err(RouteError::ConnectionError("Connection is closed".into()));
        }
        Ok(())
    }

    fn finish_transaction(&mut self, outcome: &str) -> Result<()> {
        if self.state != ConnectionState::InTransaction {
            return Err(RouteError::ConnectionError("No active transaction".into()));
        }

        self.state = ConnectionState::Active;
        self.used_data_source_names.clear();
        debug!(connection_id = self.id, outcome, "Transaction finished");
        Ok(())
    }
}

impl Default for ConnectionContext {
    fn default() -> Self {
        Self::new()
    }
}

fn push_distinct(names: &mut Vec<String>, name: String) {
    if !names.contains(&name) {
        names.push(name);
    }
}
