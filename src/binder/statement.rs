use super::ShardingConditions;
use crate::core::normalize_name;
use std::collections::HashSet;

/// Statement shape, decided once during binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Dml(DmlKind),
    Ddl(DdlKind),
    View(ViewOp),
    Cursor(CursorOp),
    /// Transaction control
    Tcl(TclOp),
    /// Administrative statements: SHOW, SET, USE, DESCRIBE ...
    Dal(DalKind),
    /// GRANT / REVOKE
    Dcl,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmlKind {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DdlKind {
    CreateTable,
    AlterTable,
    DropTable,
    Truncate,
    CreateIndex,
    DropIndex,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewOp {
    Create,
    Alter,
    Drop,
}

/// Savepoints and `ROLLBACK TO` are `Other`: they leave the transaction open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TclOp {
    Begin,
    Commit,
    Rollback,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorOp {
    Declare,
    Fetch,
    Move,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DalKind {
    Show,
    Describe,
    Set,
    Use,
    Other,
}

/// Everything routing needs to know about one bound statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementContext {
    kind: StatementKind,
    tables: Vec<String>,
    conditions: ShardingConditions,
}

impl StatementContext {
    /// Tables are de-duplicated case-insensitively; first spelling wins.
    pub fn new<I, S>(kind: StatementKind, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let tables = tables
            .into_iter()
            .map(Into::into)
            .filter(|table: &String| seen.insert(normalize_name(table)))
            .collect();
        Self {
            kind,
            tables,
            conditions: ShardingConditions::default(),
        }
    }

    pub fn with_conditions(mut self, conditions: ShardingConditions) -> Self {
        self.conditions = conditions;
        self
    }

    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Referenced logic tables, in order of appearance
    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn conditions(&self) -> &ShardingConditions {
        &self.conditions
    }

    pub fn is_cursor(&self) -> bool {
        matches!(self.kind, StatementKind::Cursor(_))
    }

    pub fn is_view_ddl(&self) -> bool {
        matches!(self.kind, StatementKind::View(_))
    }

    /// Statements whose target must not move between calls.
    pub fn requires_pinned_data_source(&self) -> bool {
        self.is_cursor() || self.is_view_ddl()
    }

    pub fn is_select(&self) -> bool {
        self.kind == StatementKind::Dml(DmlKind::Select)
    }
}
