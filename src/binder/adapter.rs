// ============================================================================
// src/binder/adapter.rs - SQL text to bound statements
// ============================================================================

use super::{CursorOp, DalKind, DdlKind, DmlKind, StatementContext, StatementKind, TclOp, ViewOp};
use crate::core::{RouteError, Result, normalize_name, unquote_identifier};
use serde::{Deserialize, Serialize};
use sqlparser::ast::{self as sql_ast, Visit, Visitor};
use sqlparser::dialect::{Dialect, MySqlDialect, PostgreSqlDialect};
use sqlparser::parser::Parser;
use std::collections::HashSet;
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    #[default]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
}

impl SqlDialect {
    fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
            SqlDialect::MySql => Box::new(MySqlDialect {}),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = RouteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "mysql" => Ok(SqlDialect::MySql),
            other => Err(RouteError::ConfigError(format!("Unknown SQL dialect '{}'", other))),
        }
    }
}

impl fmt::Display for SqlDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlDialect::Postgres => write!(f, "postgres"),
            SqlDialect::MySql => write!(f, "mysql"),
        }
    }
}

/// Turns SQL text into [`StatementContext`]s: statement kind plus the logic
/// tables it references.
///
/// Sharding values are not evaluated here; conditions stay empty unless the
/// caller attaches them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlStatementBinder {
    dialect: SqlDialect,
}

impl SqlStatementBinder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: SqlDialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    pub fn bind(&self, sql: &str) -> Result<Vec<StatementContext>> {
        if tokenize(sql).is_empty() {
            return Err(RouteError::ParseError("Empty statement".into()));
        }

        match self.parse(sql) {
            Ok(statements) => statements
                .iter()
                .map(|statement| self.bind_statement(statement))
                .collect(),
            // Not every dialect parses transaction, cursor and session
            // statements; bind such batches one statement at a time.
            Err(err) => {
                trace!(error = %err, "Batch rejected by parser, binding statements separately");
                let mut contexts = Vec::new();
                for text in split_statements(sql) {
                    contexts.extend(self.bind_text(text)?);
                }
                Ok(contexts)
            }
        }
    }

    fn parse(&self, sql: &str) -> Result<Vec<sql_ast::Statement>> {
        let dialect = self.dialect.parser_dialect();
        Parser::parse_sql(dialect.as_ref(), sql).map_err(|e| RouteError::ParseError(e.to_string()))
    }

    /// One statement of SQL text: keyword recognition first, parser second.
    fn bind_text(&self, sql: &str) -> Result<Vec<StatementContext>> {
        let tokens = tokenize(sql);
        if let Some(kind) = recognize_keyword_kind(&tokens) {
            let mut tables = keyword_tables(kind, &tokens);
            if tables.is_empty()
                && matches!(kind, StatementKind::View(_) | StatementKind::Cursor(_) | StatementKind::Dal(DalKind::Other))
            {
                tables = self.referenced_tables(sql);
            }
            trace!(?kind, ?tables, "Statement recognized by keyword");
            return Ok(vec![StatementContext::new(kind, tables)]);
        }

        self.parse(sql)?
            .iter()
            .map(|statement| self.bind_statement(statement))
            .collect()
    }

    /// Best effort: statements the parser rejects reference no tables.
    fn referenced_tables(&self, sql: &str) -> Vec<String> {
        let Ok(statements) = self.parse(sql) else {
            return Vec::new();
        };
        let mut collector = TableCollector::default();
        for statement in &statements {
            let _ = statement.visit(&mut collector);
        }
        collector.finish()
    }

    fn bind_statement(&self, statement: &sql_ast::Statement) -> Result<StatementContext> {
        let tokens = tokenize(&statement.to_string());
        let mut collector = TableCollector::default();
        let kind = match recognize_keyword_kind(&tokens) {
            Some(kind) => {
                collector.tables.extend(keyword_tables(kind, &tokens));
                kind
            }
            None => classify(statement, &tokens, &mut collector)?,
        };

        let _ = statement.visit(&mut collector);
        Ok(StatementContext::new(kind, collector.finish()))
    }
}

fn classify(
    statement: &sql_ast::Statement,
    tokens: &[String],
    collector: &mut TableCollector,
) -> Result<StatementKind> {
    let kind = match statement {
        sql_ast::Statement::Query(_) => StatementKind::Dml(DmlKind::Select),
        sql_ast::Statement::Insert(insert) => {
            collector.push_name(&insert.table.to_string());
            StatementKind::Dml(DmlKind::Insert)
        }
        sql_ast::Statement::Update { .. } => StatementKind::Dml(DmlKind::Update),
        sql_ast::Statement::Delete(_) => StatementKind::Dml(DmlKind::Delete),
        sql_ast::Statement::CreateTable(create) => {
            collector.push_object(&create.name);
            StatementKind::Ddl(DdlKind::CreateTable)
        }
        sql_ast::Statement::AlterTable { name, .. } => {
            collector.push_object(name);
            StatementKind::Ddl(DdlKind::AlterTable)
        }
        sql_ast::Statement::CreateIndex(index) => {
            collector.push_object(&index.table_name);
            StatementKind::Ddl(DdlKind::CreateIndex)
        }
        sql_ast::Statement::Drop { object_type, names, .. } => match object_type {
            sql_ast::ObjectType::Table => {
                for name in names {
                    collector.push_object(name);
                }
                StatementKind::Ddl(DdlKind::DropTable)
            }
            sql_ast::ObjectType::Index => StatementKind::Ddl(DdlKind::DropIndex),
            _ => StatementKind::Ddl(DdlKind::Other),
        },
        _ => {
            let kind = recognize_ddl_kind(tokens).ok_or_else(|| {
                RouteError::UnsupportedOperation(format!(
                    "Statement not supported by the router: {}",
                    tokens.first().map(String::as_str).unwrap_or_default()
                ))
            })?;
            collector.tables.extend(keyword_tables(kind, tokens));
            kind
        }
    };
    Ok(kind)
}

/// Splits a batch on `;` outside quotes and line comments.
fn split_statements(sql: &str) -> impl Iterator<Item = &str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut quote: Option<char> = None;
    let mut chars = sql.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"' | '`') => quote = Some(c),
            (None, '-') if chars.peek().is_some_and(|&(_, next)| next == '-') => quote = Some('\n'),
            (None, ';') => {
                pieces.push(&sql[start..i]);
                start = i + 1;
            }
            (None, _) => {}
        }
    }
    pieces.push(&sql[start..]);

    pieces.into_iter().map(str::trim).filter(|piece| !piece.is_empty())
}

/// Collects every relation a statement reads or writes, minus CTE names.
#[derive(Default)]
struct TableCollector {
    tables: Vec<String>,
    cte_names: HashSet<String>,
}

impl TableCollector {
    fn push_object(&mut self, name: &sql_ast::ObjectName) {
        if let Some(part) = name.0.last() {
            self.tables.push(unquote_identifier(&part.to_string()).to_string());
        }
    }

    /// `schema.table` rendered as text; only the last part is the table.
    fn push_name(&mut self, name: &str) {
        if let Some(table) = last_name_part(name) {
            self.tables.push(table);
        }
    }

    fn finish(self) -> Vec<String> {
        let cte_names = self.cte_names;
        self.tables
            .into_iter()
            .filter(|table| !cte_names.contains(&normalize_name(table)))
            .collect()
    }
}

impl Visitor for TableCollector {
    type Break = ();

    fn pre_visit_query(&mut self, query: &sql_ast::Query) -> ControlFlow<Self::Break> {
        if let Some(with) = &query.with {
            for cte in &with.cte_tables {
                self.cte_names.insert(normalize_name(&cte.alias.name.value));
            }
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_relation(&mut self, relation: &sql_ast::ObjectName) -> ControlFlow<Self::Break> {
        self.push_object(relation);
        ControlFlow::Continue(())
    }
}

fn tokenize(sql: &str) -> Vec<String> {
    sql.split(|c: char| c.is_whitespace() || matches!(c, ',' | ';' | '(' | ')'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

fn last_name_part(name: &str) -> Option<String> {
    let table = unquote_identifier(name.rsplit('.').next()?);
    (!table.is_empty()).then(|| table.to_string())
}

fn upper(tokens: &[String], index: usize) -> String {
    tokens
        .get(index)
        .map(|token| token.to_ascii_uppercase())
        .unwrap_or_default()
}

fn recognize_keyword_kind(tokens: &[String]) -> Option<StatementKind> {
    let first = upper(tokens, 0);
    let kind = match first.as_str() {
        "BEGIN" | "START" => StatementKind::Tcl(TclOp::Begin),
        "COMMIT" | "END" => StatementKind::Tcl(TclOp::Commit),
        "ROLLBACK" | "ABORT" if tokens.iter().skip(1).any(|t| t.eq_ignore_ascii_case("TO")) => {
            StatementKind::Tcl(TclOp::Other)
        }
        "ROLLBACK" | "ABORT" => StatementKind::Tcl(TclOp::Rollback),
        "SAVEPOINT" | "RELEASE" => StatementKind::Tcl(TclOp::Other),
        "DECLARE" => StatementKind::Cursor(CursorOp::Declare),
        "FETCH" => StatementKind::Cursor(CursorOp::Fetch),
        "MOVE" => StatementKind::Cursor(CursorOp::Move),
        "CLOSE" => StatementKind::Cursor(CursorOp::Close),
        "SHOW" => StatementKind::Dal(DalKind::Show),
        "DESCRIBE" | "DESC" => StatementKind::Dal(DalKind::Describe),
        "EXPLAIN" => StatementKind::Dal(DalKind::Other),
        "SET" => StatementKind::Dal(DalKind::Set),
        "USE" => StatementKind::Dal(DalKind::Use),
        "GRANT" | "REVOKE" => StatementKind::Dcl,
        "CREATE" | "ALTER" | "DROP" => {
            let object = (1..tokens.len().min(6))
                .map(|i| upper(tokens, i))
                .find(|word| {
                    !matches!(
                        word.as_str(),
                        "OR" | "REPLACE" | "MATERIALIZED" | "TEMP" | "TEMPORARY" | "RECURSIVE"
                    )
                })?;
            match (first.as_str(), object.as_str()) {
                ("CREATE", "VIEW") => StatementKind::View(ViewOp::Create),
                ("ALTER", "VIEW") => StatementKind::View(ViewOp::Alter),
                ("DROP", "VIEW") => StatementKind::View(ViewOp::Drop),
                (_, "USER" | "ROLE") => StatementKind::Dcl,
                _ => return None,
            }
        }
        _ => return None,
    };
    Some(kind)
}

fn recognize_ddl_kind(tokens: &[String]) -> Option<StatementKind> {
    match upper(tokens, 0).as_str() {
        "TRUNCATE" => Some(StatementKind::Ddl(DdlKind::Truncate)),
        "CREATE" | "ALTER" | "DROP" | "COMMENT" | "RENAME" => Some(StatementKind::Ddl(DdlKind::Other)),
        _ => None,
    }
}

/// Tables named directly by keyword statements that the AST walk misses.
fn keyword_tables(kind: StatementKind, tokens: &[String]) -> Vec<String> {
    match kind {
        StatementKind::Dal(DalKind::Describe) => tokens.get(1).and_then(|t| last_name_part(t)).into_iter().collect(),
        StatementKind::Dal(DalKind::Show) => names_after(tokens, &["FROM", "IN"], &[], &["LIKE", "WHERE"]),
        StatementKind::Dcl => names_after(tokens, &["ON"], &["TABLE"], &["TO", "FROM", "ALL"]),
        StatementKind::Ddl(DdlKind::Truncate) => names_after(
            tokens,
            &["TRUNCATE"],
            &["TABLE", "ONLY"],
            &["RESTART", "CONTINUE", "CASCADE", "RESTRICT", "PARTITION"],
        ),
        _ => Vec::new(),
    }
}

/// Names following the first `markers` keyword, skipping `skip` words and
/// stopping at any `stop` word.
fn names_after(tokens: &[String], markers: &[&str], skip: &[&str], stop: &[&str]) -> Vec<String> {
    let Some(start) = tokens
        .iter()
        .position(|t| markers.contains(&t.to_ascii_uppercase().as_str()))
    else {
        return Vec::new();
    };

    tokens[start + 1..]
        .iter()
        .map(|token| (token, token.to_ascii_uppercase()))
        .skip_while(|(_, word)| skip.contains(&word.as_str()))
        .take_while(|(_, word)| !stop.contains(&word.as_str()))
        .filter_map(|(token, _)| last_name_part(token))
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
