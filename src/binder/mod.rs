// ============================================================================
// Statement Binding
// ============================================================================
//
// The statement kind is decided once here and travels with the statement as
// a plain enum value. Route engines switch on it; nothing downstream looks at
// the SQL text or AST again.
//
// ============================================================================

pub mod adapter;
pub mod conditions;
pub mod statement;

pub use adapter::{SqlDialect, SqlStatementBinder};
pub use conditions::ShardingConditions;
pub use statement::{
    CursorOp, DalKind, DdlKind, DmlKind, StatementContext, StatementKind, TclOp, ViewOp,
};
