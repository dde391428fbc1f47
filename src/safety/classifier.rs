//! Read-only classification of parsed SQL.
//!
//! Uses sqlparser-rs with the SQLite dialect and walks the AST looking for
//! anything that writes: top-level DML/DDL, data-modifying CTE bodies, and
//! writes hidden in derived tables or set operations.

use sqlparser::ast::{Query, Select, SetExpr, Statement, TableFactor, TableWithJoins};
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::Parser;

use super::{Rejection, StatementType};

/// Parses SQL and decides whether it is a single read-only query.
#[derive(Debug)]
pub struct ReadOnlyClassifier {
    dialect: SQLiteDialect,
}

impl Default for ReadOnlyClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadOnlyClassifier {
    pub fn new() -> Self {
        Self {
            dialect: SQLiteDialect {},
        }
    }

    /// Returns the statement type of a read-only query, or why it was refused.
    ///
    /// Parse failures are rejections: nothing the parser cannot understand is
    /// allowed through.
    pub fn classify(&self, sql: &str) -> Result<StatementType, Rejection> {
        let statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| Rejection::Unparseable(e.to_string()))?;

        match statements.as_slice() {
            [] => Err(Rejection::Empty),
            [statement] => {
                let kind = classify_statement(statement);
                if kind.is_read_only() {
                    Ok(kind)
                } else {
                    Err(Rejection::NotReadOnly(kind))
                }
            }
            _ => Err(Rejection::MultiStatement),
        }
    }
}

/// Classifies a single parsed statement.
fn classify_statement(statement: &Statement) -> StatementType {
    match statement {
        Statement::Query(query) => classify_query(query),
        // EXPLAIN (QUERY PLAN) is only as safe as what it wraps
        Statement::Explain { statement, .. } => match classify_statement(statement) {
            inner if inner.is_read_only() => StatementType::Explain,
            inner => inner,
        },

        Statement::Insert { .. } => StatementType::Insert,
        Statement::Update { .. } => StatementType::Update,
        Statement::Delete { .. } => StatementType::Delete,
        Statement::Drop { .. } => StatementType::Drop,
        Statement::Truncate { .. } => StatementType::Truncate,
        Statement::AlterTable { .. } => StatementType::Alter,
        Statement::CreateTable { .. } => StatementType::Create,
        Statement::CreateIndex { .. } => StatementType::Create,
        Statement::CreateView { .. } => StatementType::Create,
        Statement::Pragma { .. } => StatementType::Pragma,
        Statement::AttachDatabase { .. } => StatementType::Attach,

        _ => StatementType::Other,
    }
}

/// Returns the first non-read statement type found in a query, or `Select`.
fn classify_query(query: &Query) -> StatementType {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let kind = classify_query(&cte.query);
            if !kind.is_read_only() {
                return kind;
            }
        }
    }

    classify_set_expr(&query.body)
}

fn classify_set_expr(set_expr: &SetExpr) -> StatementType {
    match set_expr {
        SetExpr::Insert(stmt) | SetExpr::Update(stmt) => classify_statement(stmt),
        SetExpr::Query(query) => classify_query(query),
        SetExpr::Select(select) => classify_select(select),
        SetExpr::SetOperation { left, right, .. } => {
            let left = classify_set_expr(left);
            if left.is_read_only() {
                classify_set_expr(right)
            } else {
                left
            }
        }
        SetExpr::Values(_) | SetExpr::Table(_) => StatementType::Select,
        #[allow(unreachable_patterns)]
        _ => StatementType::Other,
    }
}

fn classify_select(select: &Select) -> StatementType {
    select
        .from
        .iter()
        .map(classify_table_with_joins)
        .find(|kind| !kind.is_read_only())
        .unwrap_or(StatementType::Select)
}

fn classify_table_with_joins(twj: &TableWithJoins) -> StatementType {
    std::iter::once(&twj.relation)
        .chain(twj.joins.iter().map(|join| &join.relation))
        .map(classify_table_factor)
        .find(|kind| !kind.is_read_only())
        .unwrap_or(StatementType::Select)
}

fn classify_table_factor(factor: &TableFactor) -> StatementType {
    match factor {
        TableFactor::Derived { subquery, .. } => classify_query(subquery),
        TableFactor::NestedJoin {
            table_with_joins, ..
        } => classify_table_with_joins(table_with_joins),
        _ => StatementType::Select,
    }
}
