//! The query-builder capability consumed by relations.

use sea_query::{Value, Values};
use std::fmt;

/// A column reference, optionally qualified by its table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedColumn {
    pub table: Option<String>,
    pub column: String,
}

impl QualifiedColumn {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            column: column.into(),
        }
    }

    pub fn bare(column: impl Into<String>) -> Self {
        Self {
            table: None,
            column: column.into(),
        }
    }

    /// Parse `table.column` or `column`
    pub fn parse(reference: &str) -> Self {
        match reference.trim().rsplit_once('.') {
            Some((table, column)) => Self::new(table, column),
            None => Self::bare(reference.trim()),
        }
    }
}

impl fmt::Display for QualifiedColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.table {
            Some(table) => write!(f, "{table}.{}", self.column),
            None => write!(f, "{}", self.column),
        }
    }
}

/// One entry of a select list
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// `*`
    All,
    /// `table.*`
    AllOf(String),
    Column(QualifiedColumn),
    /// `table.column AS alias`
    Aliased {
        column: QualifiedColumn,
        alias: String,
    },
}

impl Selection {
    /// Parse `*`, `table.*`, `[table.]column` or `[table.]column as alias`
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim();
        if let Some((column, alias)) = split_alias(entry) {
            return Selection::Aliased {
                column: QualifiedColumn::parse(column),
                alias: alias.to_string(),
            };
        }
        if entry == "*" {
            return Selection::All;
        }
        match entry.strip_suffix(".*") {
            Some(table) => Selection::AllOf(table.to_string()),
            None => Selection::Column(QualifiedColumn::parse(entry)),
        }
    }

    /// Name the column carries in a result row, if it is a single column
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Selection::All | Selection::AllOf(_) => None,
            Selection::Column(column) => Some(&column.column),
            Selection::Aliased { alias, .. } => Some(alias),
        }
    }
}

fn split_alias(entry: &str) -> Option<(&str, &str)> {
    let lower = entry.to_ascii_lowercase();
    let index = lower.find(" as ")?;
    Some((entry[..index].trim(), entry[index + 4..].trim()))
}

/// Query-builder capability
///
/// Everything a relation needs from a query builder: inner joins on column
/// equality, bound and raw predicates, select-list management and rendering.
/// Implementations are cloned when a relation renders a query, so the
/// relation's own builder state is never consumed by execution.
pub trait QueryBuilder: Clone {
    /// Table named in the `FROM` clause
    fn from_table(&self) -> &str;

    /// `INNER JOIN table ON left = right`
    fn join(&mut self, table: &str, left: QualifiedColumn, right: QualifiedColumn);

    /// `column = $n`
    fn where_eq(&mut self, column: QualifiedColumn, value: Value);

    /// `column IN ($n, ...)`
    fn where_in(&mut self, column: QualifiedColumn, values: Vec<Value>);

    /// `column IS NULL`
    fn where_null(&mut self, column: QualifiedColumn);

    /// `column = <expression>` with the expression inlined verbatim
    fn where_raw_eq(&mut self, column: QualifiedColumn, expression: String);

    /// Whether an explicit select list has been set
    fn has_columns(&self) -> bool;

    /// Whether the select list already yields an output column called `name`
    fn has_output_column(&self, name: &str) -> bool;

    /// Replace the select list
    fn select(&mut self, columns: Vec<Selection>);

    /// Append to the select list
    fn add_select(&mut self, columns: Vec<Selection>);

    fn limit(&mut self, limit: u64);

    /// Quote a column reference for inlining into raw SQL
    fn wrap(&self, column: &QualifiedColumn) -> String;

    /// Render to SQL and bound values
    fn build(&self) -> (String, Values);
}
