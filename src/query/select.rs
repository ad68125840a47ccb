//! Select query builder backed by sea-query.
//!
//! `SelectQuery` records joins, predicates and the select list as plain data
//! so relations (and tests) can inspect them, and renders a sea-query
//! `SelectStatement` on demand.

use crate::query::builder::{QualifiedColumn, QueryBuilder, Selection};
use sea_query::{
    Asterisk, Expr, ExprTrait, Iden, JoinType, PostgresQueryBuilder, Query, SelectStatement,
    Value, Values,
};

/// Owned identifier handed to sea-query
#[derive(Debug, Clone)]
struct Ident(String);

impl Ident {
    fn new(name: &str) -> Self {
        Ident(name.to_string())
    }
}

impl Iden for Ident {
    fn unquoted(&self) -> &str {
        &self.0
    }
}

/// Split `schema.table` into its parts
fn split_schema(table: &str) -> (Option<&str>, &str) {
    match table.split_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, table),
    }
}

fn column_expr(column: &QualifiedColumn) -> Expr {
    let name = Ident::new(&column.column);
    match column.table.as_deref().map(split_schema) {
        Some((Some(schema), table)) => Expr::col((Ident::new(schema), Ident::new(table), name)),
        Some((None, table)) => Expr::col((Ident::new(table), name)),
        None => Expr::col(name),
    }
}

fn quote(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quoted, possibly schema-qualified table name
fn quote_table(table: &str) -> String {
    match split_schema(table) {
        (Some(schema), table) => format!("{}.{}", quote(schema), quote(table)),
        (None, table) => quote(table),
    }
}

/// An `INNER JOIN table ON left = right` clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: String,
    pub left: QualifiedColumn,
    pub right: QualifiedColumn,
}

/// A `WHERE` predicate; all predicates are combined with `AND`
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(QualifiedColumn, Value),
    In(QualifiedColumn, Vec<Value>),
    Null(QualifiedColumn),
    RawEq(QualifiedColumn, String),
    Exists(Box<SelectQuery>),
}

impl Predicate {
    fn to_expr(&self) -> Expr {
        match self {
            Predicate::Eq(column, value) => column_expr(column).eq(value.clone()),
            Predicate::In(column, values) => column_expr(column).is_in(values.iter().cloned()),
            Predicate::Null(column) => column_expr(column).is_null(),
            Predicate::RawEq(column, expression) => {
                column_expr(column).eq(Expr::cust(expression.clone()))
            }
            Predicate::Exists(subquery) => Expr::exists(subquery.statement()),
        }
    }
}

/// Query builder for selecting records
///
/// # Example
///
/// ```
/// use belongs_to_through::query::{QualifiedColumn, QueryBuilder, SelectQuery, Selection};
///
/// let mut query = SelectQuery::new("countries");
/// query.select(vec![Selection::parse("countries.*")]);
/// query.where_null(QualifiedColumn::new("countries", "deleted_at"));
/// query.limit(1);
///
/// let (sql, _) = query.build();
/// assert_eq!(
///     sql,
///     r#"SELECT "countries".* FROM "countries" WHERE "countries"."deleted_at" IS NULL LIMIT $1"#
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    columns: Vec<Selection>,
    joins: Vec<Join>,
    predicates: Vec<Predicate>,
    limit: Option<u64>,
}

impl SelectQuery {
    /// Create a new select query over `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            joins: Vec::new(),
            predicates: Vec::new(),
            limit: None,
        }
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn columns(&self) -> &[Selection] {
        &self.columns
    }

    /// `WHERE EXISTS (subquery)`, for whereHas-style filtering
    pub fn where_exists(&mut self, subquery: SelectQuery) {
        self.predicates.push(Predicate::Exists(Box::new(subquery)));
    }

    /// Render the sea-query statement
    pub fn statement(&self) -> SelectStatement {
        let mut statement = Query::select();
        match split_schema(&self.table) {
            (Some(schema), table) => statement.from((Ident::new(schema), Ident::new(table))),
            (None, table) => statement.from(Ident::new(table)),
        };

        if self.columns.is_empty() {
            statement.column(Asterisk);
        }
        for selection in &self.columns {
            match selection {
                Selection::All => {
                    statement.column(Asterisk);
                }
                Selection::AllOf(table) => match split_schema(table) {
                    (Some(_), _) => {
                        statement.expr(Expr::cust(format!("{}.*", quote_table(table))));
                    }
                    (None, table) => {
                        statement.column((Ident::new(table), Asterisk));
                    }
                },
                Selection::Column(column) => {
                    statement.expr(column_expr(column));
                }
                Selection::Aliased { column, alias } => {
                    statement.expr_as(column_expr(column), Ident::new(alias));
                }
            }
        }

        for join in &self.joins {
            let on = column_expr(&join.left).eq(column_expr(&join.right));
            match split_schema(&join.table) {
                (Some(schema), table) => statement.join(
                    JoinType::InnerJoin,
                    (Ident::new(schema), Ident::new(table)),
                    on,
                ),
                (None, table) => statement.join(JoinType::InnerJoin, Ident::new(table), on),
            };
        }

        for predicate in &self.predicates {
            statement.and_where(predicate.to_expr());
        }

        if let Some(limit) = self.limit {
            statement.limit(limit);
        }

        statement
    }

    /// SQL with values inlined, for logging
    pub fn to_debug_sql(&self) -> String {
        self.statement().to_string(PostgresQueryBuilder)
    }
}

impl QueryBuilder for SelectQuery {
    fn from_table(&self) -> &str {
        &self.table
    }

    fn join(&mut self, table: &str, left: QualifiedColumn, right: QualifiedColumn) {
        self.joins.push(Join {
            table: table.to_string(),
            left,
            right,
        });
    }

    fn where_eq(&mut self, column: QualifiedColumn, value: Value) {
        self.predicates.push(Predicate::Eq(column, value));
    }

    fn where_in(&mut self, column: QualifiedColumn, values: Vec<Value>) {
        self.predicates.push(Predicate::In(column, values));
    }

    fn where_null(&mut self, column: QualifiedColumn) {
        self.predicates.push(Predicate::Null(column));
    }

    fn where_raw_eq(&mut self, column: QualifiedColumn, expression: String) {
        self.predicates.push(Predicate::RawEq(column, expression));
    }

    fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }

    fn has_output_column(&self, name: &str) -> bool {
        self.columns.iter().any(|s| s.output_name() == Some(name))
    }

    fn select(&mut self, columns: Vec<Selection>) {
        self.columns = columns;
    }

    fn add_select(&mut self, columns: Vec<Selection>) {
        self.columns.extend(columns);
    }

    fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    fn wrap(&self, column: &QualifiedColumn) -> String {
        match &column.table {
            Some(table) => format!("{}.{}", quote_table(table), quote(&column.column)),
            None => quote(&column.column),
        }
    }

    fn build(&self) -> (String, Values) {
        self.statement().build(PostgresQueryBuilder)
    }
}
