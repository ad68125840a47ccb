//! Shared fixtures for the integration tests

#![allow(dead_code)]

use belongs_to_through::{QueryExecutor, Record, ThroughError};
use sea_query::Values;
use std::cell::RefCell;

/// Executor that records every statement and answers with canned rows
#[derive(Default)]
pub struct RecordingExecutor {
    rows: Vec<Record>,
    statements: RefCell<Vec<(String, Values)>>,
}

impl RecordingExecutor {
    pub fn returning(rows: Vec<Record>) -> Self {
        Self {
            rows,
            statements: RefCell::new(Vec::new()),
        }
    }

    pub fn statements(&self) -> Vec<(String, Values)> {
        self.statements.borrow().clone()
    }

    pub fn query_count(&self) -> usize {
        self.statements.borrow().len()
    }

    pub fn last_sql(&self) -> String {
        self.statements
            .borrow()
            .last()
            .map(|(sql, _)| sql.clone())
            .unwrap_or_default()
    }
}

impl QueryExecutor for RecordingExecutor {
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Record>, ThroughError> {
        self.statements
            .borrow_mut()
            .push((sql.to_string(), values.clone()));
        Ok(self.rows.clone())
    }
}

/// Number of `INNER JOIN`s in `sql`
pub fn join_count(sql: &str) -> usize {
    sql.matches("INNER JOIN").count()
}
