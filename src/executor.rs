//! Query execution for relation queries.
//!
//! Relations hand rendered SQL and bound values to a [`QueryExecutor`] and get
//! [`Record`]s back. [`MayPostgresExecutor`] runs them on a `may_postgres`
//! client; tests and other backends can supply their own executor.

use crate::config::DatabaseConfig;
use crate::error::ThroughError;
use crate::model::Record;
use crate::query::value_conversion::{column_value, with_converted_params};
use may_postgres::{Client, Row};
use sea_query::Values;
use std::time::Instant;

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Trait for executing relation queries
///
/// Execution is blocking; retries, timeouts and cancellation belong to the
/// implementation, not to the relation.
///
/// # Examples
///
/// ```
/// use belongs_to_through::{QueryExecutor, Record, ThroughError};
/// use sea_query::Values;
///
/// struct Fixed(Vec<Record>);
///
/// impl QueryExecutor for Fixed {
///     fn query_all(&self, _sql: &str, _values: &Values) -> Result<Vec<Record>, ThroughError> {
///         Ok(self.0.clone())
///     }
/// }
///
/// let executor = Fixed(vec![Record::new().with("id", 1)]);
/// let first = executor.query_opt("SELECT 1", &Values(vec![])).unwrap();
/// assert_eq!(first, Some(Record::new().with("id", 1)));
/// ```
pub trait QueryExecutor {
    /// Execute a query and return every row
    ///
    /// # Errors
    ///
    /// Returns `ThroughError` if the query execution fails.
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Record>, ThroughError>;

    /// Execute a query and return the first row, if any
    ///
    /// # Errors
    ///
    /// Returns `ThroughError` if the query execution fails.
    fn query_opt(&self, sql: &str, values: &Values) -> Result<Option<Record>, ThroughError> {
        Ok(self.query_all(sql, values)?.into_iter().next())
    }
}

impl<E: QueryExecutor + ?Sized> QueryExecutor for &E {
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Record>, ThroughError> {
        (**self).query_all(sql, values)
    }

    fn query_opt(&self, sql: &str, values: &Values) -> Result<Option<Record>, ThroughError> {
        (**self).query_opt(sql, values)
    }
}

/// Executor over a `may_postgres` client
pub struct MayPostgresExecutor {
    client: Client,
}

impl MayPostgresExecutor {
    /// Create a new executor from a `may_postgres::Client`
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Connect using a connection string
    ///
    /// Blocking; call it from within a `may` coroutine or a plain thread.
    ///
    /// # Errors
    ///
    /// Returns `ThroughError::PostgresError` if the connection fails.
    pub fn connect(url: &str) -> Result<Self, ThroughError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::connect_span().entered();

        let client = may_postgres::connect(url)?;
        Ok(Self::new(client))
    }

    /// Connect using the `[database]` configuration section
    ///
    /// # Errors
    ///
    /// Returns `ThroughError::Other` if the configuration cannot be loaded.
    pub fn connect_with_config() -> Result<Self, ThroughError> {
        let config = DatabaseConfig::load()
            .map_err(|e| ThroughError::Other(format!("Configuration error: {e}")))?;
        Self::connect(&config.url)
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Consume the executor and return the underlying client
    pub fn into_client(self) -> Client {
        self.client
    }

    fn run(&self, sql: &str, values: &Values) -> Result<Vec<Row>, ThroughError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::execute_query_span(sql).entered();

        let start = Instant::now();
        let result = with_converted_params(values, |params| {
            self.client.query(sql, params).map_err(|e| {
                #[cfg(feature = "metrics")]
                METRICS.record_query_error();
                ThroughError::PostgresError(e)
            })
        });

        let duration = start.elapsed();
        #[cfg(feature = "metrics")]
        METRICS.record_query(duration);
        log::trace!("executed relation query in {duration:?}: {sql}");

        result
    }
}

/// Decode every column of `row` into a `Record`
pub fn record_from_row(row: &Row) -> Result<Record, ThroughError> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        record.insert(column.name(), column_value(row, index)?);
    }
    Ok(record)
}

impl QueryExecutor for MayPostgresExecutor {
    fn query_all(&self, sql: &str, values: &Values) -> Result<Vec<Record>, ThroughError> {
        self.run(sql, values)?.iter().map(record_from_row).collect()
    }
}
