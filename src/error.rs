//! Error type for relation construction, query building and execution.

use may_postgres::Error as PostgresError;
use std::fmt;

/// Relation error type
///
/// Configuration problems (`EmptyChain`, `InvalidForeignKey`, `InvalidAlias`)
/// surface when the relation is built, never mid-query. Execution failures
/// from the executor are passed through untouched.
#[derive(Debug)]
pub enum ThroughError {
    /// The through-chain has no intermediate models
    EmptyChain,
    /// No usable foreign key name could be derived for a table
    InvalidForeignKey {
        table: String,
    },
    /// The disambiguation alias is empty
    InvalidAlias,
    /// A selected column would shadow the disambiguation alias
    AliasCollision {
        alias: String,
    },
    /// The parent model does not expose the attribute the relation keys on
    MissingAttribute {
        attribute: String,
    },
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// A query could not be prepared, e.g. a value that cannot be bound
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other execution errors
    Other(String),
}

impl fmt::Display for ThroughError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThroughError::EmptyChain => {
                write!(f, "Configuration error: through-chain must contain at least one model")
            }
            ThroughError::InvalidForeignKey { table } => {
                write!(f, "Configuration error: cannot derive a foreign key name for table '{table}'")
            }
            ThroughError::InvalidAlias => {
                write!(f, "Configuration error: through key alias must not be empty")
            }
            ThroughError::AliasCollision { alias } => {
                write!(f, "Query error: selected column '{alias}' collides with the through key alias")
            }
            ThroughError::MissingAttribute { attribute } => {
                write!(f, "Model error: attribute '{attribute}' is not defined on the parent model")
            }
            ThroughError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            ThroughError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            ThroughError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            ThroughError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for ThroughError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ThroughError::PostgresError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PostgresError> for ThroughError {
    fn from(err: PostgresError) -> Self {
        ThroughError::PostgresError(err)
    }
}

impl ThroughError {
    /// Whether the error was raised while configuring the relation
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ThroughError::EmptyChain
                | ThroughError::InvalidForeignKey { .. }
                | ThroughError::InvalidAlias
        )
    }
}
