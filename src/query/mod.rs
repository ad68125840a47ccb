//! Query building for relation resolution.
//!
//! The relation never talks to sea-query directly: it drives the
//! [`QueryBuilder`] capability. [`SelectQuery`] is the default builder, which
//! keeps its joins, predicates and selections as inspectable data and renders
//! them through sea-query's `SelectStatement` for PostgreSQL.
//!
//! # Examples
//!
//! ```
//! use belongs_to_through::query::{QualifiedColumn, QueryBuilder, SelectQuery};
//!
//! let mut query = SelectQuery::new("countries");
//! query.join(
//!     "users",
//!     QualifiedColumn::new("users", "country_id"),
//!     QualifiedColumn::new("countries", "id"),
//! );
//! query.where_eq(QualifiedColumn::new("users", "id"), 7.into());
//!
//! let (sql, values) = query.build();
//! assert!(sql.contains(r#"INNER JOIN "users" ON "users"."country_id" = "countries"."id""#));
//! assert_eq!(values.0.len(), 1);
//! ```

// Builder capability and the column/selection vocabulary it speaks
pub mod builder;
#[doc(inline)]
pub use builder::{QualifiedColumn, QueryBuilder, Selection};

// SELECT query builder
pub mod select;
#[doc(inline)]
pub use select::{Join, Predicate, SelectQuery};

// Value conversion utilities
pub mod value_conversion;
#[doc(inline)]
pub use value_conversion::{is_null_value, with_converted_params};
