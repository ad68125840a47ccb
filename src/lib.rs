//! # belongs-to-through
//!
//! Resolves a model's "belongs to" relation through a chain of intermediate
//! tables: a comment belongs to a country through its post and the post's
//! author. Relation queries are built with `sea-query` and executed on
//! `may_postgres`.
//!
//! ```
//! use belongs_to_through::{BelongsToThrough, Record, TableMeta};
//!
//! let comment = Record::new().with("id", 1).with("post_id", 7);
//! let relation = BelongsToThrough::builder(&TableMeta::new("countries"))
//!     .through(&TableMeta::new("users"))
//!     .through(&TableMeta::new("posts"))
//!     .build(&comment)?;
//!
//! let (sql, _) = relation.to_sql(&["*"])?;
//! assert!(sql.contains(r#"INNER JOIN "posts" ON "posts"."user_id" = "users"."id""#));
//! # Ok::<(), belongs_to_through::ThroughError>(())
//! ```

pub mod config;
pub mod entity;
pub mod error;
pub mod executor;
pub mod metrics;
pub mod model;
pub mod query;
pub mod relation;

pub use config::{DatabaseConfig, RelationConfig};
pub use entity::{EntityTrait, TableMeta};
pub use error::ThroughError;
pub use executor::{MayPostgresExecutor, QueryExecutor};
pub use model::{ModelTrait, Record};
pub use query::{QualifiedColumn, QueryBuilder, SelectQuery, Selection};
pub use relation::{eager_load, BelongsToThrough, Relation, RelationBuilder};
