//! Eager loading for belongs-to-through relations.
//!
//! Loads the related model for a whole batch of parents with one query
//! instead of one query per parent:
//!
//! 1. Build the relation with parent constraints suspended
//! 2. Reset the relation slot on every parent
//! 3. Constrain the query to the distinct foreign keys of the batch
//! 4. Run the query once
//! 5. Hand each parent its row, keyed by the through key alias
//!
//! # Example
//!
//! ```no_run
//! use belongs_to_through::relation::eager_load;
//! use belongs_to_through::{BelongsToThrough, MayPostgresExecutor, Record, TableMeta};
//!
//! # fn main() -> Result<(), belongs_to_through::ThroughError> {
//! let executor = MayPostgresExecutor::connect("postgresql://localhost/blog")?;
//! let mut comments: Vec<Record> = vec![];
//!
//! eager_load(&mut comments, "country", &executor, |comment: &Record| {
//!     BelongsToThrough::builder(&TableMeta::new("countries"))
//!         .through(&TableMeta::new("users"))
//!         .through(&TableMeta::new("posts"))
//!         .build(comment)
//! })?;
//! # Ok(())
//! # }
//! ```

use crate::error::ThroughError;
use crate::executor::QueryExecutor;
use crate::model::{ModelTrait, Record};
use crate::relation::{no_constraints, Relation};

#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Load `relation_name` for every model in `models` with a single query
///
/// `build` constructs the relation from a representative parent (the first
/// model); it runs with constraints suspended, so the parent only supplies
/// type-level information. An empty batch issues no query.
///
/// # Errors
///
/// Errors from `build`, a model missing the foreign key attribute, or the
/// executor. On error the parents' relation slots may already be reset.
pub fn eager_load<M, R, E, F>(
    models: &mut [M],
    relation_name: &str,
    executor: &E,
    build: F,
) -> Result<(), ThroughError>
where
    M: ModelTrait,
    R: Relation,
    E: QueryExecutor,
    F: FnOnce(&M) -> Result<R, ThroughError>,
{
    let Some(first) = models.first() else {
        return Ok(());
    };

    #[cfg(feature = "tracing")]
    let _span = tracing_helpers::eager_load_span(relation_name, models.len()).entered();

    let mut relation = no_constraints(|| build(first))?;

    relation.init_relation(models, relation_name);
    relation.add_eager_constraints(models)?;

    let results: Vec<Record> = relation.get_eager(executor)?;
    log::debug!(
        "eager loaded {} rows of {relation_name} for {} parents",
        results.len(),
        models.len()
    );

    #[cfg(feature = "metrics")]
    METRICS.record_eager_batch(models.len());

    relation.match_models(models, results, relation_name);
    Ok(())
}
