//! Relation module for belongs-to-through relationships.
//!
//! A model belongs to a related model through one or more intermediate
//! tables, e.g. Comment -> Post -> User -> Country.
//!
//! # Architecture
//!
//! - **Plan**: resolves the join chain and key names (`JoinPlan`)
//! - **Through**: the relation query itself (`BelongsToThrough`)
//! - **Matcher**: redistributes eager results onto parent models
//! - **Eager**: one-query eager loading over a batch of parents
//! - **Inflector**: singularization for conventional foreign key names

pub mod inflector;

pub mod plan;
#[doc(inline)]
pub use plan::{JoinPlan, JoinStep, SoftDeleteFilter};

pub mod matcher;
#[doc(inline)]
pub use matcher::DictionaryKey;

pub mod through;
#[doc(inline)]
pub use through::{BelongsToThrough, RelationBuilder};

pub mod eager;
#[doc(inline)]
pub use eager::eager_load;

use crate::error::ThroughError;
use crate::executor::QueryExecutor;
use crate::model::{ModelTrait, Record};
use std::cell::Cell;

/// Capabilities every relation offers to the loading machinery
pub trait Relation {
    /// Join the chain and, unless constraints are suspended, key the query on `parent`
    ///
    /// # Errors
    ///
    /// `ThroughError::MissingAttribute` if `parent` lacks the foreign key.
    fn add_constraints<P: ModelTrait>(&mut self, parent: &P) -> Result<(), ThroughError>;

    /// Key the query on the distinct foreign keys of `models`
    ///
    /// # Errors
    ///
    /// `ThroughError::MissingAttribute` if a model lacks the foreign key.
    fn add_eager_constraints<M: ModelTrait>(&mut self, models: &[M]) -> Result<(), ThroughError>;

    /// Set the relation slot of every model to `None`
    fn init_relation<M: ModelTrait>(&self, models: &mut [M], relation: &str);

    /// Attach each model's related row from `results`
    fn match_models<M: ModelTrait>(&self, models: &mut [M], results: Vec<Record>, relation: &str);

    /// Execute the eager query
    ///
    /// # Errors
    ///
    /// Whatever the executor returns.
    fn get_eager<E: QueryExecutor>(&self, executor: &E) -> Result<Vec<Record>, ThroughError>;

    /// Execute the relation for its single parent
    ///
    /// # Errors
    ///
    /// Whatever the executor returns.
    fn get_results<E: QueryExecutor>(&self, executor: &E) -> Result<Option<Record>, ThroughError>;
}

thread_local! {
    static CONSTRAINTS: Cell<bool> = const { Cell::new(true) };
}

/// Whether relations built on this thread key themselves on their parent
pub fn constraints_enabled() -> bool {
    CONSTRAINTS.with(Cell::get)
}

struct RestoreConstraints(bool);

impl Drop for RestoreConstraints {
    fn drop(&mut self) {
        CONSTRAINTS.with(|flag| flag.set(self.0));
    }
}

/// Run `f` with parent constraints suspended on this thread
///
/// Relations built inside `f` join their chain but skip the per-parent key
/// predicate, which eager loading replaces with its own `IN` list. The
/// previous mode is restored when `f` returns or unwinds, so calls nest.
///
/// ```
/// use belongs_to_through::relation::{constraints_enabled, no_constraints};
///
/// assert!(constraints_enabled());
/// let inner = no_constraints(|| {
///     no_constraints(constraints_enabled)
/// });
/// assert!(!inner);
/// assert!(constraints_enabled());
/// ```
pub fn no_constraints<T>(f: impl FnOnce() -> T) -> T {
    let previous = CONSTRAINTS.with(|flag| flag.replace(false));
    let _restore = RestoreConstraints(previous);
    f()
}
