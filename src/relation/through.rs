//! The belongs-to-through relation.
//!
//! A parent model reaches its related model through a chain of intermediate
//! tables. Given `comments.post_id -> posts`, `posts.user_id -> users` and
//! `users.country_id -> countries`, a comment's country is:
//!
//! ```text
//! SELECT "countries".*
//! FROM "countries"
//! INNER JOIN "users" ON "users"."country_id" = "countries"."id"
//! INNER JOIN "posts" ON "posts"."user_id" = "users"."id"
//! WHERE "posts"."id" = $1          -- the comment's post_id
//! ```
//!
//! For eager loading, the key of the through table next to the parent
//! (`posts.id` above) is selected under a reserved alias so every result row
//! can be traced back to the parents that asked for it.

use crate::config::RelationConfig;
use crate::entity::{EntityTrait, TableMeta};
use crate::error::ThroughError;
use crate::executor::QueryExecutor;
use crate::model::{ModelTrait, Record};
use crate::query::{is_null_value, QualifiedColumn, QueryBuilder, SelectQuery, Selection};
use crate::relation::matcher::{self, DictionaryKey};
use crate::relation::plan::{JoinPlan, SoftDeleteFilter};
use crate::relation::{constraints_enabled, Relation};
use sea_query::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Which soft-delete filters are currently lifted
#[derive(Debug, Clone, PartialEq, Eq)]
enum Trashed {
    /// Filters on these qualified columns are lifted; all others apply
    Without(BTreeSet<String>),
    /// Every filter is lifted
    All,
}

impl Trashed {
    fn filters(&self, filter: &SoftDeleteFilter) -> bool {
        match self {
            Trashed::Without(lifted) => !lifted.contains(&filter.column.to_string()),
            Trashed::All => false,
        }
    }
}

/// Builder for [`BelongsToThrough`]
///
/// # Example
///
/// ```
/// use belongs_to_through::{BelongsToThrough, Record, TableMeta};
///
/// let comment = Record::new().with("id", 10).with("post_id", 3);
///
/// let relation = BelongsToThrough::builder(&TableMeta::new("countries"))
///     .through(&TableMeta::new("users"))
///     .through(&TableMeta::new("posts").soft_deletes())
///     .build(&comment)
///     .unwrap();
///
/// assert_eq!(relation.first_foreign_key_name(), "post_id");
/// let (sql, _) = relation.to_sql(&["*"]).unwrap();
/// assert!(sql.contains(r#""posts"."deleted_at" IS NULL"#));
/// ```
#[derive(Debug, Clone)]
pub struct RelationBuilder {
    related: TableMeta,
    chain: Vec<TableMeta>,
    prefix: String,
    foreign_key_lookup: HashMap<String, String>,
    config: RelationConfig,
}

impl RelationBuilder {
    /// Append the next through model, moving from the related model towards the parent
    pub fn through<E: EntityTrait + ?Sized>(mut self, model: &E) -> Self {
        self.chain.push(TableMeta::of(model));
        self
    }

    /// Prefix for the parent's foreign key attribute
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Use `column` as the foreign key that points at `table`
    pub fn foreign_key(mut self, table: impl Into<String>, column: impl Into<String>) -> Self {
        self.foreign_key_lookup.insert(table.into(), column.into());
        self
    }

    /// Take the through key alias and foreign key suffix from `config`
    ///
    /// Table-level defaults (`default_primary_key`, `deleted_at_column`) are
    /// part of each table's metadata; apply them with
    /// [`TableMeta::with_config`] and [`TableMeta::soft_deletes_configured`].
    pub fn config(mut self, config: &RelationConfig) -> Self {
        self.config = config.clone();
        self
    }

    /// Build the relation for `parent` over a fresh [`SelectQuery`] on the related table
    ///
    /// # Errors
    ///
    /// Configuration errors from planning, or `ThroughError::MissingAttribute`
    /// when constraints are enabled and `parent` lacks the foreign key.
    pub fn build<P: ModelTrait>(self, parent: &P) -> Result<BelongsToThrough, ThroughError> {
        let query = SelectQuery::new(self.related.table_name());
        self.build_with_query(query, parent)
    }

    /// Build the relation for `parent` over a caller-supplied query builder
    ///
    /// # Errors
    ///
    /// See [`RelationBuilder::build`].
    pub fn build_with_query<Q: QueryBuilder, P: ModelTrait>(
        self,
        query: Q,
        parent: &P,
    ) -> Result<BelongsToThrough<Q>, ThroughError> {
        if self.config.through_key_alias.is_empty() {
            return Err(ThroughError::InvalidAlias);
        }
        let plan = JoinPlan::new(
            self.related,
            self.chain,
            self.prefix,
            self.foreign_key_lookup,
            self.config.foreign_key_suffix.as_str(),
        )?;

        let mut relation = BelongsToThrough {
            query,
            plan,
            alias: self.config.through_key_alias,
            trashed: Trashed::Without(BTreeSet::new()),
            joined: false,
        };
        relation.add_constraints(parent)?;
        Ok(relation)
    }
}

/// A relation resolving at most one related model through a chain of tables
#[derive(Debug, Clone)]
pub struct BelongsToThrough<Q = SelectQuery> {
    query: Q,
    plan: JoinPlan,
    alias: String,
    trashed: Trashed,
    joined: bool,
}

impl BelongsToThrough {
    /// Start building a relation to `related`
    pub fn builder<E: EntityTrait + ?Sized>(related: &E) -> RelationBuilder {
        RelationBuilder {
            related: TableMeta::of(related),
            chain: Vec::new(),
            prefix: String::new(),
            foreign_key_lookup: HashMap::new(),
            config: RelationConfig::default(),
        }
    }
}

impl<Q: QueryBuilder> BelongsToThrough<Q> {
    pub fn plan(&self) -> &JoinPlan {
        &self.plan
    }

    /// The relation's own query state, without soft-delete filters applied
    pub fn query(&self) -> &Q {
        &self.query
    }

    /// Mutable access for adding caller constraints
    pub fn query_mut(&mut self) -> &mut Q {
        &mut self.query
    }

    /// Column alias carrying the through key in eager results
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn first_foreign_key_name(&self) -> &str {
        self.plan.first_foreign_key_name()
    }

    pub fn qualified_first_local_key_name(&self) -> QualifiedColumn {
        self.plan.qualified_first_local_key()
    }

    /// Join the chain onto the relation's query, once per relation
    fn perform_joins(&mut self) {
        if self.joined {
            return;
        }
        join_chain(&self.plan, &mut self.query);
        self.joined = true;
    }

    fn apply_soft_deletes<B: QueryBuilder>(&self, query: &mut B) {
        for filter in self.active_soft_delete_filters() {
            query.where_null(filter.column);
        }
    }

    /// Soft-delete filters that still apply after `with_trashed`
    pub fn active_soft_delete_filters(&self) -> Vec<SoftDeleteFilter> {
        self.plan
            .soft_delete_filters()
            .into_iter()
            .filter(|filter| self.trashed.filters(filter))
            .collect()
    }

    /// Include soft-deleted related and through rows
    ///
    /// With no columns every soft-delete filter (the related table's and the
    /// chain's) is lifted for all later queries on this relation. With qualified column names
    /// (`"users.deleted_at"`) only those filters are lifted. Unknown columns
    /// and repeated calls are no-ops.
    pub fn with_trashed(&mut self, columns: &[&str]) -> &mut Self {
        if columns.is_empty() {
            self.trashed = Trashed::All;
            return self;
        }
        if let Trashed::Without(lifted) = &mut self.trashed {
            let known: HashSet<String> = self
                .plan
                .soft_delete_filters()
                .into_iter()
                .map(|filter| filter.column.to_string())
                .collect();
            lifted.extend(
                columns
                    .iter()
                    .map(|column| column.trim().to_string())
                    .filter(|column| known.contains(column)),
            );
        }
        self
    }

    /// The relation's query with soft-delete filters applied
    pub fn to_query(&self) -> Q {
        let mut query = self.query.clone();
        if self.joined {
            self.apply_soft_deletes(&mut query);
        }
        query
    }

    /// Select list for `get`: the caller's columns unless one is already set,
    /// plus the through key alias
    fn eager_selections(&self, query: &Q, columns: &[&str]) -> Result<Vec<Selection>, ThroughError> {
        let mut selections = if query.has_columns() {
            Vec::new()
        } else {
            self.default_selections(columns)
        };

        if query.has_output_column(&self.alias)
            || selections.iter().any(|s| s.output_name() == Some(self.alias.as_str()))
        {
            return Err(ThroughError::AliasCollision {
                alias: self.alias.clone(),
            });
        }

        selections.push(Selection::Aliased {
            column: self.plan.qualified_first_local_key(),
            alias: self.alias.clone(),
        });
        Ok(selections)
    }

    /// `["*"]` means every column of the related table, not of the joined tables
    fn default_selections(&self, columns: &[&str]) -> Vec<Selection> {
        if columns == ["*"] {
            return vec![Selection::AllOf(self.plan.related().table_name().to_string())];
        }
        columns.iter().map(|column| Selection::parse(column)).collect()
    }

    /// Rendered SQL and values of the query `get` would run
    ///
    /// # Errors
    ///
    /// `ThroughError::AliasCollision` if a selected column shadows the alias.
    pub fn to_sql(&self, columns: &[&str]) -> Result<(String, sea_query::Values), ThroughError> {
        let mut query = self.to_query();
        let selections = self.eager_selections(&query, columns)?;
        query.add_select(selections);
        Ok(query.build())
    }

    /// Execute the relation query and return the flat result batch
    ///
    /// Every row carries the through key under [`alias`](Self::alias).
    ///
    /// # Errors
    ///
    /// `ThroughError::AliasCollision` for a shadowing column, or whatever the
    /// executor returns.
    pub fn get<E: QueryExecutor>(
        &self,
        executor: &E,
        columns: &[&str],
    ) -> Result<Vec<Record>, ThroughError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::relation_query_span(self.plan.related().table_name(), "get")
            .entered();

        let (sql, values) = self.to_sql(columns)?;
        log::trace!("belongs-to-through get: {sql}");
        executor.query_all(&sql, &values)
    }

    /// Execute the relation query for a single row
    ///
    /// # Errors
    ///
    /// Whatever the executor returns.
    pub fn first<E: QueryExecutor>(
        &self,
        executor: &E,
        columns: &[&str],
    ) -> Result<Option<Record>, ThroughError> {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::relation_query_span(self.plan.related().table_name(), "first")
            .entered();

        let mut query = self.to_query();
        if !query.has_columns() {
            query.select(self.default_selections(columns));
        }
        query.limit(1);

        let (sql, values) = query.build();
        log::trace!("belongs-to-through first: {sql}");
        executor.query_opt(&sql, &values)
    }

    /// Constrain `subquery` to rows related to the rows of `parent_query`
    ///
    /// The chain is joined onto the subquery and its first local key is
    /// compared with the parent query's foreign key column as a raw
    /// reference, so the subquery correlates with the outer query.
    pub fn relation_existence_query<S: QueryBuilder, P: QueryBuilder>(
        &self,
        mut subquery: S,
        parent_query: &P,
        columns: &[&str],
    ) -> S {
        join_chain(&self.plan, &mut subquery);
        self.apply_soft_deletes(&mut subquery);

        subquery.select(columns.iter().map(|column| Selection::parse(column)).collect());

        let foreign_key =
            QualifiedColumn::new(parent_query.from_table(), self.plan.first_foreign_key_name());
        let expression = subquery.wrap(&foreign_key);
        subquery.where_raw_eq(self.plan.qualified_first_local_key(), expression);
        subquery
    }

    /// Keep only rows of `parent_query` that have a related model
    pub fn where_has(&self, parent_query: &mut SelectQuery) {
        let subquery = SelectQuery::new(self.plan.related().table_name());
        let subquery = self.relation_existence_query(subquery, &*parent_query, &["*"]);
        parent_query.where_exists(subquery);
    }
}

fn join_chain<B: QueryBuilder>(plan: &JoinPlan, query: &mut B) {
    for step in plan.joins() {
        query.join(&step.table, step.foreign_key, step.references);
    }
}

impl<Q: QueryBuilder> Relation for BelongsToThrough<Q> {
    fn add_constraints<P: ModelTrait>(&mut self, parent: &P) -> Result<(), ThroughError> {
        self.perform_joins();

        if constraints_enabled() {
            let name = self.plan.first_foreign_key_name();
            let value = parent
                .get_attribute(name)
                .ok_or_else(|| ThroughError::MissingAttribute {
                    attribute: name.to_string(),
                })?;
            let key = self.plan.qualified_first_local_key();
            if is_null_value(&value) {
                // A NULL key matches nothing; an empty IN renders as always false
                self.query.where_in(key, Vec::new());
            } else {
                self.query.where_eq(key, value);
            }
        }
        Ok(())
    }

    fn add_eager_constraints<M: ModelTrait>(&mut self, models: &[M]) -> Result<(), ThroughError> {
        self.perform_joins();

        let name = self.plan.first_foreign_key_name();
        let mut seen = HashSet::new();
        let mut keys: Vec<Value> = Vec::new();
        for model in models {
            let value = model
                .get_attribute(name)
                .ok_or_else(|| ThroughError::MissingAttribute {
                    attribute: name.to_string(),
                })?;
            if let Some(key) = DictionaryKey::from_value(&value) {
                if seen.insert(key) {
                    keys.push(value);
                }
            }
        }

        self.query
            .where_in(self.plan.qualified_first_local_key(), keys);
        Ok(())
    }

    fn init_relation<M: ModelTrait>(&self, models: &mut [M], relation: &str) {
        matcher::init_relation(models, relation);
    }

    fn match_models<M: ModelTrait>(&self, models: &mut [M], results: Vec<Record>, relation: &str) {
        matcher::match_models(
            models,
            results,
            relation,
            &self.alias,
            self.plan.first_foreign_key_name(),
        );
    }

    fn get_eager<E: QueryExecutor>(&self, executor: &E) -> Result<Vec<Record>, ThroughError> {
        self.get(executor, &["*"])
    }

    fn get_results<E: QueryExecutor>(&self, executor: &E) -> Result<Option<Record>, ThroughError> {
        self.first(executor, &["*"])
    }
}
