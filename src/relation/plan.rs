//! Join planning for belongs-to-through relations.
//!
//! The plan walks the through-chain from the related model towards the
//! parent. Element `i` of the chain joins its predecessor (element `i - 1`,
//! or the related model for `i == 0`) through a foreign key on element `i`'s
//! table that references the predecessor's primary key:
//!
//! ```text
//! related <- chain[0] <- chain[1] <- ... <- chain[n-1] <- parent
//! ```
//!
//! All foreign key names are resolved when the plan is built, so a plan that
//! exists is always complete.

use crate::entity::{EntityTrait, TableMeta};
use crate::error::ThroughError;
use crate::query::QualifiedColumn;
use crate::relation::inflector::singular;
use std::collections::HashMap;

/// One `INNER JOIN table ON foreign_key = references`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub table: String,
    pub foreign_key: QualifiedColumn,
    pub references: QualifiedColumn,
}

/// A `deleted_at IS NULL` filter contributed by one soft-deleting through table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoftDeleteFilter {
    /// Table the filter belongs to
    pub table: String,
    pub column: QualifiedColumn,
}

/// Resolved join chain between a related model and its parent
#[derive(Debug, Clone)]
pub struct JoinPlan {
    related: TableMeta,
    chain: Vec<TableMeta>,
    prefix: String,
    foreign_key_lookup: HashMap<String, String>,
    foreign_key_suffix: String,
    /// `hop_keys[i]` is the foreign key on `chain[i]` pointing at its predecessor
    hop_keys: Vec<String>,
    first_foreign_key: String,
}

impl JoinPlan {
    /// Plan the joins for `chain`, ordered from the related model outwards
    ///
    /// # Errors
    ///
    /// `ThroughError::EmptyChain` for an empty chain and
    /// `ThroughError::InvalidForeignKey` when a table needs a foreign key name
    /// that can neither be looked up nor derived.
    pub fn new(
        related: TableMeta,
        chain: Vec<TableMeta>,
        prefix: impl Into<String>,
        foreign_key_lookup: HashMap<String, String>,
        foreign_key_suffix: impl Into<String>,
    ) -> Result<Self, ThroughError> {
        let last = chain.last().ok_or(ThroughError::EmptyChain)?;

        if let Some(table) = chain.iter().find(|model| model.table_name().is_empty()) {
            return Err(ThroughError::InvalidForeignKey {
                table: table.table_name().to_string(),
            });
        }

        let foreign_key_suffix = foreign_key_suffix.into();
        let resolve = |model: &TableMeta| {
            resolve_foreign_key(model.table_name(), &foreign_key_lookup, &foreign_key_suffix)
                .ok_or_else(|| ThroughError::InvalidForeignKey {
                    table: model.table_name().to_string(),
                })
        };

        let hop_keys = std::iter::once(&related)
            .chain(chain.iter())
            .take(chain.len())
            .map(resolve)
            .collect::<Result<Vec<_>, _>>()?;

        let prefix = prefix.into();
        let first_foreign_key = format!("{prefix}{}", resolve(last)?);

        log::debug!(
            "planned belongs-to-through {} via [{}] keyed on {first_foreign_key}",
            related.table_name(),
            chain
                .iter()
                .map(|model| model.table_name())
                .collect::<Vec<_>>()
                .join(", "),
        );

        Ok(Self {
            related,
            chain,
            prefix,
            foreign_key_lookup,
            foreign_key_suffix,
            hop_keys,
            first_foreign_key,
        })
    }

    pub fn related(&self) -> &TableMeta {
        &self.related
    }

    pub fn chain(&self) -> &[TableMeta] {
        &self.chain
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Foreign key name that points at `model`'s table
    ///
    /// An explicit lookup entry wins; otherwise the singular table name plus
    /// the configured suffix. `None` if neither yields a name.
    pub fn foreign_key_name<E: EntityTrait + ?Sized>(&self, model: &E) -> Option<String> {
        resolve_foreign_key(
            model.table_name(),
            &self.foreign_key_lookup,
            &self.foreign_key_suffix,
        )
    }

    /// Joins in chain order, starting at the related table
    pub fn joins(&self) -> Vec<JoinStep> {
        self.chain
            .iter()
            .zip(&self.hop_keys)
            .enumerate()
            .map(|(i, (model, foreign_key))| {
                let predecessor = if i > 0 { &self.chain[i - 1] } else { &self.related };
                JoinStep {
                    table: model.table_name().to_string(),
                    foreign_key: QualifiedColumn::new(model.table_name(), foreign_key.as_str()),
                    references: QualifiedColumn::new(
                        predecessor.table_name(),
                        predecessor.primary_key(),
                    ),
                }
            })
            .collect()
    }

    /// Soft-delete filters for the related model and every through model that soft deletes
    pub fn soft_delete_filters(&self) -> Vec<SoftDeleteFilter> {
        std::iter::once(&self.related)
            .chain(self.chain.iter())
            .filter(|model| model.supports_soft_delete())
            .map(|model| SoftDeleteFilter {
                table: model.table_name().to_string(),
                column: QualifiedColumn::new(model.table_name(), model.deleted_at_column()),
            })
            .collect()
    }

    /// Attribute on the parent holding the key of the last through model
    pub fn first_foreign_key_name(&self) -> &str {
        &self.first_foreign_key
    }

    /// Primary key of the last through model, qualified by its table
    pub fn qualified_first_local_key(&self) -> QualifiedColumn {
        let last = &self.chain[self.chain.len() - 1];
        QualifiedColumn::new(last.table_name(), last.primary_key())
    }
}

fn resolve_foreign_key(
    table: &str,
    lookup: &HashMap<String, String>,
    suffix: &str,
) -> Option<String> {
    if let Some(key) = lookup.get(table) {
        return (!key.is_empty()).then(|| key.clone());
    }
    // Schema-qualified tables key on the bare table name
    let bare = table.rsplit('.').next().unwrap_or(table);
    let stem = singular(bare);
    (!stem.is_empty()).then(|| format!("{stem}{suffix}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(chain: Vec<TableMeta>) -> JoinPlan {
        JoinPlan::new(TableMeta::new("countries"), chain, "", HashMap::new(), "_id").unwrap()
    }

    #[test]
    fn test_single_hop_joins_related_model() {
        let plan = plan(vec![TableMeta::new("users")]);
        assert_eq!(
            plan.joins(),
            vec![JoinStep {
                table: "users".into(),
                foreign_key: QualifiedColumn::new("users", "country_id"),
                references: QualifiedColumn::new("countries", "id"),
            }]
        );
        assert_eq!(plan.first_foreign_key_name(), "user_id");
        assert_eq!(plan.qualified_first_local_key(), QualifiedColumn::new("users", "id"));
    }

    #[test]
    fn test_join_count_and_order_follow_chain() {
        for length in 1..=5 {
            let chain: Vec<TableMeta> = (0..length)
                .map(|i| TableMeta::new(format!("hops{i}s")))
                .collect();
            let plan = plan(chain);
            let joins = plan.joins();
            assert_eq!(joins.len(), length);
            for (i, step) in joins.iter().enumerate() {
                assert_eq!(step.table, format!("hops{i}s"));
                let predecessor = if i == 0 { "countries".to_string() } else { format!("hops{}s", i - 1) };
                assert_eq!(step.references.table.as_deref(), Some(predecessor.as_str()));
            }
        }
    }

    #[test]
    fn test_multi_hop_keys() {
        let plan = plan(vec![TableMeta::new("users"), TableMeta::new("posts")]);
        let joins = plan.joins();
        assert_eq!(joins[1].foreign_key, QualifiedColumn::new("posts", "user_id"));
        assert_eq!(joins[1].references, QualifiedColumn::new("users", "id"));
        assert_eq!(plan.first_foreign_key_name(), "post_id");
        assert_eq!(plan.qualified_first_local_key(), QualifiedColumn::new("posts", "id"));
    }

    #[test]
    fn test_foreign_key_lookup_overrides_convention() {
        let mut lookup = HashMap::new();
        lookup.insert("posts".to_string(), "custom_post_fk".to_string());
        let plan = JoinPlan::new(
            TableMeta::new("countries"),
            vec![TableMeta::new("users"), TableMeta::new("posts")],
            "",
            lookup,
            "_id",
        )
        .unwrap();

        assert_eq!(plan.foreign_key_name(&TableMeta::new("posts")).as_deref(), Some("custom_post_fk"));
        assert_eq!(plan.foreign_key_name(&TableMeta::new("users")).as_deref(), Some("user_id"));
        assert_eq!(plan.first_foreign_key_name(), "custom_post_fk");
    }

    #[test]
    fn test_prefix_applies_to_first_foreign_key_only() {
        let plan = JoinPlan::new(
            TableMeta::new("countries"),
            vec![TableMeta::new("users")],
            "author_",
            HashMap::new(),
            "_id",
        )
        .unwrap();
        assert_eq!(plan.first_foreign_key_name(), "author_user_id");
        assert_eq!(plan.joins()[0].foreign_key, QualifiedColumn::new("users", "country_id"));
    }

    #[test]
    fn test_custom_primary_keys() {
        let plan = JoinPlan::new(
            TableMeta::new("countries").primary_key("code"),
            vec![TableMeta::new("users").primary_key("uuid")],
            "",
            HashMap::new(),
            "_id",
        )
        .unwrap();
        assert_eq!(plan.joins()[0].references, QualifiedColumn::new("countries", "code"));
        assert_eq!(plan.qualified_first_local_key(), QualifiedColumn::new("users", "uuid"));
    }

    #[test]
    fn test_soft_delete_filters() {
        let plan = plan(vec![
            TableMeta::new("users").soft_deletes(),
            TableMeta::new("posts"),
            TableMeta::new("comments").soft_deletes_with("removed_at"),
        ]);
        let filters = plan.soft_delete_filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].column, QualifiedColumn::new("users", "deleted_at"));
        assert_eq!(filters[1].table, "comments");
        assert_eq!(filters[1].column, QualifiedColumn::new("comments", "removed_at"));
    }

    #[test]
    fn test_related_soft_delete_filter_comes_first() {
        let plan = JoinPlan::new(
            TableMeta::new("countries").soft_deletes(),
            vec![TableMeta::new("users").soft_deletes()],
            "",
            HashMap::new(),
            "_id",
        )
        .unwrap();
        let filters = plan.soft_delete_filters();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].column, QualifiedColumn::new("countries", "deleted_at"));
        assert_eq!(filters[1].table, "users");
    }

    #[test]
    fn test_empty_chain_is_rejected() {
        let result = JoinPlan::new(TableMeta::new("countries"), vec![], "", HashMap::new(), "_id");
        assert!(matches!(result, Err(ThroughError::EmptyChain)));
    }

    #[test]
    fn test_unresolvable_foreign_key_is_rejected() {
        let result = JoinPlan::new(
            TableMeta::new(""),
            vec![TableMeta::new("users")],
            "",
            HashMap::new(),
            "_id",
        );
        assert!(matches!(result, Err(ThroughError::InvalidForeignKey { table }) if table.is_empty()));

        let mut lookup = HashMap::new();
        lookup.insert("users".to_string(), String::new());
        let result = JoinPlan::new(
            TableMeta::new("countries"),
            vec![TableMeta::new("users")],
            "",
            lookup,
            "_id",
        );
        assert!(matches!(result, Err(ThroughError::InvalidForeignKey { table }) if table == "users"));
    }

    #[test]
    fn test_schema_qualified_table_keys_on_bare_name() {
        let plan = JoinPlan::new(
            TableMeta::new("geo.countries"),
            vec![TableMeta::new("users")],
            "",
            HashMap::new(),
            "_id",
        )
        .unwrap();
        assert_eq!(plan.joins()[0].foreign_key, QualifiedColumn::new("users", "country_id"));
    }
}
