//! Table-level metadata for the models a relation joins through.
//!
//! Through models are only used as templates: the relation reads their table
//! name, primary key and soft-delete capability and never their data.

use crate::config::RelationConfig;

/// Metadata capability of a model type
///
/// Table name, primary key and soft-delete information the join planner needs.
///
/// # Example
///
/// ```
/// use belongs_to_through::EntityTrait;
///
/// struct Post;
///
/// impl EntityTrait for Post {
///     fn table_name(&self) -> &str { "posts" }
///     fn supports_soft_delete(&self) -> bool { true }
/// }
///
/// assert_eq!(Post.qualified_primary_key(), "posts.id");
/// assert_eq!(Post.qualified_deleted_at_column(), "posts.deleted_at");
/// ```
pub trait EntityTrait {
    /// Unqualified table name
    fn table_name(&self) -> &str;

    /// Unqualified primary key column
    fn primary_key(&self) -> &str {
        "id"
    }

    /// Whether rows of this table are soft deleted
    fn supports_soft_delete(&self) -> bool {
        false
    }

    /// Unqualified soft-delete timestamp column
    fn deleted_at_column(&self) -> &str {
        "deleted_at"
    }

    fn qualified_primary_key(&self) -> String {
        format!("{}.{}", self.table_name(), self.primary_key())
    }

    fn qualified_deleted_at_column(&self) -> String {
        format!("{}.{}", self.table_name(), self.deleted_at_column())
    }
}

/// Owned snapshot of an entity's metadata
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableMeta {
    table: String,
    primary_key: String,
    deleted_at: Option<String>,
}

impl TableMeta {
    /// Table with an `id` primary key and no soft deletes
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: "id".to_string(),
            deleted_at: None,
        }
    }

    /// Table using the naming defaults from `config`
    pub fn with_config(table: impl Into<String>, config: &RelationConfig) -> Self {
        Self {
            table: table.into(),
            primary_key: config.default_primary_key.clone(),
            deleted_at: None,
        }
    }

    /// Capture the metadata of any entity
    pub fn of<E: EntityTrait + ?Sized>(entity: &E) -> Self {
        Self {
            table: entity.table_name().to_string(),
            primary_key: entity.primary_key().to_string(),
            deleted_at: entity
                .supports_soft_delete()
                .then(|| entity.deleted_at_column().to_string()),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Mark the table as soft deleting through `deleted_at`
    pub fn soft_deletes(self) -> Self {
        self.soft_deletes_with("deleted_at")
    }

    /// Mark the table as soft deleting through the configured column
    pub fn soft_deletes_configured(self, config: &RelationConfig) -> Self {
        self.soft_deletes_with(config.deleted_at_column.clone())
    }

    /// Mark the table as soft deleting through a custom column
    pub fn soft_deletes_with(mut self, column: impl Into<String>) -> Self {
        self.deleted_at = Some(column.into());
        self
    }
}

impl EntityTrait for TableMeta {
    fn table_name(&self) -> &str {
        &self.table
    }

    fn primary_key(&self) -> &str {
        &self.primary_key
    }

    fn supports_soft_delete(&self) -> bool {
        self.deleted_at.is_some()
    }

    fn deleted_at_column(&self) -> &str {
        self.deleted_at.as_deref().unwrap_or("deleted_at")
    }
}
