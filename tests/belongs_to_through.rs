//! End-to-end tests for belongs-to-through relations against a recording executor
//!
//! Test relationships:
//! - Comment belongs to Post, Post to User, User to Country
//! - Comment belongs to Country through [User, Post]

mod common;

use belongs_to_through::relation::{eager_load, no_constraints, Relation};
use belongs_to_through::{
    BelongsToThrough, EntityTrait, ModelTrait, Record, RelationConfig, SelectQuery, TableMeta,
    ThroughError,
};
use common::{join_count, RecordingExecutor};
use sea_query::Value;

// ============================================================================
// Test Entities
// ============================================================================

struct Country;

impl EntityTrait for Country {
    fn table_name(&self) -> &str {
        "countries"
    }
}

struct User;

impl EntityTrait for User {
    fn table_name(&self) -> &str {
        "users"
    }

    fn supports_soft_delete(&self) -> bool {
        true
    }
}

struct Post;

impl EntityTrait for Post {
    fn table_name(&self) -> &str {
        "posts"
    }

    fn supports_soft_delete(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Comment {
    id: i64,
    post_id: Option<i64>,
    country: Option<Record>,
}

impl Comment {
    fn new(id: i64, post_id: i64) -> Self {
        Self {
            id,
            post_id: Some(post_id),
            country: None,
        }
    }
}

impl ModelTrait for Comment {
    fn get_attribute(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::BigInt(Some(self.id))),
            "post_id" => Some(Value::BigInt(self.post_id)),
            _ => None,
        }
    }

    fn set_relation(&mut self, relation: &str, value: Option<Record>) {
        if relation == "country" {
            self.country = value;
        }
    }
}

fn comment_country(comment: &Comment) -> Result<BelongsToThrough, ThroughError> {
    BelongsToThrough::builder(&Country)
        .through(&User)
        .through(&Post)
        .build(comment)
}

fn country_row(id: i32, name: &str, through_key: i32) -> Record {
    Record::new()
        .with("id", id)
        .with("name", name)
        .with("__through_key", through_key)
}

// ============================================================================
// Single-hop scenario
// ============================================================================

#[test]
fn test_single_hop_first_and_match() {
    let related = TableMeta::new("related");
    let mid = TableMeta::new("mid");
    let parent = Record::new().with("id", 1).with("mid_id", 5);

    let relation = BelongsToThrough::builder(&related)
        .through(&mid)
        .build(&parent)
        .unwrap();
    assert_eq!(relation.first_foreign_key_name(), "mid_id");
    assert_eq!(relation.qualified_first_local_key_name().to_string(), "mid.id");

    let executor = RecordingExecutor::returning(vec![Record::new().with("id", 42)]);
    let found = relation.first(&executor, &["*"]).unwrap();
    assert_eq!(found, Some(Record::new().with("id", 42)));

    let sql = executor.last_sql();
    assert_eq!(
        sql,
        r#"SELECT "related".* FROM "related" INNER JOIN "mid" ON "mid"."related_id" = "related"."id" WHERE "mid"."id" = $1 LIMIT $2"#
    );
    assert_eq!(executor.statements()[0].1 .0[0], Value::from(5));

    // Batch: only row 42 carries alias value 5
    let executor = RecordingExecutor::returning(vec![Record::new().with("id", 42).with("__through_key", 5)]);
    let mut parents = vec![parent, Record::new().with("id", 2).with("mid_id", 6)];
    eager_load(&mut parents, "related", &executor, |p: &Record| {
        BelongsToThrough::builder(&related).through(&mid).build(p)
    })
    .unwrap();

    assert_eq!(
        parents[0].relation("related"),
        Some(Some(&Record::new().with("id", 42)))
    );
    assert_eq!(parents[1].relation("related"), Some(None));
}

// ============================================================================
// Join chain
// ============================================================================

#[test]
fn test_join_count_matches_chain_length() {
    let executor = RecordingExecutor::default();
    let relation = comment_country(&Comment::new(1, 3)).unwrap();
    relation.get(&executor, &["*"]).unwrap();

    let sql = executor.last_sql();
    assert_eq!(join_count(&sql), 2);
    assert!(sql.contains(r#"INNER JOIN "users" ON "users"."country_id" = "countries"."id""#));
    assert!(sql.contains(r#"INNER JOIN "posts" ON "posts"."user_id" = "users"."id""#));
    assert!(sql.contains(r#""posts"."id" AS "__through_key""#));
}

#[test]
fn test_lookup_override_and_prefix() {
    let parent = Record::new().with("author_post_id", 3);
    let relation = BelongsToThrough::builder(&Country)
        .through(&User)
        .through(&Post)
        .foreign_key("users", "owner_id")
        .prefix("author_")
        .build(&parent)
        .unwrap();

    let (sql, values) = relation.to_sql(&["*"]).unwrap();
    assert!(sql.contains(r#""posts"."owner_id" = "users"."id""#), "{sql}");
    assert_eq!(relation.first_foreign_key_name(), "author_post_id");
    assert_eq!(values.0, vec![Value::from(3)]);
}

#[test]
fn test_empty_chain_fails_at_construction() {
    let result = BelongsToThrough::builder(&Country).build(&Comment::new(1, 3));
    let error = result.unwrap_err();
    assert!(matches!(error, ThroughError::EmptyChain));
    assert!(error.is_configuration_error());
}

// ============================================================================
// Soft deletes
// ============================================================================

#[test]
fn test_soft_delete_filters_every_hop() {
    let executor = RecordingExecutor::default();
    let relation = comment_country(&Comment::new(1, 3)).unwrap();
    relation.get(&executor, &["*"]).unwrap();

    let sql = executor.last_sql();
    assert!(sql.contains(r#""users"."deleted_at" IS NULL"#), "{sql}");
    assert!(sql.contains(r#""posts"."deleted_at" IS NULL"#), "{sql}");
}

#[test]
fn test_with_trashed_variants() {
    let executor = RecordingExecutor::default();

    let mut relation = comment_country(&Comment::new(1, 3)).unwrap();
    relation.with_trashed(&["posts.deleted_at"]);
    relation.get(&executor, &["*"]).unwrap();
    let sql = executor.last_sql();
    assert!(sql.contains(r#""users"."deleted_at" IS NULL"#), "{sql}");
    assert!(!sql.contains(r#""posts"."deleted_at""#), "{sql}");

    relation.with_trashed(&[]).with_trashed(&[]);
    relation.get(&executor, &["*"]).unwrap();
    assert!(!executor.last_sql().contains("IS NULL"));
}

#[test]
fn test_configured_soft_delete_column() {
    let config = RelationConfig {
        deleted_at_column: "archived_at".to_string(),
        ..RelationConfig::default()
    };
    let parent = Record::new().with("user_id", 9);
    let relation = BelongsToThrough::builder(&Country)
        .through(&TableMeta::new("users").soft_deletes_configured(&config))
        .config(&config)
        .build(&parent)
        .unwrap();

    let (sql, _) = relation.to_sql(&["*"]).unwrap();
    assert!(sql.contains(r#""users"."archived_at" IS NULL"#), "{sql}");
}

#[test]
fn test_null_parent_key_binds_nothing() {
    let executor = RecordingExecutor::default();
    let orphan = Comment {
        id: 9,
        post_id: None,
        country: None,
    };
    let relation = comment_country(&orphan).unwrap();
    assert_eq!(relation.first(&executor, &["*"]).unwrap(), None);

    // Only the LIMIT is bound
    let (sql, values) = &executor.statements()[0];
    assert!(!sql.contains(r#""posts"."id" = $1"#), "{sql}");
    assert_eq!(values.0.len(), 1);
}

// ============================================================================
// Eager loading
// ============================================================================

#[test]
fn test_eager_load_issues_one_query_and_strips_alias() {
    let executor = RecordingExecutor::returning(vec![
        country_row(10, "Iceland", 3),
        country_row(11, "Chile", 4),
    ]);
    let mut comments = vec![
        Comment::new(1, 3),
        Comment::new(2, 4),
        Comment::new(3, 3),
        Comment::new(4, 8),
    ];

    eager_load(&mut comments, "country", &executor, comment_country).unwrap();

    assert_eq!(executor.query_count(), 1);
    let (sql, values) = &executor.statements()[0];
    assert!(sql.contains(r#""posts"."id" IN ($1, $2, $3)"#), "{sql}");
    assert_eq!(
        values.0,
        vec![Value::BigInt(Some(3)), Value::BigInt(Some(4)), Value::BigInt(Some(8))]
    );

    let iceland = Record::new().with("id", 10).with("name", "Iceland");
    assert_eq!(comments[0].country.as_ref(), Some(&iceland));
    assert_eq!(comments[2].country.as_ref(), Some(&iceland));
    assert_eq!(
        comments[1].country.as_ref().and_then(|c| c.get("name")),
        Some(&Value::from("Chile"))
    );
    assert_eq!(comments[3].country, None);
    assert!(comments
        .iter()
        .filter_map(|c| c.country.as_ref())
        .all(|country| !country.contains("__through_key")));
}

#[test]
fn test_eager_load_matches_across_integer_widths() {
    // Parents hold INT8 keys, the through key comes back as INT4
    let executor = RecordingExecutor::returning(vec![country_row(10, "Iceland", 3)]);
    let mut comments = vec![Comment::new(1, 3)];
    eager_load(&mut comments, "country", &executor, comment_country).unwrap();
    assert!(comments[0].country.is_some());
}

#[test]
fn test_eager_load_resets_stale_relations() {
    let executor = RecordingExecutor::default();
    let mut comments = vec![Comment::new(1, 3)];
    comments[0].country = Some(Record::new().with("id", 99));

    eager_load(&mut comments, "country", &executor, comment_country).unwrap();
    assert_eq!(comments[0].country, None);
}

#[test]
fn test_eager_load_skips_null_keys() {
    let executor = RecordingExecutor::default();
    let mut comments = vec![
        Comment::new(1, 3),
        Comment {
            id: 2,
            post_id: None,
            country: None,
        },
    ];
    eager_load(&mut comments, "country", &executor, comment_country).unwrap();

    let (sql, values) = &executor.statements()[0];
    assert!(sql.contains(r#""posts"."id" IN ($1)"#), "{sql}");
    assert_eq!(values.0.len(), 1);
}

#[test]
fn test_duplicate_through_keys_keep_last_row() {
    let executor = RecordingExecutor::returning(vec![
        country_row(10, "Iceland", 3),
        country_row(12, "Norway", 3),
    ]);
    let mut comments = vec![Comment::new(1, 3)];
    eager_load(&mut comments, "country", &executor, comment_country).unwrap();
    assert_eq!(
        comments[0].country.as_ref().and_then(|c| c.get("id")),
        Some(&Value::from(12))
    );
}

#[test]
fn test_manual_relation_lifecycle() {
    let executor = RecordingExecutor::returning(vec![country_row(10, "Iceland", 3)]);
    let mut comments = vec![Comment::new(1, 3), Comment::new(2, 5)];

    let mut relation = no_constraints(|| comment_country(&comments[0])).unwrap();
    relation.init_relation(&mut comments, "country");
    relation.add_eager_constraints(&comments).unwrap();
    let results = relation.get_eager(&executor).unwrap();
    relation.match_models(&mut comments, results, "country");

    assert!(comments[0].country.is_some());
    assert!(comments[1].country.is_none());
}

// ============================================================================
// Existence queries
// ============================================================================

#[test]
fn test_where_has_correlates_subquery() {
    let relation = comment_country(&Comment::new(1, 3)).unwrap();
    let mut comments = SelectQuery::new("comments");
    relation.where_has(&mut comments);

    let sql = comments.to_debug_sql();
    assert!(sql.starts_with(r#"SELECT * FROM "comments" WHERE EXISTS (SELECT * FROM "countries""#), "{sql}");
    assert!(sql.contains(r#""posts"."id" = "comments"."post_id""#), "{sql}");
    assert!(sql.contains(r#""users"."deleted_at" IS NULL"#), "{sql}");
}
