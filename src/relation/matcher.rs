//! Redistribution of eagerly loaded rows to their parent models.
//!
//! An eager load returns one flat batch of related rows for many parents.
//! Each row carries the through key alias (the primary key of the through
//! model adjacent to the parent), which is what ties it back to a parent.

use crate::model::{ModelTrait, Record};
use crate::query::is_null_value;
use sea_query::Value;
use std::collections::HashMap;

/// Hashable form of a key value
///
/// Integers of every width compare equal, so a parent's `INT8` foreign key
/// still finds an `INT4` through key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DictionaryKey {
    Int(i128),
    Text(String),
    Bool(bool),
    Bytes(Vec<u8>),
    Other(String),
}

impl DictionaryKey {
    /// Key for `value`; `None` for NULL
    pub fn from_value(value: &Value) -> Option<Self> {
        if is_null_value(value) {
            return None;
        }
        let key = match value {
            Value::TinyInt(Some(i)) => DictionaryKey::Int(i128::from(*i)),
            Value::SmallInt(Some(i)) => DictionaryKey::Int(i128::from(*i)),
            Value::Int(Some(i)) => DictionaryKey::Int(i128::from(*i)),
            Value::BigInt(Some(i)) => DictionaryKey::Int(i128::from(*i)),
            Value::TinyUnsigned(Some(u)) => DictionaryKey::Int(i128::from(*u)),
            Value::SmallUnsigned(Some(u)) => DictionaryKey::Int(i128::from(*u)),
            Value::Unsigned(Some(u)) => DictionaryKey::Int(i128::from(*u)),
            Value::BigUnsigned(Some(u)) => DictionaryKey::Int(i128::from(*u)),
            Value::String(Some(s)) => DictionaryKey::Text(s.to_string()),
            Value::Char(Some(c)) => DictionaryKey::Text(c.to_string()),
            Value::Bool(Some(b)) => DictionaryKey::Bool(*b),
            Value::Bytes(Some(b)) => DictionaryKey::Bytes(b.to_vec()),
            other => DictionaryKey::Other(format!("{other:?}")),
        };
        Some(key)
    }
}

/// Index `results` by their `alias` column, stripping the alias from each row
///
/// Rows without a usable alias value are dropped. When two rows share an
/// alias value the later one wins; belongs-to cardinality makes this
/// unexpected, but it is not treated as an error.
pub fn build_dictionary(results: Vec<Record>, alias: &str) -> HashMap<DictionaryKey, Record> {
    let mut dictionary = HashMap::with_capacity(results.len());

    for mut result in results {
        let Some(key) = result
            .remove(alias)
            .and_then(|value| DictionaryKey::from_value(&value))
        else {
            continue;
        };
        if dictionary.insert(key, result).is_some() {
            log::debug!("duplicate through key in eager results, keeping the last row");
        }
    }

    dictionary
}

/// Set `relation` to `None` on every model
pub fn init_relation<M: ModelTrait>(models: &mut [M], relation: &str) {
    for model in models.iter_mut() {
        model.set_relation(relation, None);
    }
}

/// Attach each parent's row from `results` under `relation`
///
/// Parents are keyed by their `foreign_key` attribute. Parents without a
/// matching row keep whatever `init_relation` set.
pub fn match_models<M: ModelTrait>(
    models: &mut [M],
    results: Vec<Record>,
    relation: &str,
    alias: &str,
    foreign_key: &str,
) {
    let dictionary = build_dictionary(results, alias);

    for model in models.iter_mut() {
        let matched = model
            .get_attribute(foreign_key)
            .and_then(|value| DictionaryKey::from_value(&value))
            .and_then(|key| dictionary.get(&key));

        if let Some(related) = matched {
            model.set_relation(relation, Some(related.clone()));
        }
    }
}
