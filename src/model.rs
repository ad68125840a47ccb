//! Model trait for accessing attribute values and relation slots
//!
//! This module provides `ModelTrait`, the instance capability the relation
//! needs from parent models, and `Record`, a generic attribute-map model used
//! for query results.

use sea_query::Value;
use std::collections::BTreeMap;

/// Trait for Model-level operations
///
/// Attribute access is typed: `get_attribute` returns `None` when the model
/// has no attribute with that name, and `Some(Value::…(None))` when the
/// attribute exists but is NULL.
///
/// # Example
///
/// ```
/// use belongs_to_through::{ModelTrait, Record};
/// use sea_query::Value;
///
/// struct Order {
///     id: i32,
///     shop_id: i32,
///     shop: Option<Record>,
/// }
///
/// impl ModelTrait for Order {
///     fn get_attribute(&self, name: &str) -> Option<Value> {
///         match name {
///             "id" => Some(self.id.into()),
///             "shop_id" => Some(self.shop_id.into()),
///             _ => None,
///         }
///     }
///
///     fn set_relation(&mut self, relation: &str, value: Option<Record>) {
///         if relation == "shop" {
///             self.shop = value;
///         }
///     }
/// }
/// ```
pub trait ModelTrait {
    /// Get the value of an attribute by column name
    fn get_attribute(&self, name: &str) -> Option<Value>;

    /// Store a resolved relation under `relation`; `None` means "no related row"
    fn set_relation(&mut self, relation: &str, value: Option<Record>);
}

/// A row of column values, in select order, plus any loaded relations
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    attributes: Vec<(String, Value)>,
    relations: BTreeMap<String, Option<Record>>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute setter
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set an attribute, replacing any previous value under the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Remove an attribute and return its value
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(index).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.attributes.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Loaded relation by name
    ///
    /// The outer `Option` is `None` while the slot has never been set; the
    /// inner one is `None` when the relation resolved to no row.
    pub fn relation(&self, name: &str) -> Option<Option<&Record>> {
        self.relations.get(name).map(Option::as_ref)
    }
}

impl ModelTrait for Record {
    fn get_attribute(&self, name: &str) -> Option<Value> {
        self.get(name).cloned()
    }

    fn set_relation(&mut self, relation: &str, value: Option<Record>) {
        self.relations.insert(relation.to_string(), value);
    }
}

impl<K, V> FromIterator<(K, V)> for Record
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.insert(name, value);
        }
        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_insert_replaces_existing() {
        let mut record = Record::new().with("id", 1).with("name", "first");
        record.insert("name", "second");
        assert_eq!(record.len(), 2);
        assert_eq!(record.get("name"), Some(&Value::from("second")));
        assert_eq!(record.columns().collect::<Vec<_>>(), vec!["id", "name"]);
    }

    #[test]
    fn test_record_remove() {
        let mut record = Record::new().with("id", 1).with("__through_key", 5);
        assert_eq!(record.remove("__through_key"), Some(Value::from(5)));
        assert!(!record.contains("__through_key"));
        assert_eq!(record.remove("__through_key"), None);
    }

    #[test]
    fn test_record_get_attribute_missing_vs_null() {
        let record = Record::new().with("country_id", Value::Int(None));
        assert_eq!(record.get_attribute("country_id"), Some(Value::Int(None)));
        assert_eq!(record.get_attribute("missing"), None);
    }

    #[test]
    fn test_record_relation_slots() {
        let mut record = Record::new().with("id", 1);
        assert_eq!(record.relation("country"), None);

        record.set_relation("country", None);
        assert_eq!(record.relation("country"), Some(None));

        let country = Record::new().with("id", 42);
        record.set_relation("country", Some(country.clone()));
        assert_eq!(record.relation("country"), Some(Some(&country)));
    }

    #[test]
    fn test_record_from_iterator() {
        let record: Record = vec![("id", 1), ("user_id", 7)].into_iter().collect();
        assert_eq!(record.get("user_id"), Some(&Value::from(7)));
    }
}
