// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema-less struct used as the universal call payload.

use super::Value;
use serde::{Deserialize, Serialize};

/// Named, ordered collection of fields.
///
/// Equality and encoding are purely structural: two structs are equal when
/// their names match and they hold the same fields in the same order.
/// Setting a field that already exists replaces its value in place.
///
/// # Example
///
/// ```
/// use wirecall::{DynamicStruct, Value};
///
/// let mut point = DynamicStruct::new("Point");
/// point.set_field("x", 1);
/// point.set_field("y", 2);
/// point.set_field("x", 3);
///
/// assert_eq!(point.get_field("x"), Some(&Value::Int(3)));
/// assert_eq!(point.field_names().collect::<Vec<_>>(), ["x", "y"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DynamicStruct {
    name: String,
    fields: Vec<(String, Value)>,
}

impl DynamicStruct {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Wire name of the struct.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set a field; the last write for a name wins.
    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Builder form of [`set_field`](Self::set_field).
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set_field(name, value);
        self
    }

    pub fn get_field(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_field_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Remove a field, returning its value.
    pub fn remove_field(&mut self, name: &str) -> Option<Value> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Fields in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    pub fn into_fields(self) -> Vec<(String, Value)> {
        self.fields
    }
}

impl FromIterator<(String, Value)> for DynamicStruct {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut s = DynamicStruct::default();
        for (name, value) in iter {
            s.set_field(name, value);
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_write_wins_in_place() {
        let mut s = DynamicStruct::new("S");
        s.set_field("a", 1);
        s.set_field("b", 2);
        s.set_field("a", "again");

        let fields: Vec<_> = s.fields().collect();
        assert_eq!(fields, vec![("a", &Value::from("again")), ("b", &Value::Int(2))]);
    }

    #[test]
    fn test_equality_is_ordered() {
        let ab = DynamicStruct::new("S").with_field("a", 1).with_field("b", 2);
        let ba = DynamicStruct::new("S").with_field("b", 2).with_field("a", 1);
        let other = DynamicStruct::new("T").with_field("a", 1).with_field("b", 2);

        assert_eq!(ab, ab.clone());
        assert_ne!(ab, ba);
        assert_ne!(ab, other);
    }

    #[test]
    fn test_remove_field() {
        let mut s = DynamicStruct::new("S").with_field("a", 1).with_field("b", 2);
        assert_eq!(s.remove_field("a"), Some(Value::Int(1)));
        assert_eq!(s.remove_field("a"), None);
        assert_eq!(s.len(), 1);
        assert!(!s.contains_field("a"));
    }

    #[test]
    fn test_nested_struct() {
        let inner = DynamicStruct::new("Inner").with_field("v", true);
        let outer = DynamicStruct::new("Outer").with_field("inner", inner.clone());

        assert_eq!(
            outer.get_field("inner").and_then(Value::as_struct),
            Some(&inner)
        );
    }
}
