//! Query descriptors for run-time entity selection.
//!
//! A [`QueryDescriptor`] names component types by their string names, so it
//! can be built from data (editor filters, scripts, documents) as well as
//! from Rust types. A registry executes it as an inner join over the `with`
//! types, minus any entity holding one of the `without` types.

use serde::{Deserialize, Serialize};

use crate::component::Component;

/// Declarative entity selection by component shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Component types an entity must have, all of them.
    pub with: Vec<String>,
    /// Component types an entity must not have, any of them.
    pub without: Vec<String>,
}

impl QueryDescriptor {
    /// Create an empty query descriptor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require the component type registered as `type_name`.
    #[must_use]
    pub fn with_name(mut self, type_name: impl Into<String>) -> Self {
        self.with.push(type_name.into());
        self
    }

    /// Exclude entities holding the component type registered as `type_name`.
    #[must_use]
    pub fn without_name(mut self, type_name: impl Into<String>) -> Self {
        self.without.push(type_name.into());
        self
    }

    /// Require component type `T`.
    #[must_use]
    pub fn with<T: Component>(self) -> Self {
        self.with_name(T::type_name())
    }

    /// Exclude entities holding component type `T`.
    #[must_use]
    pub fn without<T: Component>(self) -> Self {
        self.without_name(T::type_name())
    }

    /// Returns every type name the query refers to, required ones first.
    #[must_use]
    pub fn referenced_types(&self) -> Vec<&str> {
        self.with
            .iter()
            .chain(self.without.iter())
            .map(String::as_str)
            .collect()
    }

    /// Returns `true` if the query selects nothing because it requires and
    /// excludes the same type.
    #[must_use]
    pub fn is_contradictory(&self) -> bool {
        self.with.iter().any(|name| self.without.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Default)]
    struct Transform;

    impl Component for Transform {
        fn type_name() -> &'static str {
            "Transform"
        }
    }

    #[test]
    fn test_builder_collects_names() {
        let q = QueryDescriptor::new()
            .with::<Transform>()
            .with_name("Relation")
            .without_name("Instance");
        assert_eq!(q.with, vec!["Transform", "Relation"]);
        assert_eq!(q.without, vec!["Instance"]);
        assert_eq!(q.referenced_types(), vec!["Transform", "Relation", "Instance"]);
    }

    #[test]
    fn test_contradictory_query() {
        let q = QueryDescriptor::new().with::<Transform>().without::<Transform>();
        assert!(q.is_contradictory());
        assert!(!QueryDescriptor::new().with::<Transform>().is_contradictory());
    }

    #[test]
    fn test_descriptor_from_json() {
        let q: QueryDescriptor =
            serde_json::from_value(serde_json::json!({"with": ["Info"], "without": []})).unwrap();
        assert_eq!(q, QueryDescriptor::new().with_name("Info"));
    }
}
