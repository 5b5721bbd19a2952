//! Fact tables

use std::collections::HashMap;

use crate::bytecode::ScalarValue;

/// Named, typed facts an interpreter evaluates against
///
/// The interpreter only reads facts; hosts update them between runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactTable {
    facts: HashMap<String, ScalarValue>,
}

impl FactTable {
    /// Create an empty table
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fact, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ScalarValue>) -> Option<ScalarValue> {
        self.facts.insert(name.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.facts.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<ScalarValue> {
        self.facts.remove(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.facts.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn clear(&mut self) {
        self.facts.clear();
    }

    /// Iterate over facts in arbitrary order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ScalarValue)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>, V: Into<ScalarValue>> FromIterator<(K, V)> for FactTable {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut table = Self::new();
        table.extend(iter);
        table
    }
}

impl<K: Into<String>, V: Into<ScalarValue>> Extend<(K, V)> for FactTable {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (name, value) in iter {
            self.insert(name, value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_replace() {
        let mut facts = FactTable::new();
        assert!(facts.insert("temperature", 10).is_none());
        assert_eq!(facts.insert("temperature", -5), Some(ScalarValue::Int(10)));
        assert_eq!(facts.get("temperature"), Some(&ScalarValue::Int(-5)));
        assert_eq!(facts.len(), 1);
    }

    #[test]
    fn collect_mixed_types() {
        let mut facts: FactTable = [
            ("a", ScalarValue::Int(1)),
            ("b", ScalarValue::string("x")),
            ("c", ScalarValue::Bool(true)),
        ]
        .into_iter()
        .collect();
        assert_eq!(facts.len(), 3);
        assert!(facts.contains("b"));
        assert_eq!(facts.remove("c"), Some(ScalarValue::Bool(true)));
        assert!(!facts.contains("c"));
    }
}
