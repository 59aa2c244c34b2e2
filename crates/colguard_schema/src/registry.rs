//! Named custom checks available to schema declarations.

use std::collections::BTreeMap;

use crate::check::CustomCheck;
use crate::error::{SchemaError, SchemaResult};

/// Lookup table from a declared custom check name to its predicate.
#[derive(Debug, Clone, Default)]
pub struct CheckRegistry {
    checks: BTreeMap<String, CustomCheck>,
}

impl CheckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under the check's own name, replacing any previous entry.
    pub fn register(&mut self, check: CustomCheck) -> &mut Self {
        self.checks.insert(check.name().to_string(), check);
        self
    }

    pub fn with(mut self, check: CustomCheck) -> Self {
        self.register(check);
        self
    }

    pub fn get(&self, name: &str) -> Option<&CustomCheck> {
        self.checks.get(name)
    }

    pub fn resolve(&self, name: &str) -> SchemaResult<CustomCheck> {
        self.get(name)
            .cloned()
            .ok_or_else(|| SchemaError::UnknownCheck(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.checks.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colguard_protocol::Value;

    #[test]
    fn test_resolve_registered_and_unknown() {
        let registry = CheckRegistry::new()
            .with(CustomCheck::element_wise("positive", |v: &Value| {
                v.as_f64().is_some_and(|f| f > 0.0)
            }));
        assert_eq!(registry.resolve("positive").unwrap().name(), "positive");
        assert!(matches!(
            registry.resolve("negative"),
            Err(SchemaError::UnknownCheck(name)) if name == "negative"
        ));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["positive"]);
    }
}
