//! Field descriptors and the registry templates are compiled against.

use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::name::FieldName;
use crate::outcome::{Failure, Outcome};

/// A named, reusable fragment of a matching expression.
///
/// `embedded_captures` declares how many capture groups `pattern` itself
/// contains. The compiler wraps every fragment in one more group to
/// extract its text; the declared count is trusted and only checked
/// against the compiled expression when a line is parsed.
///
/// # Examples
///
/// ```
/// use command_grammar_core::FieldDescriptor;
///
/// let tier = FieldDescriptor::new("tier", r"[Tt]?(\d)")
///     .unwrap()
///     .optional()
///     .with_embedded_captures(1);
/// assert!(tier.optional);
/// assert_eq!(tier.capture_count(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// Field name.
    pub name: FieldName,
    /// Regular-expression fragment matching the field's text.
    pub pattern: String,
    /// Whether the field may be skipped wherever it is referenced.
    #[serde(default)]
    pub optional: bool,
    /// Capture groups contained in `pattern`.
    #[serde(default)]
    pub embedded_captures: usize,
}

impl FieldDescriptor {
    /// Creates a required field without embedded captures.
    pub fn new(name: &str, pattern: &str) -> Outcome<Self> {
        Ok(Self {
            name: FieldName::new(name)?,
            pattern: pattern.to_string(),
            optional: false,
            embedded_captures: 0,
        })
    }

    /// Marks the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Declares the capture groups contained in the fragment.
    pub fn with_embedded_captures(mut self, count: usize) -> Self {
        self.embedded_captures = count;
        self
    }

    /// Captures this field occupies in a compiled expression.
    pub fn capture_count(&self) -> usize {
        1 + self.embedded_captures
    }
}

/// Ordered registry of field descriptors keyed by normalized name.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    fields: IndexMap<FieldName, FieldDescriptor>,
}

impl FieldRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a registry, failing on the first unusable descriptor.
    pub fn from_descriptors(
        descriptors: impl IntoIterator<Item = FieldDescriptor>,
    ) -> Outcome<Self> {
        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.insert(descriptor)?;
        }
        Ok(registry)
    }

    /// Adds a descriptor.
    ///
    /// # Errors
    ///
    /// Fails with [`Failure::Configuration`] when the name is already
    /// registered or the fragment is not a valid expression on its own.
    pub fn insert(&mut self, descriptor: FieldDescriptor) -> Outcome<()> {
        if self.fields.contains_key(&descriptor.name) {
            return Err(Failure::configuration(format!(
                "duplicate field \"{}\"",
                descriptor.name
            )));
        }
        Regex::new(&descriptor.pattern).map_err(|err| {
            Failure::configuration(format!(
                "field \"{}\" has an invalid pattern: {err}",
                descriptor.name
            ))
        })?;
        self.fields.insert(descriptor.name.clone(), descriptor);
        Ok(())
    }

    /// Chaining form of [`insert`](Self::insert).
    pub fn with(mut self, descriptor: FieldDescriptor) -> Outcome<Self> {
        self.insert(descriptor)?;
        Ok(self)
    }

    /// Looks a descriptor up by case-insensitive name.
    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name.trim().to_lowercase().as_str())
    }

    /// Iterates descriptors in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.values()
    }

    /// Number of registered fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no field is registered.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_rejects_duplicates_case_insensitively() {
        let mut registry = FieldRegistry::new();
        registry
            .insert(FieldDescriptor::new("words", ".+").unwrap())
            .unwrap();

        let failure = registry
            .insert(FieldDescriptor::new("WORDS", r"\w+").unwrap())
            .unwrap_err();
        assert_eq!(
            failure,
            Failure::Configuration("duplicate field \"words\"".to_string())
        );
        assert_eq!(registry.get("Words").unwrap().pattern, ".+");
    }

    #[test]
    fn test_registry_rejects_invalid_patterns() {
        let failure = FieldRegistry::new()
            .with(FieldDescriptor::new("broken", "(unclosed").unwrap())
            .unwrap_err();
        assert!(matches!(failure, Failure::Configuration(_)));
    }

    #[test]
    fn test_registry_keeps_registration_order() {
        let registry = FieldRegistry::from_descriptors([
            FieldDescriptor::new("b", "b").unwrap(),
            FieldDescriptor::new("a", "a").unwrap(),
        ])
        .unwrap();
        let names: Vec<_> = registry.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
    }

    #[test]
    fn test_descriptor_defaults_from_yaml() {
        let descriptor: FieldDescriptor =
            serde_yaml::from_str("name: Words\npattern: '.+'\n").unwrap();
        assert_eq!(descriptor.name.as_str(), "words");
        assert!(!descriptor.optional);
        assert_eq!(descriptor.capture_count(), 1);
    }
}
