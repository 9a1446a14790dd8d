//! YAML configuration for field registries and named templates.
//!
//! Lets a deployment describe its field fragments (and optionally the
//! templates that use them) outside the code.
//!
//! # Example YAML
//!
//! ```yaml
//! case_insensitive: true
//! unknown_fields: reject
//! fields:
//!   - name: tier
//!     pattern: "[Tt]?(\\d)"
//!     optional: true
//!     embedded_captures: 1
//!   - name: words
//!     pattern: ".+"
//! templates:
//!   beast: "!beast {{tier?}} {{words}}"
//! ```

use std::io::{BufReader, BufWriter};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::field::{FieldDescriptor, FieldRegistry};
use crate::grammar::{Grammar, GrammarOptions, UnknownFieldPolicy};
use crate::template::Template;

fn default_case_insensitive() -> bool {
    true
}

/// Field registry and compilation options as stored on disk.
///
/// # Examples
///
/// ```
/// use command_grammar_core::GrammarConfig;
///
/// let config = GrammarConfig::from_yaml_str(
///     r#"
/// fields:
///   - name: words
///     pattern: ".+"
/// templates:
///   echo: "!echo {{words}}"
/// "#,
/// )?;
/// let grammars = config.grammars()?;
/// let fields = grammars["echo"].parse("!ECHO hello")?.unwrap();
/// assert_eq!(fields.get("words"), Some("hello"));
/// # Ok::<(), command_grammar_core::ConfigError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarConfig {
    /// Match without regard to case.
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
    /// Handling of unregistered field references.
    #[serde(default)]
    pub unknown_fields: UnknownFieldPolicy,
    /// Registered fields, in declaration order.
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    /// Named templates compiled by [`grammars`](Self::grammars).
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub templates: IndexMap<String, String>,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            unknown_fields: UnknownFieldPolicy::default(),
            fields: Vec::new(),
            templates: IndexMap::new(),
        }
    }
}

impl GrammarConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ConfigError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::ConfigError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ConfigError::IoError) if the file cannot
    /// be written, or [`YamlError`](crate::ConfigError::YamlError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Renders the configuration as YAML.
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Builds the field registry.
    ///
    /// # Errors
    ///
    /// [`Invalid`](crate::ConfigError::Invalid) for duplicate field names
    /// or fragments that are not valid expressions.
    pub fn registry(&self) -> Result<FieldRegistry> {
        Ok(FieldRegistry::from_descriptors(self.fields.iter().cloned())?)
    }

    /// Compilation options.
    pub fn options(&self) -> GrammarOptions {
        GrammarOptions {
            case_insensitive: self.case_insensitive,
            unknown_fields: self.unknown_fields,
        }
    }

    /// Compiles one template source against the configured fields.
    pub fn compile(&self, template: &str) -> Result<Grammar> {
        let registry = self.registry()?;
        self.compile_with(&registry, template)
    }

    /// Compiles every named template, keeping declaration order.
    pub fn grammars(&self) -> Result<IndexMap<String, Grammar>> {
        let registry = self.registry()?;
        let mut grammars = IndexMap::with_capacity(self.templates.len());
        for (name, source) in &self.templates {
            let grammar = self
                .compile_with(&registry, source)
                .map_err(|err| match err {
                    ConfigError::Invalid(failure) => failure.context(name).into(),
                    other => other,
                })?;
            grammars.insert(name.clone(), grammar);
        }
        debug!(templates = grammars.len(), "Compiled configured templates");
        Ok(grammars)
    }

    fn compile_with(&self, registry: &FieldRegistry, source: &str) -> Result<Grammar> {
        let template = Template::parse(source)?;
        Ok(Grammar::compile(&template, registry, self.options())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Failure;

    fn sample_yaml() -> &'static str {
        r#"
case_insensitive: false
unknown_fields: literal
fields:
  - name: tier
    pattern: "[Tt]?(\\d)"
    optional: true
    embedded_captures: 1
  - name: words
    pattern: ".+"
templates:
  beast: "!beast {{tier}} {{words}}"
  raid: "!raid {{tier}} {{gym}}"
"#
    }

    #[test]
    fn test_deserialize_complete() {
        let config = GrammarConfig::from_yaml_str(sample_yaml()).unwrap();
        assert!(!config.case_insensitive);
        assert_eq!(config.unknown_fields, UnknownFieldPolicy::Literal);
        assert_eq!(config.fields.len(), 2);
        assert!(config.fields[0].optional);
        assert_eq!(config.fields[0].embedded_captures, 1);
        assert!(!config.fields[1].optional);
        assert_eq!(
            config.templates.keys().collect::<Vec<_>>(),
            vec!["beast", "raid"]
        );
    }

    #[test]
    fn test_deserialize_minimal() {
        let config = GrammarConfig::from_yaml_str("fields: []").unwrap();
        assert_eq!(config, GrammarConfig::default());
        assert_eq!(config.options(), GrammarOptions::default());
    }

    #[test]
    fn test_literal_policy_flows_into_compilation() {
        let config = GrammarConfig::from_yaml_str(sample_yaml()).unwrap();
        let grammars = config.grammars().unwrap();
        let raid = &grammars["raid"];
        let fields = raid.parse("!raid 5 gym").unwrap().unwrap();
        assert_eq!(fields.get("tier"), Some("5"));
        assert!(raid.parse("!RAID 5 gym").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_fields_are_invalid() {
        let yaml = r#"
fields:
  - name: words
    pattern: ".+"
  - name: Words
    pattern: "\\w+"
"#;
        let config = GrammarConfig::from_yaml_str(yaml).unwrap();
        assert!(matches!(
            config.registry(),
            Err(ConfigError::Invalid(Failure::Configuration(_)))
        ));
    }

    #[test]
    fn test_unknown_field_names_the_template() {
        let yaml = r#"
fields:
  - name: words
    pattern: ".+"
templates:
  raid: "!raid {{gym}}"
"#;
        let err = GrammarConfig::from_yaml_str(yaml)
            .unwrap()
            .grammars()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid grammar configuration: raid: unrecognized property \"gym\" in template"
        );
    }

    #[test]
    fn test_malformed_yaml() {
        assert!(matches!(
            GrammarConfig::from_yaml_str("fields: {"),
            Err(ConfigError::YamlError(_))
        ));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grammar.yml");

        let config = GrammarConfig::from_yaml_str(sample_yaml()).unwrap();
        config.save(&path).unwrap();
        let loaded = GrammarConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_yaml_string_round_trip() {
        let config = GrammarConfig::from_yaml_str(sample_yaml()).unwrap();
        let yaml = config.to_yaml_string().unwrap();
        assert!(yaml.contains("unknown_fields: literal"));
        assert_eq!(GrammarConfig::from_yaml_str(&yaml).unwrap(), config);

        let empty = GrammarConfig::default().to_yaml_string().unwrap();
        assert!(!empty.contains("templates"));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            GrammarConfig::load(dir.path().join("absent.yml")),
            Err(ConfigError::IoError(_))
        ));
    }
}
