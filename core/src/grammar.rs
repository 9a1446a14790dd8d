//! Compiles templates into anchored matching expressions.
//!
//! [`Grammar::compile`] walks a [`Template`] and splices each referenced
//! field's fragment into a single expression, recording which capture
//! group belongs to which field. Fields marked optional (on the descriptor
//! or at the reference) are wrapped together with their leading separator
//! so the whole field can be skipped wherever it appears; an optional field
//! at the very start owns the separator after it instead.
//!
//! Parsing re-checks that the expression has exactly as many capture
//! groups as the referenced fields declare. A fragment hiding more groups
//! than its descriptor admits would otherwise shift every later field onto
//! the wrong capture, so such a grammar refuses to parse anything.
//!
//! # Example
//!
//! ```
//! use command_grammar_core::{FieldDescriptor, FieldRegistry, Grammar, GrammarOptions, Template};
//!
//! let registry = FieldRegistry::from_descriptors([
//!     FieldDescriptor::new("tier", r"[Tt]?(\d)")?.optional().with_embedded_captures(1),
//!     FieldDescriptor::new("words", r".+")?,
//! ])?;
//! let template = Template::parse("!beast {{tier?}} {{words}}")?;
//! let grammar = Grammar::compile(&template, &registry, GrammarOptions::default())?;
//!
//! let fields = grammar.parse("!beast T5 horned serpent")?.expect("line matches");
//! assert_eq!(fields.get("tier"), Some("5"));
//! assert_eq!(fields.get("words"), Some("horned serpent"));
//!
//! let fields = grammar.parse("!beast ron weasley")?.expect("line matches");
//! assert_eq!(fields.get("tier"), None);
//! assert_eq!(fields.get("words"), Some("ron weasley"));
//!
//! assert!(grammar.parse("!beat some beast")?.is_none());
//! # Ok::<(), command_grammar_core::Failure>(())
//! ```

use indexmap::IndexMap;
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::field::FieldRegistry;
use crate::name::FieldName;
use crate::outcome::{Failure, Outcome};
use crate::template::{Template, TemplateToken};

/// Separator required between consecutive tokens.
const SEPARATOR: &str = r"\s+";

/// What to do with a template reference to an unregistered field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFieldPolicy {
    /// Fail with [`Failure::UnrecognizedField`].
    #[default]
    Reject,
    /// Match the reference's name as a literal word.
    ///
    /// Legacy behaviour kept for catalogs written against it; new catalogs
    /// should register every field they reference.
    Literal,
}

/// Compilation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarOptions {
    /// Match literals and fragments without regard to case.
    pub case_insensitive: bool,
    /// Handling of unregistered field references.
    pub unknown_fields: UnknownFieldPolicy,
}

impl Default for GrammarOptions {
    fn default() -> Self {
        Self {
            case_insensitive: true,
            unknown_fields: UnknownFieldPolicy::Reject,
        }
    }
}

/// Capture groups owned by one referenced field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureSlot {
    /// Field the groups belong to.
    pub field: FieldName,
    /// Index of the wrapping group.
    pub group: usize,
    /// Groups nested inside the wrapping group.
    pub embedded_captures: usize,
}

/// A template compiled into one anchored expression.
#[derive(Debug, Clone)]
pub struct Grammar {
    template: String,
    regex: Regex,
    slots: Vec<CaptureSlot>,
}

impl Grammar {
    /// Compiles `template` against `registry`.
    ///
    /// # Errors
    ///
    /// - [`Failure::UnrecognizedField`] for an unregistered reference under
    ///   [`UnknownFieldPolicy::Reject`].
    /// - [`Failure::Configuration`] when the template references no field or
    ///   the assembled expression does not compile.
    pub fn compile(
        template: &Template,
        registry: &FieldRegistry,
        options: GrammarOptions,
    ) -> Outcome<Self> {
        let tokens = template.tokens();
        let mut expression = String::from(r"^\s*");
        let mut slots = Vec::new();
        let mut next_group = 1;
        let mut separator_pending = false;

        for (index, token) in tokens.iter().enumerate() {
            let is_last = index + 1 == tokens.len();
            let (fragment, optional) = match token {
                TemplateToken::Literal(text) => (regex::escape(text), false),
                TemplateToken::Field { name, optional } => match registry.get(name) {
                    Some(descriptor) => {
                        slots.push(CaptureSlot {
                            field: descriptor.name.clone(),
                            group: next_group,
                            embedded_captures: descriptor.embedded_captures,
                        });
                        next_group += descriptor.capture_count();
                        (
                            format!("({})", descriptor.pattern),
                            *optional || descriptor.optional,
                        )
                    }
                    None => match options.unknown_fields {
                        UnknownFieldPolicy::Reject => {
                            return Err(Failure::UnrecognizedField(name.clone()));
                        }
                        UnknownFieldPolicy::Literal => (regex::escape(name), *optional),
                    },
                },
            };

            if !optional {
                if separator_pending {
                    expression.push_str(SEPARATOR);
                }
                expression.push_str(&fragment);
                separator_pending = true;
            } else if separator_pending {
                expression.push_str(&format!("(?:{SEPARATOR}{fragment})?"));
            } else if is_last {
                expression.push_str(&format!("(?:{fragment})?"));
            } else {
                // Leading optional: it owns the separator that follows it.
                expression.push_str(&format!("(?:{fragment}{SEPARATOR})?"));
            }
        }
        expression.push_str(r"\s*$");

        let source = template.to_string();
        if slots.is_empty() {
            return Err(Failure::configuration(format!(
                "template \"{source}\" references no fields"
            )));
        }

        let regex = RegexBuilder::new(&expression)
            .case_insensitive(options.case_insensitive)
            .build()
            .map_err(|err| {
                Failure::configuration(format!("template \"{source}\" does not compile: {err}"))
            })?;

        debug!(template = %source, fields = slots.len(), expression = %expression, "Compiled grammar");

        Ok(Self {
            template: source,
            regex,
            slots,
        })
    }

    /// Template text the grammar was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// The compiled expression.
    pub fn expression(&self) -> &str {
        self.regex.as_str()
    }

    /// Capture slots in template order.
    pub fn slots(&self) -> &[CaptureSlot] {
        &self.slots
    }

    /// Referenced field names in template order.
    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.slots.iter().map(|slot| &slot.field)
    }

    /// Captures the referenced fields declare.
    pub fn expected_captures(&self) -> usize {
        self.slots
            .iter()
            .map(|slot| 1 + slot.embedded_captures)
            .sum()
    }

    /// Capture groups actually present in the expression.
    pub fn actual_captures(&self) -> usize {
        self.regex.captures_len() - 1
    }

    /// Verifies declared and actual capture counts agree.
    ///
    /// [`parse`](Self::parse) runs this on every match; callers may also
    /// run it eagerly while building a catalog.
    pub fn check_capture_count(&self) -> Outcome<()> {
        let expected = self.expected_captures();
        let actual = self.actual_captures();
        if expected == actual {
            Ok(())
        } else {
            Err(Failure::MismatchedCaptureCount {
                template: self.template.clone(),
                expected,
                actual,
            })
        }
    }

    /// Returns `true` when `line` matches, without extracting fields.
    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Matches `line` and extracts every referenced field.
    ///
    /// Returns `Ok(None)` when the line does not match. A field with
    /// embedded captures takes the text of its last participating embedded
    /// capture; other fields take their whole matched text, trimmed. Fields inside a
    /// skipped optional branch map to `None`.
    ///
    /// # Errors
    ///
    /// [`Failure::MismatchedCaptureCount`] when the line matches but the
    /// expression's groups disagree with the declared counts.
    pub fn parse(&self, line: &str) -> Outcome<Option<ParsedFields>> {
        let Some(captures) = self.regex.captures(line) else {
            return Ok(None);
        };
        self.check_capture_count()?;

        let mut values = IndexMap::with_capacity(self.slots.len());
        for slot in &self.slots {
            let text = (slot.group..=slot.group + slot.embedded_captures)
                .rev()
                .find_map(|group| captures.get(group))
                .map(|found| found.as_str().trim().to_string());
            values.insert(slot.field.clone(), text);
        }
        Ok(Some(ParsedFields { values }))
    }
}

/// Field texts extracted from one matched line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedFields {
    values: IndexMap<FieldName, Option<String>>,
}

impl ParsedFields {
    /// Text of `name`, or `None` when absent or unmatched.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values
            .get(name.trim().to_lowercase().as_str())
            .and_then(|value| value.as_deref())
    }

    /// Iterates fields in template order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, Option<&str>)> {
        self.values
            .iter()
            .map(|(name, value)| (name, value.as_deref()))
    }

    /// Number of referenced fields, matched or not.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` when no field was referenced.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Renders the fields as a JSON object for converters; unmatched fields are omitted.
    pub fn to_value(&self) -> Value {
        let properties: Map<String, Value> = self
            .values
            .iter()
            .filter_map(|(name, value)| {
                value
                    .as_ref()
                    .map(|text| (name.to_string(), Value::String(text.clone())))
            })
            .collect();
        Value::Object(properties)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::field::FieldDescriptor;

    fn beast_registry() -> FieldRegistry {
        FieldRegistry::from_descriptors([
            FieldDescriptor::new("tier", r"[Tt]?(\d)")
                .unwrap()
                .optional()
                .with_embedded_captures(1),
            FieldDescriptor::new("words", r".+").unwrap(),
            FieldDescriptor::new("count", r"\d+").unwrap(),
        ])
        .unwrap()
    }

    fn compile(template: &str) -> Outcome<Grammar> {
        Grammar::compile(
            &Template::parse(template).unwrap(),
            &beast_registry(),
            GrammarOptions::default(),
        )
    }

    #[test]
    fn test_optional_field_with_embedded_capture() {
        let grammar = compile("!beast {{tier?}} {{words}}").unwrap();
        assert_eq!(grammar.expected_captures(), 3);
        assert_eq!(grammar.actual_captures(), 3);

        let fields = grammar.parse("  !beast T5 horned serpent  ").unwrap().unwrap();
        assert_eq!(fields.get("tier"), Some("5"));
        assert_eq!(fields.get("words"), Some("horned serpent"));

        let fields = grammar.parse("!beast ron weasley").unwrap().unwrap();
        assert_eq!(fields.get("tier"), None);
        assert_eq!(fields.to_value(), json!({ "words": "ron weasley" }));

        assert!(grammar.parse("!beat some beast").unwrap().is_none());
    }

    #[test]
    fn test_expression_shape() {
        let grammar = compile("!beast {{tier?}} {{words}}").unwrap();
        assert_eq!(
            grammar.expression(),
            r"^\s*!beast(?:\s+([Tt]?(\d)))?\s+(.+)\s*$"
        );
    }

    #[test]
    fn test_trailing_optional_needs_no_trailing_space() {
        let grammar = compile("!count {{words}} {{tier?}}").unwrap();
        assert_eq!(
            grammar.expression(),
            r"^\s*!count\s+(.+)(?:\s+([Tt]?(\d)))?\s*$"
        );
        assert!(grammar.parse("!count things").unwrap().is_some());
    }

    #[test]
    fn test_consecutive_optionals_can_each_be_omitted() {
        let registry = FieldRegistry::from_descriptors([
            FieldDescriptor::new("a", r"\d+").unwrap(),
            FieldDescriptor::new("b", r"[a-z]+").unwrap(),
        ])
        .unwrap();
        let grammar = Grammar::compile(
            &Template::parse("!x {{a?}} {{b?}}").unwrap(),
            &registry,
            GrammarOptions::default(),
        )
        .unwrap();
        assert_eq!(
            grammar.expression(),
            r"^\s*!x(?:\s+(\d+))?(?:\s+([a-z]+))?\s*$"
        );

        let fields = grammar.parse("!x").unwrap().unwrap();
        assert_eq!((fields.get("a"), fields.get("b")), (None, None));
        let fields = grammar.parse("!x 5").unwrap().unwrap();
        assert_eq!((fields.get("a"), fields.get("b")), (Some("5"), None));
        let fields = grammar.parse("!x z").unwrap().unwrap();
        assert_eq!((fields.get("a"), fields.get("b")), (None, Some("z")));
        let fields = grammar.parse("!x 5 z").unwrap().unwrap();
        assert_eq!((fields.get("a"), fields.get("b")), (Some("5"), Some("z")));
        assert!(!grammar.is_match("!x5"));
    }

    #[test]
    fn test_leading_optional_owns_following_separator() {
        let grammar = compile("{{count?}} {{words}}").unwrap();
        assert_eq!(grammar.expression(), r"^\s*(?:(\d+)\s+)?(.+)\s*$");
        let fields = grammar.parse("3 blind mice").unwrap().unwrap();
        assert_eq!(fields.get("count"), Some("3"));
        assert_eq!(fields.get("words"), Some("blind mice"));
        assert!(grammar.is_match("mice"));
    }

    #[test]
    fn test_field_names_follow_template_order() {
        let grammar = compile("!beast {{words}} {{tier?}} {{count}}").unwrap();
        let names: Vec<&str> = grammar.field_names().map(FieldName::as_str).collect();
        assert_eq!(names, ["words", "tier", "count"]);
    }

    #[test]
    fn test_non_ascii_field_reference_resolves() {
        let registry = FieldRegistry::from_descriptors([
            FieldDescriptor::new("niveau_é", r"\d+").unwrap(),
            FieldDescriptor::new("words", r".+").unwrap(),
        ])
        .unwrap();
        let grammar = Grammar::compile(
            &Template::parse("!x {{niveau_é}} {{words}}").unwrap(),
            &registry,
            GrammarOptions::default(),
        )
        .unwrap();
        let fields = grammar.parse("!x 3 forêt").unwrap().unwrap();
        assert_eq!(fields.get("niveau_é"), Some("3"));
        assert_eq!(fields.get("words"), Some("forêt"));

        assert!(matches!(
            Grammar::compile(
                &Template::parse("!x {{niveau_è}} {{words}}").unwrap(),
                &registry,
                GrammarOptions::default(),
            ),
            Err(Failure::UnrecognizedField(name)) if name == "niveau_è"
        ));
    }

    #[test]
    fn test_literals_are_escaped_and_case_insensitive() {
        let grammar = compile("?count {{count}}").unwrap();
        let fields = grammar.parse("?COUNT 12").unwrap().unwrap();
        assert_eq!(fields.get("count"), Some("12"));
        assert!(grammar.parse("count 12").unwrap().is_none());
    }

    #[test]
    fn test_case_sensitive_option() {
        let options = GrammarOptions {
            case_insensitive: false,
            ..GrammarOptions::default()
        };
        let grammar = Grammar::compile(
            &Template::parse("!count {{count}}").unwrap(),
            &beast_registry(),
            options,
        )
        .unwrap();
        assert!(grammar.parse("!COUNT 3").unwrap().is_none());
    }

    #[test]
    fn test_unknown_field_is_rejected_by_default() {
        assert_eq!(
            compile("!raid {{gym}}").unwrap_err(),
            Failure::UnrecognizedField("gym".to_string())
        );
    }

    #[test]
    fn test_unknown_field_as_literal() {
        let options = GrammarOptions {
            unknown_fields: UnknownFieldPolicy::Literal,
            ..GrammarOptions::default()
        };
        let grammar = Grammar::compile(
            &Template::parse("!raid {{gym}} {{count}}").unwrap(),
            &beast_registry(),
            options,
        )
        .unwrap();
        let fields = grammar.parse("!raid gym 4").unwrap().unwrap();
        assert_eq!(fields.get("count"), Some("4"));
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_optional_unknown_field_as_literal_is_skippable() {
        let options = GrammarOptions {
            unknown_fields: UnknownFieldPolicy::Literal,
            ..GrammarOptions::default()
        };
        let grammar = Grammar::compile(
            &Template::parse("!raid {{gym?}} {{count}}").unwrap(),
            &beast_registry(),
            options,
        )
        .unwrap();
        assert_eq!(grammar.parse("!raid gym 4").unwrap().unwrap().get("count"), Some("4"));
        assert_eq!(grammar.parse("!raid 4").unwrap().unwrap().get("count"), Some("4"));
    }

    #[test]
    fn test_template_without_fields_is_rejected() {
        assert!(matches!(
            compile("!help"),
            Err(Failure::Configuration(_))
        ));
    }

    #[test]
    fn test_undeclared_embedded_capture_fails_every_parse() {
        let registry = FieldRegistry::from_descriptors([
            FieldDescriptor::new("sneaky", r"(a|b)c").unwrap(),
            FieldDescriptor::new("words", r".+").unwrap(),
        ])
        .unwrap();

        for source in ["{{sneaky}}", "!x {{sneaky}} {{words}}", "{{words}} {{sneaky}}"] {
            let grammar = Grammar::compile(
                &Template::parse(source).unwrap(),
                &registry,
                GrammarOptions::default(),
            )
            .unwrap();
            let line = source
                .replace("{{sneaky}}", "ac")
                .replace("{{words}}", "hello");
            assert!(matches!(
                grammar.parse(&line),
                Err(Failure::MismatchedCaptureCount { .. })
            ));
        }
    }

    #[test]
    fn test_check_capture_count_is_available_eagerly() {
        let registry = FieldRegistry::from_descriptors([FieldDescriptor::new(
            "pair",
            r"(\d)-(\d)",
        )
        .unwrap()
        .with_embedded_captures(1)])
        .unwrap();
        let grammar = Grammar::compile(
            &Template::parse("!pair {{pair}}").unwrap(),
            &registry,
            GrammarOptions::default(),
        )
        .unwrap();
        assert_eq!(
            grammar.check_capture_count().unwrap_err(),
            Failure::MismatchedCaptureCount {
                template: "!pair {{pair}}".to_string(),
                expected: 2,
                actual: 3,
            }
        );
        assert!(grammar.parse("!nothing").unwrap().is_none());
    }

    #[test]
    fn test_reference_site_optional_overrides_descriptor() {
        let grammar = compile("!count {{count?}} {{words}}").unwrap();
        let fields = grammar.parse("!count apples").unwrap().unwrap();
        assert_eq!(fields.get("count"), None);
        assert_eq!(fields.get("words"), Some("apples"));
    }
}
