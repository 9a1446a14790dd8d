//! Output formatting for compiled grammars, parsed lines and dispatch results.

use command_grammar_core::{CaptureSlot, ExecutionResult, Grammar, ParsedFields};
use serde::Serialize;

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Json,
    Yaml,
    Text,
}

/// Summary of a compiled grammar.
#[derive(Debug, Serialize)]
pub struct GrammarReport<'a> {
    pub template: &'a str,
    pub expression: &'a str,
    pub captures: &'a [CaptureSlot],
    pub expected_captures: usize,
    pub actual_captures: usize,
}

impl<'a> GrammarReport<'a> {
    pub fn new(grammar: &'a Grammar) -> Self {
        Self {
            template: grammar.template(),
            expression: grammar.expression(),
            captures: grammar.slots(),
            expected_captures: grammar.expected_captures(),
            actual_captures: grammar.actual_captures(),
        }
    }
}

/// Formats a compiled grammar.
pub fn format_grammar(grammar: &Grammar, format: OutputFormat) -> Result<String, String> {
    let report = GrammarReport::new(grammar);
    match format {
        OutputFormat::Text => Ok(grammar_to_text(&report)),
        _ => serialize(&report, format),
    }
}

/// Formats the fields extracted from one line.
pub fn format_fields(fields: &ParsedFields, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Text => Ok(fields
            .iter()
            .map(|(name, value)| format!("{name} = {}", value.unwrap_or("(absent)")))
            .collect::<Vec<_>>()
            .join("\n")),
        _ => serialize(&fields.to_value(), format),
    }
}

/// Formats dispatch results; text output is the rendered messages.
pub fn format_results<R: Serialize>(
    results: &[ExecutionResult<R>],
    format: OutputFormat,
) -> Result<String, String> {
    match format {
        OutputFormat::Text => Ok(results
            .iter()
            .map(|executed| executed.message.as_str())
            .collect::<Vec<_>>()
            .join("\n")),
        _ => serialize(results, format),
    }
}

fn serialize<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String, String> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| format!("YAML serialization failed: {e}"))
        }
        _ => serde_json::to_string_pretty(value)
            .map_err(|e| format!("JSON serialization failed: {e}")),
    }
}

fn grammar_to_text(report: &GrammarReport<'_>) -> String {
    let mut out = String::new();
    out.push_str(&format!("template:   {}\n", report.template));
    out.push_str(&format!("expression: {}\n", report.expression));
    out.push_str(&format!(
        "captures:   {} expected, {} actual\n",
        report.expected_captures, report.actual_captures
    ));
    for slot in report.captures {
        out.push_str(&format!(
            "  group {:>2}  {} (+{} embedded)\n",
            slot.group, slot.field, slot.embedded_captures
        ));
    }
    out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use command_grammar_core::GrammarConfig;

    fn grammar() -> Grammar {
        GrammarConfig::from_yaml_str(
            r#"
fields:
  - name: tier
    pattern: "[Tt]?(\\d)"
    optional: true
    embedded_captures: 1
  - name: words
    pattern: ".+"
"#,
        )
        .unwrap()
        .compile("!beast {{tier}} {{words}}")
        .unwrap()
    }

    #[test]
    fn test_grammar_text() {
        let text = format_grammar(&grammar(), OutputFormat::Text).unwrap();
        assert!(text.contains("captures:   3 expected, 3 actual"));
        assert!(text.contains("group  1  tier (+1 embedded)"));
        assert!(text.contains("group  3  words (+0 embedded)"));
    }

    #[test]
    fn test_grammar_json() {
        let json = format_grammar(&grammar(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["template"], "!beast {{tier}} {{words}}");
        assert_eq!(value["captures"][1]["field"], "words");
        assert_eq!(value["captures"][1]["group"], 3);
    }

    #[test]
    fn test_fields_text_marks_absent() {
        let fields = grammar().parse("!beast horned serpent").unwrap().unwrap();
        assert_eq!(
            format_fields(&fields, OutputFormat::Text).unwrap(),
            "tier = (absent)\nwords = horned serpent"
        );
    }

    #[test]
    fn test_fields_yaml_omits_absent() {
        let fields = grammar().parse("!beast t2 niffler").unwrap().unwrap();
        let yaml = format_fields(&fields, OutputFormat::Yaml).unwrap();
        let value: serde_json::Value = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(value, serde_json::json!({ "tier": "2", "words": "niffler" }));

        let fields = grammar().parse("!beast niffler").unwrap().unwrap();
        let json = format_fields(&fields, OutputFormat::Json).unwrap();
        assert_eq!(json, "{\n  \"words\": \"niffler\"\n}");
    }
}
