//! Command templates: literal words and field references.
//!
//! A template is written as whitespace-separated tokens. `{{name}}`
//! references a field, `{{name?}}` references it as optional, and any other
//! token is a literal word. Whitespace inside the braces is allowed, and
//! every braced token must name a valid field.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::name::FieldName;
use crate::outcome::{Failure, Outcome};

static TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{[^{}]*\}\}|\S+").expect("static regex must compile"));

static FIELD_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\{\{([^{}]*)\}\}$").expect("static regex must compile"));

/// One token of a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateToken {
    /// A word matched verbatim.
    Literal(String),
    /// A reference to a registered field.
    Field {
        /// Referenced field name, as written.
        name: String,
        /// Optional at this reference, regardless of the descriptor.
        optional: bool,
    },
}

impl TemplateToken {
    /// Creates a literal token.
    pub fn literal(text: &str) -> Self {
        Self::Literal(text.to_string())
    }

    /// Creates a required field reference.
    pub fn field(name: &str) -> Self {
        Self::Field {
            name: name.to_string(),
            optional: false,
        }
    }

    /// Creates an optional field reference.
    pub fn optional_field(name: &str) -> Self {
        Self::Field {
            name: name.to_string(),
            optional: true,
        }
    }
}

impl fmt::Display for TemplateToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(text) => f.write_str(text),
            Self::Field {
                name,
                optional: false,
            } => write!(f, "{{{{{name}}}}}"),
            Self::Field {
                name,
                optional: true,
            } => write!(f, "{{{{{name}?}}}}"),
        }
    }
}

/// Ordered sequence of template tokens.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Template, TemplateToken};
///
/// let template: Template = "!beast {{tier?}} {{words}}".parse().unwrap();
/// assert_eq!(
///     template.tokens(),
///     &[
///         TemplateToken::literal("!beast"),
///         TemplateToken::optional_field("tier"),
///         TemplateToken::field("words"),
///     ]
/// );
/// assert_eq!(template.to_string(), "!beast {{tier?}} {{words}}");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    tokens: Vec<TemplateToken>,
}

impl Template {
    /// Parses template source text.
    ///
    /// # Errors
    ///
    /// Fails with [`Failure::Configuration`] for an empty template or a
    /// braced token that is not a valid field name.
    pub fn parse(source: &str) -> Outcome<Self> {
        let tokens = TOKEN
            .find_iter(source)
            .map(|found| parse_token(found.as_str()))
            .collect::<Outcome<Vec<_>>>()?;
        Self::from_tokens(tokens)
    }

    /// Builds a template from tokens.
    pub fn from_tokens(tokens: Vec<TemplateToken>) -> Outcome<Self> {
        if tokens.is_empty() {
            return Err(Failure::configuration("template cannot be empty"));
        }
        Ok(Self { tokens })
    }

    /// The template's tokens.
    pub fn tokens(&self) -> &[TemplateToken] {
        &self.tokens
    }
}

fn parse_token(token: &str) -> Outcome<TemplateToken> {
    let Some(captures) = FIELD_REFERENCE.captures(token) else {
        return Ok(TemplateToken::Literal(token.to_string()));
    };
    let inner = captures[1].trim();
    let (name, optional) = match inner.strip_suffix('?') {
        Some(name) => (name.trim_end(), true),
        None => (inner, false),
    };
    FieldName::new(name).map_err(|err| match err {
        Failure::Configuration(reason) => {
            Failure::configuration(format!("invalid field reference \"{token}\": {reason}"))
        }
        other => other,
    })?;
    Ok(TemplateToken::Field {
        name: name.to_string(),
        optional,
    })
}

impl FromStr for Template {
    type Err = Failure;

    fn from_str(source: &str) -> Outcome<Self> {
        Self::parse(source)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, token) in self.tokens.iter().enumerate() {
            if index > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}
