//! Command definitions, formatters and execution results.
//!
//! A [`CommandDefinition`] ties a compiled [`Grammar`] to a converter that
//! turns the parsed fields into typed parameters, an executor producing a
//! typed result, and per-target formatters. Definitions are built with
//! [`CommandBuilder`], which refuses to produce a definition missing any of
//! its required parts.
//!
//! Dispatchers store definitions behind the [`Command`] trait so commands
//! with different parameter types can share one result type.

use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::convert::Converter;
use crate::field::FieldRegistry;
use crate::grammar::{Grammar, GrammarOptions, ParsedFields};
use crate::name::CommandName;
use crate::outcome::{Failure, Outcome, capture_result};
use crate::template::Template;

/// Rendering target for command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum OutputTarget {
    /// Plain text.
    #[default]
    Text,
    /// Lightweight markup.
    Markdown,
    /// Rich structured embed (rendered as JSON).
    Embed,
}

impl OutputTarget {
    /// Every target, in declaration order.
    pub const ALL: [OutputTarget; 3] = [Self::Text, Self::Markdown, Self::Embed];
}

/// Renders a typed result to a string.
pub type Formatter<R> = Arc<dyn Fn(&R) -> String + Send + Sync>;

/// Executes a command with its typed parameters.
pub type Executor<P, R> = Arc<dyn Fn(P) -> Outcome<R> + Send + Sync>;

/// Formatters keyed by output target.
pub struct Formatters<R> {
    by_target: HashMap<OutputTarget, Formatter<R>>,
}

impl<R> Formatters<R> {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self {
            by_target: HashMap::new(),
        }
    }

    /// Adds or replaces the formatter for `target`.
    pub fn insert(
        &mut self,
        target: OutputTarget,
        formatter: impl Fn(&R) -> String + Send + Sync + 'static,
    ) {
        self.by_target.insert(target, Arc::new(formatter));
    }

    /// Chaining form of [`insert`](Self::insert).
    pub fn with(
        mut self,
        target: OutputTarget,
        formatter: impl Fn(&R) -> String + Send + Sync + 'static,
    ) -> Self {
        self.insert(target, formatter);
        self
    }

    /// Formatter registered for `target`.
    pub fn get(&self, target: OutputTarget) -> Option<&Formatter<R>> {
        self.by_target.get(&target)
    }

    /// Renders `result` for `target` when a formatter is registered.
    pub fn render(&self, result: &R, target: OutputTarget) -> Option<String> {
        self.get(target).map(|formatter| formatter(result))
    }

    /// Returns `true` when no formatter is registered.
    pub fn is_empty(&self) -> bool {
        self.by_target.is_empty()
    }
}

impl<R> Default for Formatters<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> Clone for Formatters<R> {
    fn clone(&self) -> Self {
        Self {
            by_target: self.by_target.clone(),
        }
    }
}

impl<R> fmt::Debug for Formatters<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let targets: Vec<_> = OutputTarget::ALL
            .into_iter()
            .filter(|target| self.by_target.contains_key(target))
            .collect();
        f.debug_struct("Formatters")
            .field("targets", &targets)
            .finish()
    }
}

/// Outcome of one successful dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionResult<R> {
    /// Command that produced the result.
    pub command: CommandName,
    /// Typed result.
    pub result: R,
    /// Result rendered for the dispatcher's output target.
    pub message: String,
}

/// A registered command as seen by dispatchers.
pub trait Command<R>: Send + Sync {
    /// Unique command name.
    fn name(&self) -> &CommandName;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Compiled grammar of the command.
    fn grammar(&self) -> &Grammar;

    /// Converts matched fields and executes the command.
    ///
    /// Panics raised by the converter or executor are reported as
    /// [`Failure::Panicked`].
    fn evaluate(&self, fields: &ParsedFields) -> Outcome<R>;

    /// Renders `result` with the command's own formatter for `target`.
    fn format(&self, result: &R, target: OutputTarget) -> Option<String>;
}

/// A fully specified command.
pub struct CommandDefinition<P, R> {
    name: CommandName,
    description: String,
    grammar: Grammar,
    converter: Converter<P>,
    executor: Executor<P, R>,
    formatters: Formatters<R>,
}

impl<P: 'static, R: 'static> CommandDefinition<P, R> {
    /// Starts building a command named `name`.
    pub fn builder(name: &str) -> CommandBuilder<P, R> {
        CommandBuilder::new(name)
    }

    /// The command's formatters.
    pub fn formatters(&self) -> &Formatters<R> {
        &self.formatters
    }
}

impl<P, R> fmt::Debug for CommandDefinition<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("grammar", &self.grammar)
            .field("formatters", &self.formatters)
            .finish_non_exhaustive()
    }
}

impl<P: 'static, R: 'static> Command<R> for CommandDefinition<P, R> {
    fn name(&self) -> &CommandName {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    fn evaluate(&self, fields: &ParsedFields) -> Outcome<R> {
        capture_result(AssertUnwindSafe(|| {
            let params = self.converter.convert(&fields.to_value())?;
            (self.executor)(params)
        }))
    }

    fn format(&self, result: &R, target: OutputTarget) -> Option<String> {
        self.formatters.render(result, target)
    }
}

/// Builder for [`CommandDefinition`].
///
/// # Examples
///
/// ```
/// use command_grammar_core::convert::{self, Shape};
/// use command_grammar_core::{
///     Command, CommandDefinition, FieldDescriptor, FieldRegistry, GrammarOptions, OutputTarget,
/// };
///
/// let registry = FieldRegistry::from_descriptors([FieldDescriptor::new("words", ".+")?])?;
/// let echo = CommandDefinition::builder("echo")
///     .description("Repeats its input")
///     .template("!echo {{words}}", &registry, GrammarOptions::default())
///     .converter(convert::field("words", convert::string()))
///     .executor(|words: String| Ok(words.to_uppercase()))
///     .formatter(OutputTarget::Text, |shout: &String| format!("{shout}!"))
///     .build()?;
///
/// let fields = echo.grammar().parse("!echo hello")?.expect("line matches");
/// let result = echo.evaluate(&fields)?;
/// assert_eq!(echo.format(&result, OutputTarget::Text).as_deref(), Some("HELLO!"));
///
/// // A command without an executor is refused.
/// let incomplete = CommandDefinition::<String, String>::builder("broken")
///     .template("!broken {{words}}", &registry, GrammarOptions::default())
///     .converter(convert::field("words", convert::string()))
///     .build();
/// assert!(incomplete.is_err());
/// # Ok::<(), command_grammar_core::Failure>(())
/// ```
pub struct CommandBuilder<P, R> {
    name: String,
    description: String,
    grammar: Option<Outcome<Grammar>>,
    converter: Option<Converter<P>>,
    executor: Option<Executor<P, R>>,
    formatters: Formatters<R>,
}

impl<P: 'static, R: 'static> CommandBuilder<P, R> {
    /// Starts a builder for `name`.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            grammar: None,
            converter: None,
            executor: None,
            formatters: Formatters::new(),
        }
    }

    /// Sets the description.
    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Uses an already compiled grammar.
    pub fn grammar(mut self, grammar: Grammar) -> Self {
        self.grammar = Some(Ok(grammar));
        self
    }

    /// Compiles `template` against `registry`; failures surface from [`build`](Self::build).
    pub fn template(
        mut self,
        template: &str,
        registry: &FieldRegistry,
        options: GrammarOptions,
    ) -> Self {
        let grammar = Template::parse(template)
            .and_then(|template| Grammar::compile(&template, registry, options));
        self.grammar = Some(grammar);
        self
    }

    /// Sets the converter from parsed fields to parameters.
    pub fn converter(mut self, converter: Converter<P>) -> Self {
        self.converter = Some(converter);
        self
    }

    /// Sets the executor.
    pub fn executor(mut self, executor: impl Fn(P) -> Outcome<R> + Send + Sync + 'static) -> Self {
        self.executor = Some(Arc::new(executor));
        self
    }

    /// Adds a formatter for `target`.
    pub fn formatter(
        mut self,
        target: OutputTarget,
        formatter: impl Fn(&R) -> String + Send + Sync + 'static,
    ) -> Self {
        self.formatters.insert(target, formatter);
        self
    }

    /// Validates and builds the definition.
    ///
    /// # Errors
    ///
    /// [`Failure::Configuration`] when the name is invalid or the grammar,
    /// converter or executor is missing; grammar compilation failures are
    /// returned as produced.
    pub fn build(self) -> Outcome<CommandDefinition<P, R>> {
        let name = CommandName::new(&self.name)?;
        let missing = |part: &str| {
            Failure::configuration(format!("command \"{name}\" has no {part}"))
        };
        let grammar = self.grammar.ok_or_else(|| missing("grammar"))??;
        let converter = self.converter.ok_or_else(|| missing("converter"))?;
        let executor = self.executor.ok_or_else(|| missing("executor"))?;

        Ok(CommandDefinition {
            name,
            description: self.description,
            grammar,
            converter,
            executor,
            formatters: self.formatters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert;
    use crate::field::FieldDescriptor;

    fn registry() -> FieldRegistry {
        FieldRegistry::from_descriptors([FieldDescriptor::new("count", r"\d+").unwrap()]).unwrap()
    }

    fn doubler() -> CommandBuilder<i64, i64> {
        CommandDefinition::builder("double")
            .template("!double {{count}}", &registry(), GrammarOptions::default())
            .converter(convert::field("count", convert::integer()))
            .executor(|n: i64| Ok(n * 2))
    }

    #[test]
    fn test_build_and_evaluate() {
        let command = doubler()
            .formatter(OutputTarget::Markdown, |n: &i64| format!("**{n}**"))
            .build()
            .unwrap();
        let fields = command.grammar().parse("!double 21").unwrap().unwrap();
        let result = command.evaluate(&fields).unwrap();

        assert_eq!(result, 42);
        assert_eq!(
            command.format(&result, OutputTarget::Markdown).as_deref(),
            Some("**42**")
        );
        assert_eq!(command.format(&result, OutputTarget::Text), None);
    }

    #[test]
    fn test_missing_parts_are_reported() {
        let failure = CommandDefinition::<i64, i64>::builder("double")
            .converter(convert::field("count", convert::integer()))
            .executor(|n: i64| Ok(n))
            .build()
            .unwrap_err();
        assert_eq!(
            failure,
            Failure::Configuration("command \"double\" has no grammar".to_string())
        );

        let failure = CommandDefinition::<i64, i64>::builder("double")
            .template("!double {{count}}", &registry(), GrammarOptions::default())
            .executor(|n: i64| Ok(n))
            .build()
            .unwrap_err();
        assert_eq!(
            failure,
            Failure::Configuration("command \"double\" has no converter".to_string())
        );
    }

    #[test]
    fn test_invalid_template_surfaces_on_build() {
        let failure = CommandDefinition::<i64, i64>::builder("double")
            .template("!double {{amount}}", &registry(), GrammarOptions::default())
            .converter(convert::field("count", convert::integer()))
            .executor(|n: i64| Ok(n))
            .build()
            .unwrap_err();
        assert_eq!(failure, Failure::UnrecognizedField("amount".to_string()));
    }

    #[test]
    fn test_empty_name_is_refused() {
        assert!(matches!(
            CommandDefinition::<i64, i64>::builder(" ").build(),
            Err(Failure::Configuration(_))
        ));
    }

    #[test]
    fn test_executor_panic_becomes_failure() {
        let command = CommandDefinition::builder("explode")
            .template("!explode {{count}}", &registry(), GrammarOptions::default())
            .converter(convert::field("count", convert::integer()))
            .executor(|_: i64| -> Outcome<i64> { panic!("executor exploded") })
            .build()
            .unwrap();
        let fields = command.grammar().parse("!explode 1").unwrap().unwrap();
        assert_eq!(
            command.evaluate(&fields).unwrap_err(),
            Failure::Panicked("executor exploded".to_string())
        );
    }

    #[test]
    fn test_conversion_failure_propagates() {
        let command = CommandDefinition::builder("words")
            .template("!double {{count}}", &registry(), GrammarOptions::default())
            .converter(convert::field("count", convert::boolean()))
            .executor(|b: bool| Ok(b))
            .build()
            .unwrap();
        let fields = command.grammar().parse("!double 3").unwrap().unwrap();
        assert_eq!(
            command.evaluate(&fields).unwrap_err().to_string(),
            "count: expected a boolean, received \"3\""
        );
    }
}
