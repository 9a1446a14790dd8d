//! Prefixed command groups.
//!
//! A [`CommandGroup`] wraps a [`CommandProcessor`] with a literal prefix
//! (e.g. `"!"`) so a front-end holding several groups can cheaply skip
//! input not meant for a group, and with per-target default formatters.
//! Registration through a group reports duplicate names as recoverable
//! failures.
//!
//! # Example
//!
//! ```
//! use command_grammar_core::convert;
//! use command_grammar_core::{
//!     CommandDefinition, CommandGroup, FieldDescriptor, FieldRegistry, GrammarOptions, OutputTarget,
//! };
//!
//! let registry = FieldRegistry::from_descriptors([FieldDescriptor::new("words", ".+")?])?;
//! let mut group = CommandGroup::new("!")
//!     .with_default_formatter(OutputTarget::Text, |words: &String| words.clone());
//! group.add_command(
//!     CommandDefinition::builder("echo")
//!         .template("!echo {{words}}", &registry, GrammarOptions::default())
//!         .converter(convert::field("words", convert::string()))
//!         .executor(|words: String| Ok(words))
//!         .build()?,
//! )?;
//!
//! assert!(group.could_be_command("  !echo hi"));
//! assert!(!group.could_be_command("echo hi"));
//! assert_eq!(group.process_one("!echo hi")?.message, "hi");
//! # Ok::<(), command_grammar_core::Failure>(())
//! ```

use std::collections::HashSet;

use tracing::debug;

use crate::command::{Command, ExecutionResult, Formatter, Formatters, OutputTarget};
use crate::name::CommandName;
use crate::outcome::{Failure, Outcome};
use crate::processor::CommandProcessor;

/// Commands sharing a literal prefix.
pub struct CommandGroup<R> {
    prefix: String,
    processor: CommandProcessor<R>,
}

impl<R: 'static> CommandGroup<R> {
    /// Creates an empty group; an empty prefix accepts every line.
    pub fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            processor: CommandProcessor::new(),
        }
    }

    /// Sets the validator of the underlying processor.
    pub fn with_validator(
        mut self,
        validator: impl Fn(R) -> Outcome<R> + Send + Sync + 'static,
    ) -> Self {
        self.processor = self.processor.with_validator(validator);
        self
    }

    /// Sets the output target used to render messages.
    pub fn with_target(mut self, target: OutputTarget) -> Self {
        self.processor.set_target(target);
        self
    }

    /// Adds a default formatter for `target`.
    pub fn with_default_formatter(
        mut self,
        target: OutputTarget,
        formatter: impl Fn(&R) -> String + Send + Sync + 'static,
    ) -> Self {
        self.processor
            .default_formatters_mut()
            .insert(target, formatter);
        self
    }

    /// The required prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The underlying processor.
    pub fn processor(&self) -> &CommandProcessor<R> {
        &self.processor
    }

    /// Returns `true` when `line` starts with the prefix (ignoring case and leading whitespace).
    pub fn could_be_command(&self, line: &str) -> bool {
        line.trim_start()
            .get(..self.prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(&self.prefix))
    }

    /// Default formatter for `target`.
    pub fn default_formatter(&self, target: OutputTarget) -> Option<&Formatter<R>> {
        self.processor.default_formatters().get(target)
    }

    /// Every default formatter.
    pub fn default_formatters(&self) -> &Formatters<R> {
        self.processor.default_formatters()
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// [`Failure::DuplicateCommand`] when the name is taken; the group is
    /// left unchanged.
    pub fn add_command(&mut self, command: impl Command<R> + 'static) -> Outcome<()> {
        self.processor.register(command)
    }

    /// Checks a batch for names clashing with each other or with the group.
    ///
    /// Every clash is reported in one aggregated failure.
    pub fn validate_all(&self, commands: &[Box<dyn Command<R>>]) -> Outcome<()> {
        let mut seen: HashSet<&CommandName> = HashSet::new();
        let mut failures = Vec::new();
        for command in commands {
            let name = command.name();
            if self.processor.contains(name.as_str()) || !seen.insert(name) {
                failures.push(Failure::DuplicateCommand(name.to_string()));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(Failure::join(failures))
        }
    }

    /// Registers a batch only when [`validate_all`](Self::validate_all) accepts it.
    pub fn add_commands(&mut self, commands: Vec<Box<dyn Command<R>>>) -> Outcome<()> {
        self.validate_all(&commands)?;
        for command in commands {
            self.processor.register_boxed(command)?;
        }
        Ok(())
    }

    /// [`CommandProcessor::process_all`] behind the prefix test.
    pub fn process_all(&self, line: &str) -> Outcome<Vec<ExecutionResult<R>>> {
        if !self.could_be_command(line) {
            debug!(prefix = %self.prefix, "Declined line without prefix");
            return Ok(Vec::new());
        }
        self.processor.process_all(line)
    }

    /// [`CommandProcessor::process_first`] behind the prefix test.
    pub fn process_first(&self, line: &str) -> Outcome<ExecutionResult<R>> {
        if !self.could_be_command(line) {
            return Err(Failure::NoMatch(line.to_string()));
        }
        self.processor.process_first(line)
    }

    /// [`CommandProcessor::process_one`] behind the prefix test.
    pub fn process_one(&self, line: &str) -> Outcome<ExecutionResult<R>> {
        if !self.could_be_command(line) {
            return Err(Failure::NoMatch(line.to_string()));
        }
        self.processor.process_one(line)
    }
}
