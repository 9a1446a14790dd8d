//! Flat command processor with three match policies.
//!
//! Every evaluation walks a command through
//! `match -> convert -> execute -> validate`. A command whose grammar does
//! not match is skipped; conversion and execution failures abort the
//! evaluation; validator rejections are filtered out and only surface when
//! no sibling command was accepted.
//!
//! - [`CommandProcessor::process_all`] returns every accepted result.
//! - [`CommandProcessor::process_first`] returns the first accepted result.
//! - [`CommandProcessor::process_one`] requires exactly one accepted result
//!   and reports [`Failure::AmbiguousMatch`] otherwise.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::{debug, warn};

use crate::command::{Command, ExecutionResult, Formatters, OutputTarget};
use crate::name::CommandName;
use crate::outcome::{Failure, Outcome};

/// Post-execution check applied to every successful result.
pub type Validator<R> = Arc<dyn Fn(R) -> Outcome<R> + Send + Sync>;

enum Evaluation<R> {
    NotMatched,
    Accepted(ExecutionResult<R>),
    Rejected(Failure),
}

/// Ordered, name-unique set of commands evaluated against input lines.
///
/// Build the processor once, then share it read-only; evaluation never
/// mutates it.
pub struct CommandProcessor<R> {
    commands: IndexMap<CommandName, Box<dyn Command<R>>>,
    validator: Option<Validator<R>>,
    target: OutputTarget,
    default_formatters: Formatters<R>,
}

impl<R: 'static> CommandProcessor<R> {
    /// Creates an empty processor rendering plain text.
    pub fn new() -> Self {
        Self {
            commands: IndexMap::new(),
            validator: None,
            target: OutputTarget::Text,
            default_formatters: Formatters::new(),
        }
    }

    /// Builds a processor from a fixed command list.
    ///
    /// # Errors
    ///
    /// [`Failure::Configuration`] when two commands share a name.
    pub fn from_commands(commands: impl IntoIterator<Item = Box<dyn Command<R>>>) -> Outcome<Self> {
        let mut processor = Self::new();
        for command in commands {
            processor.register_boxed(command).map_err(|failure| match failure {
                Failure::DuplicateCommand(name) => {
                    Failure::configuration(format!("command \"{name}\" is defined twice"))
                }
                other => other,
            })?;
        }
        Ok(processor)
    }

    /// Sets the validator applied to every executed result.
    pub fn with_validator(
        mut self,
        validator: impl Fn(R) -> Outcome<R> + Send + Sync + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    /// Sets the output target used to render messages.
    pub fn with_target(mut self, target: OutputTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets fallback formatters for commands lacking one for the target.
    pub fn with_default_formatters(mut self, formatters: Formatters<R>) -> Self {
        self.default_formatters = formatters;
        self
    }

    /// Output target used to render messages.
    pub fn target(&self) -> OutputTarget {
        self.target
    }

    /// Changes the output target.
    pub fn set_target(&mut self, target: OutputTarget) {
        self.target = target;
    }

    /// Fallback formatters.
    pub fn default_formatters(&self) -> &Formatters<R> {
        &self.default_formatters
    }

    /// Mutable access to the fallback formatters.
    pub fn default_formatters_mut(&mut self) -> &mut Formatters<R> {
        &mut self.default_formatters
    }

    /// Registers a command.
    ///
    /// # Errors
    ///
    /// [`Failure::DuplicateCommand`] when the name is taken; the table is
    /// left unchanged.
    pub fn register(&mut self, command: impl Command<R> + 'static) -> Outcome<()> {
        self.register_boxed(Box::new(command))
    }

    /// Registers an already boxed command.
    pub fn register_boxed(&mut self, command: Box<dyn Command<R>>) -> Outcome<()> {
        let name = command.name().clone();
        if self.commands.contains_key(&name) {
            warn!(command = %name, "Refusing duplicate command registration");
            return Err(Failure::DuplicateCommand(name.to_string()));
        }
        debug!(command = %name, expression = command.grammar().expression(), "Registered command");
        self.commands.insert(name, command);
        Ok(())
    }

    /// Returns `true` when a command named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.commands
            .contains_key(name.trim().to_lowercase().as_str())
    }

    /// Looks a command up by name.
    pub fn get(&self, name: &str) -> Option<&dyn Command<R>> {
        self.commands
            .get(name.trim().to_lowercase().as_str())
            .map(|command| command.as_ref())
    }

    /// Registered commands in registration order.
    pub fn commands(&self) -> impl Iterator<Item = &dyn Command<R>> {
        self.commands.values().map(|command| command.as_ref())
    }

    /// Number of registered commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns `true` when no command is registered.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Evaluates every command and returns all accepted results.
    ///
    /// Lines matching nothing produce an empty list.
    ///
    /// # Errors
    ///
    /// The first conversion or execution failure of a matching command, or
    /// the last validator rejection when every matching command was rejected.
    pub fn process_all(&self, line: &str) -> Outcome<Vec<ExecutionResult<R>>> {
        let mut accepted = Vec::new();
        let mut last_rejection = None;

        for command in self.commands.values() {
            match self.evaluate(command.as_ref(), line)? {
                Evaluation::NotMatched => {}
                Evaluation::Accepted(result) => accepted.push(result),
                Evaluation::Rejected(failure) => last_rejection = Some(failure),
            }
        }

        match last_rejection {
            Some(failure) if accepted.is_empty() => Err(failure),
            _ => Ok(accepted),
        }
    }

    /// Returns the first accepted result in registration order.
    ///
    /// # Errors
    ///
    /// Conversion and execution failures abort immediately. When matching
    /// commands were all rejected the last rejection is returned, and
    /// [`Failure::NoMatch`] when nothing matched.
    pub fn process_first(&self, line: &str) -> Outcome<ExecutionResult<R>> {
        let mut last_rejection = None;

        for command in self.commands.values() {
            match self.evaluate(command.as_ref(), line)? {
                Evaluation::NotMatched => {}
                Evaluation::Accepted(result) => return Ok(result),
                Evaluation::Rejected(failure) => last_rejection = Some(failure),
            }
        }

        Err(last_rejection.unwrap_or_else(|| Failure::NoMatch(line.to_string())))
    }

    /// Requires exactly one accepted result.
    ///
    /// Several syntactic matches are fine as long as the validator narrows
    /// them down to one.
    ///
    /// # Errors
    ///
    /// [`Failure::AmbiguousMatch`] naming every accepted command when more
    /// than one is accepted, [`Failure::NoMatch`] when none matched, plus
    /// the failures of [`process_all`](Self::process_all).
    pub fn process_one(&self, line: &str) -> Outcome<ExecutionResult<R>> {
        let mut accepted = self.process_all(line)?;
        match accepted.len() {
            0 => Err(Failure::NoMatch(line.to_string())),
            1 => Ok(accepted.remove(0)),
            _ => {
                let candidates: Vec<String> = accepted
                    .iter()
                    .map(|result| result.command.to_string())
                    .collect();
                debug!(line, candidates = ?candidates, "Ambiguous command");
                Err(Failure::AmbiguousMatch {
                    input: line.to_string(),
                    candidates,
                })
            }
        }
    }

    fn evaluate(&self, command: &dyn Command<R>, line: &str) -> Outcome<Evaluation<R>> {
        let fields = match command.grammar().parse(line) {
            Ok(Some(fields)) => fields,
            Ok(None) => return Ok(Evaluation::NotMatched),
            Err(failure) => {
                warn!(command = %command.name(), error = %failure, "Grammar is unusable");
                return Err(failure);
            }
        };
        debug!(command = %command.name(), "Matched");

        let result = command.evaluate(&fields).inspect_err(|failure| {
            debug!(command = %command.name(), error = %failure, "Evaluation failed");
        })?;

        let result = match &self.validator {
            Some(validator) => match validator(result) {
                Ok(result) => result,
                Err(failure) => {
                    debug!(command = %command.name(), error = %failure, "Rejected by validator");
                    return Ok(Evaluation::Rejected(failure));
                }
            },
            None => result,
        };

        let message = self.render(command, &result);
        Ok(Evaluation::Accepted(ExecutionResult {
            command: command.name().clone(),
            result,
            message,
        }))
    }

    /// Target-specific formatters win over plain-text ones, and a
    /// command's own formatter wins over a default at the same level.
    fn render(&self, command: &dyn Command<R>, result: &R) -> String {
        command
            .format(result, self.target)
            .or_else(|| self.default_formatters.render(result, self.target))
            .or_else(|| command.format(result, OutputTarget::Text))
            .or_else(|| self.default_formatters.render(result, OutputTarget::Text))
            .unwrap_or_default()
    }
}

impl<R: 'static> Default for CommandProcessor<R> {
    fn default() -> Self {
        Self::new()
    }
}
