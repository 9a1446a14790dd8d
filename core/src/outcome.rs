//! Success/failure outcomes shared by every component.
//!
//! Every operation in this crate reports through [`Outcome`], a plain
//! [`Result`] whose error side is the [`Failure`] vocabulary. Failures are
//! always printable and can be combined with [`Failure::join`] when several
//! sub-operations fail at once (for example, several fields of an object).
//!
//! The only place a panic is turned into an outcome is [`capture_result`],
//! which executors run behind so that a faulting handler surfaces as
//! [`Failure::Panicked`] instead of unwinding through the dispatcher.
//!
//! # Examples
//!
//! ```
//! use command_grammar_core::{Failure, Outcome, fail, succeed};
//!
//! let ok: Outcome<u32> = succeed(3);
//! let bad: Outcome<u32> = fail("not a number");
//!
//! assert_eq!(ok.clone().unwrap_or(0), 3);
//! assert_eq!(bad.clone().unwrap_or(0), 0);
//!
//! let joined = Failure::join([bad.unwrap_err(), Failure::message("too large")]);
//! assert_eq!(joined.to_string(), "not a number; too large");
//! ```

use std::any::Any;
use std::panic::{self, UnwindSafe};

use thiserror::Error;

/// Separator used when several failures are reported together.
pub const FAILURE_SEPARATOR: &str = "; ";

/// Outcome of any engine operation.
pub type Outcome<T> = std::result::Result<T, Failure>;

/// Failure vocabulary of the engine.
///
/// The `Display` impl is the human-readable message surfaced to operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    /// Free-form failure, produced mostly by converters.
    #[error("{0}")]
    Message(String),
    /// No registered command matched the input.
    #[error("no command matched \"{0}\"")]
    NoMatch(String),
    /// Two or more commands matched and passed validation.
    #[error("ambiguous command \"{input}\" matches {}", .candidates.join(", "))]
    AmbiguousMatch {
        /// The input line.
        input: String,
        /// Names of every accepted command.
        candidates: Vec<String>,
    },
    /// A grammar produced a different number of captures than its fields declare.
    #[error(
        "mismatched capture count for \"{template}\": fields declare {expected} captures but the expression has {actual}"
    )]
    MismatchedCaptureCount {
        /// Source template of the grammar.
        template: String,
        /// Captures declared by the referenced fields.
        expected: usize,
        /// Captures present in the compiled expression.
        actual: usize,
    },
    /// A template referenced a field that is not registered.
    #[error("unrecognized property \"{0}\" in template")]
    UnrecognizedField(String),
    /// A validator refused an otherwise successful result.
    #[error("rejected: {0}")]
    Rejected(String),
    /// A command with the same name is already registered.
    #[error("duplicate command name \"{0}\"")]
    DuplicateCommand(String),
    /// Static configuration is unusable.
    #[error("invalid configuration: {0}")]
    Configuration(String),
    /// A thunk run through [`capture_result`] panicked.
    #[error("panicked: {0}")]
    Panicked(String),
    /// Several failures reported at once.
    #[error("{}", join_messages(.0))]
    Aggregate(Vec<Failure>),
}

impl Failure {
    /// Creates a [`Failure::Message`].
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    /// Creates a [`Failure::Rejected`], the failure validators are expected to return.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    /// Creates a [`Failure::Configuration`].
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Combines failures into one.
    ///
    /// Nested aggregates are flattened and a single failure is returned
    /// unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_grammar_core::Failure;
    ///
    /// let one = Failure::join([Failure::message("a")]);
    /// assert_eq!(one, Failure::message("a"));
    ///
    /// let many = Failure::join([Failure::message("a"), Failure::message("b")]);
    /// assert_eq!(many.to_string(), "a; b");
    /// ```
    pub fn join(failures: impl IntoIterator<Item = Failure>) -> Self {
        let mut flat = Vec::new();
        for failure in failures {
            match failure {
                Self::Aggregate(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            flat.remove(0)
        } else {
            Self::Aggregate(flat)
        }
    }

    /// Prefixes the message with `context` (e.g. the field being converted).
    pub fn context(self, context: &str) -> Self {
        Self::Message(format!("{context}: {self}"))
    }

    /// Returns `true` for [`Failure::NoMatch`].
    pub fn is_no_match(&self) -> bool {
        matches!(self, Self::NoMatch(_))
    }
}

fn join_messages(failures: &[Failure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(FAILURE_SEPARATOR)
}

/// Wraps `value` as a successful outcome.
pub fn succeed<T>(value: T) -> Outcome<T> {
    Ok(value)
}

/// Produces a failed outcome carrying `message`.
pub fn fail<T>(message: impl Into<String>) -> Outcome<T> {
    Err(Failure::message(message))
}

/// Runs `thunk`, turning a panic into [`Failure::Panicked`].
///
/// The panic message is carried over when the payload is a string.
///
/// # Examples
///
/// ```
/// use command_grammar_core::{Failure, capture_result};
///
/// let outcome: Result<u32, Failure> = capture_result(|| panic!("boom"));
/// assert_eq!(outcome, Err(Failure::Panicked("boom".to_string())));
///
/// assert_eq!(capture_result(|| Ok::<_, Failure>(7)), Ok(7));
/// ```
pub fn capture_result<T>(thunk: impl FnOnce() -> Outcome<T> + UnwindSafe) -> Outcome<T> {
    panic::catch_unwind(thunk)
        .unwrap_or_else(|payload| Err(Failure::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_flattens_nested_aggregates() {
        let inner = Failure::join([Failure::message("a"), Failure::message("b")]);
        let outer = Failure::join([inner, Failure::message("c")]);

        assert_eq!(
            outer,
            Failure::Aggregate(vec![
                Failure::message("a"),
                Failure::message("b"),
                Failure::message("c"),
            ])
        );
        assert_eq!(outer.to_string(), "a; b; c");
    }

    #[test]
    fn test_ambiguous_message_names_candidates() {
        let failure = Failure::AmbiguousMatch {
            input: "!go".to_string(),
            candidates: vec!["go".to_string(), "goto".to_string()],
        };
        assert_eq!(failure.to_string(), "ambiguous command \"!go\" matches go, goto");
    }

    #[test]
    fn test_context_prefixes_message() {
        let failure = Failure::message("expected a string").context("name");
        assert_eq!(failure.to_string(), "name: expected a string");
    }

    #[test]
    fn test_capture_result_keeps_owned_panic_message() {
        let outcome: Outcome<()> = capture_result(|| panic!("{} failed", "executor"));
        assert_eq!(outcome, Err(Failure::Panicked("executor failed".to_string())));
    }

    #[test]
    fn test_capture_result_passes_failures_through() {
        let outcome: Outcome<()> = capture_result(|| fail("nope"));
        assert_eq!(outcome, Err(Failure::message("nope")));
    }
}
