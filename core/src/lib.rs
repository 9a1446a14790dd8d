//! Declarative command grammars with typed conversion and dispatch.
//!
//! This crate turns one-line text commands into typed, executed results:
//!
//! - [`Failure`] / [`Outcome`]: the result algebra shared by every stage.
//! - [`convert`]: composable converters from untyped
//!   [`serde_json::Value`]s to typed values.
//! - [`FieldRegistry`], [`Template`], [`Grammar`]: field fragments and
//!   whitespace-separated templates compiled into one anchored expression
//!   that extracts named fields.
//! - [`CommandDefinition`], [`CommandProcessor`], [`CommandGroup`]:
//!   commands pairing a grammar with a converter, an executor and
//!   per-target formatters, dispatched under `all`, `first` or `one`
//!   policies.
//! - [`GrammarConfig`]: field registries and templates loaded from YAML.
//!
//! # Example
//!
//! ```
//! use command_grammar_core::convert::{self, Shape};
//! use command_grammar_core::*;
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct Lookup {
//!     tier: Option<i64>,
//!     words: String,
//! }
//!
//! let registry = FieldRegistry::from_descriptors([
//!     FieldDescriptor::new("tier", r"[Tt]?(\d)")?.optional().with_embedded_captures(1),
//!     FieldDescriptor::new("words", r".+")?,
//! ])?;
//!
//! let beast = CommandDefinition::builder("beast")
//!     .description("Look a beast up, optionally by tier")
//!     .template("!beast {{tier?}} {{words}}", &registry, GrammarOptions::default())
//!     .converter(
//!         convert::object(
//!             Shape::new()
//!                 .field("tier", convert::integer())
//!                 .field("words", convert::string()),
//!             &["tier"],
//!         )
//!         .into_typed::<Lookup>(),
//!     )
//!     .executor(|lookup: Lookup| match lookup.tier {
//!         Some(tier) => Ok(format!("{} (tier {tier})", lookup.words)),
//!         None => Ok(lookup.words),
//!     })
//!     .formatter(OutputTarget::Markdown, |found: &String| format!("**{found}**"))
//!     .build()?;
//!
//! let mut processor = CommandProcessor::new().with_target(OutputTarget::Markdown);
//! processor.register(beast)?;
//!
//! let executed = processor.process_one("!beast T5 horned serpent")?;
//! assert_eq!(executed.result, "horned serpent (tier 5)");
//! assert_eq!(executed.message, "**horned serpent (tier 5)**");
//!
//! assert!(processor.process_one("!raid now").unwrap_err().is_no_match());
//! # Ok::<(), Failure>(())
//! ```

mod command;
mod config;
pub mod convert;
pub mod directory;
mod error;
mod field;
mod grammar;
mod group;
mod name;
mod outcome;
mod processor;
mod template;

pub use command::{
    Command, CommandBuilder, CommandDefinition, ExecutionResult, Executor, Formatter, Formatters,
    OutputTarget,
};
pub use config::GrammarConfig;
pub use directory::{Directory, Scored, StaticDirectory};
pub use error::ConfigError;
pub use field::{FieldDescriptor, FieldRegistry};
pub use grammar::{CaptureSlot, Grammar, GrammarOptions, ParsedFields, UnknownFieldPolicy};
pub use group::CommandGroup;
pub use name::{CommandName, FieldName};
pub use outcome::{FAILURE_SEPARATOR, Failure, Outcome, capture_result, fail, succeed};
pub use processor::{CommandProcessor, Validator};
pub use template::{Template, TemplateToken};
