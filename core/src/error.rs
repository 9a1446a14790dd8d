//! Error type for grammar configuration files.

use thiserror::Error;

use crate::outcome::Failure;

/// Errors raised while loading, saving or applying a [`GrammarConfig`](crate::GrammarConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The file parsed but describes an unusable grammar.
    #[error("invalid grammar configuration: {0}")]
    Invalid(#[from] Failure),
}

/// Convenience alias for results with [`ConfigError`].
pub type Result<T> = std::result::Result<T, ConfigError>;
