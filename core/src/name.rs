//! Normalized identifiers for fields and commands.
//!
//! Both registries key their entries by these newtypes, so lookups are
//! case-insensitive and surrounding whitespace never creates a second
//! entry.

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::outcome::{Failure, Outcome};

fn normalize(kind: &str, raw: &str) -> Outcome<String> {
    let normalized = raw.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(Failure::configuration(format!("{kind} name cannot be empty")));
    }
    if let Some(bad) = normalized
        .chars()
        .find(|c| !(c.is_alphanumeric() || *c == '_' || *c == '-'))
    {
        return Err(Failure::configuration(format!(
            "{kind} name \"{raw}\" contains invalid character {bad:?}"
        )));
    }
    Ok(normalized)
}

macro_rules! identifier {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Normalizes and validates a ", $kind, " name.")]
            pub fn new(raw: &str) -> Outcome<Self> {
                normalize($kind, raw).map(Self)
            }

            /// Returns the normalized name.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = Failure;

            fn try_from(raw: String) -> Outcome<Self> {
                Self::new(&raw)
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> Self {
                name.0
            }
        }
    };
}

identifier!(
    /// Name of a field descriptor, unique within a [`FieldRegistry`](crate::FieldRegistry).
    ///
    /// # Examples
    ///
    /// ```
    /// use command_grammar_core::FieldName;
    ///
    /// let name = FieldName::new("  Tier ").unwrap();
    /// assert_eq!(name.as_str(), "tier");
    /// assert!(FieldName::new("two words").is_err());
    /// ```
    FieldName,
    "field"
);

identifier!(
    /// Name of a command, unique within a dispatcher.
    CommandName,
    "command"
);
