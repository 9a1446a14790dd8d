//! Composable converters from untyped values to typed outcomes.
//!
//! A [`Converter<T>`] is a pure function from a [`serde_json::Value`] to an
//! [`Outcome<T>`]. Primitive converters ([`string`], [`number`],
//! [`integer`], [`boolean`]) accept a value of the target type and a few
//! canonical string spellings. Combinators build richer converters:
//!
//! - [`Converter::optional`], [`Converter::map`], [`Converter::with_constraint`]
//! - [`one_of`], [`array_of`], [`record_of`] (and their `_some` variants,
//!   which drop elements that convert to `None`)
//! - [`field`], [`optional_field`], [`object`], [`transform`]
//! - [`lookup`], resolving a name through a [`Directory`](crate::directory::Directory)
//!
//! "Undefined" is modelled with `Option`: a converter that may succeed
//! without a value has type `Converter<Option<T>>`, and `Value::Null`
//! handed to [`Converter::optional`] counts as undefined.
//!
//! # Example
//!
//! ```
//! use command_grammar_core::convert::{self, OnError, Shape};
//! use serde::Deserialize;
//! use serde_json::json;
//!
//! #[derive(Debug, Deserialize, PartialEq)]
//! struct Query {
//!     tier: Option<i64>,
//!     words: String,
//! }
//!
//! let query = convert::object(
//!     Shape::new()
//!         .field("tier", convert::integer())
//!         .field("words", convert::string()),
//!     &["tier"],
//! )
//! .into_typed::<Query>();
//!
//! let parsed = query.convert(&json!({ "words": "horned serpent" })).unwrap();
//! assert_eq!(parsed, Query { tier: None, words: "horned serpent".into() });
//!
//! let tiers = convert::array_of(convert::integer(), OnError::FailOnError);
//! assert_eq!(tiers.convert(&json!(["1", 2])).unwrap(), vec![1, 2]);
//! ```

mod collection;
mod object;
mod primitive;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::outcome::{Failure, Outcome};

pub use crate::directory::lookup;
pub use collection::{array_of, array_of_some, one_of, one_of_some, record_of, record_of_some};
pub use object::{Shape, field, object, optional_field, transform};
pub use primitive::{boolean, integer, number, string, value};

/// How a combinator treats failures of the converters it wraps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnError {
    /// Swallow the failure (the element or alternative is skipped).
    IgnoreErrors,
    /// Propagate the failure.
    FailOnError,
}

/// Outcome a constraint predicate may return.
///
/// `bool` yields a generic message when `false`; an [`Outcome`] is used
/// verbatim so predicates can explain themselves.
pub trait ConstraintOutcome {
    /// Turns the predicate result into an outcome.
    fn into_outcome(self) -> Outcome<()>;
}

impl ConstraintOutcome for bool {
    fn into_outcome(self) -> Outcome<()> {
        if self {
            Ok(())
        } else {
            Err(Failure::message("value does not meet constraint"))
        }
    }
}

impl ConstraintOutcome for Outcome<()> {
    fn into_outcome(self) -> Outcome<()> {
        self
    }
}

/// A reusable conversion from an untyped value to `T`.
///
/// Converters are cheap to clone and safe to share across threads.
pub struct Converter<T> {
    inner: Arc<dyn Fn(&Value) -> Outcome<T> + Send + Sync>,
}

impl<T> Clone for Converter<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Converter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: 'static> Converter<T> {
    /// Wraps a conversion function.
    pub fn new(convert: impl Fn(&Value) -> Outcome<T> + Send + Sync + 'static) -> Self {
        Self {
            inner: Arc::new(convert),
        }
    }

    /// Converts `from`.
    pub fn convert(&self, from: &Value) -> Outcome<T> {
        (self.inner)(from)
    }

    /// Makes the converter tolerate undefined input.
    ///
    /// `Value::Null` always succeeds with `None`. An inconvertible value
    /// succeeds with `None` under [`OnError::IgnoreErrors`] and keeps its
    /// failure under [`OnError::FailOnError`].
    ///
    /// # Examples
    ///
    /// ```
    /// use command_grammar_core::convert::{self, OnError};
    /// use serde_json::json;
    ///
    /// let lenient = convert::number().optional(OnError::IgnoreErrors);
    /// assert_eq!(lenient.convert(&json!("abc")).unwrap(), None);
    /// assert_eq!(lenient.convert(&json!(null)).unwrap(), None);
    ///
    /// let strict = convert::number().optional(OnError::FailOnError);
    /// assert!(strict.convert(&json!("abc")).is_err());
    /// assert_eq!(strict.convert(&json!("4")).unwrap(), Some(4.0));
    /// ```
    pub fn optional(self, on_error: OnError) -> Converter<Option<T>> {
        Converter::new(move |from| {
            if from.is_null() {
                return Ok(None);
            }
            match self.convert(from) {
                Ok(value) => Ok(Some(value)),
                Err(_) if on_error == OnError::IgnoreErrors => Ok(None),
                Err(failure) => Err(failure),
            }
        })
    }

    /// Feeds a successful value to `mapper`; failures short-circuit.
    pub fn map<U: 'static>(
        self,
        mapper: impl Fn(T) -> Outcome<U> + Send + Sync + 'static,
    ) -> Converter<U> {
        Converter::new(move |from| self.convert(from).and_then(&mapper))
    }

    /// Checks a successful value against `predicate`.
    ///
    /// The predicate is never invoked on a failed conversion.
    ///
    /// # Examples
    ///
    /// ```
    /// use command_grammar_core::{Failure, convert};
    /// use serde_json::json;
    ///
    /// let positive = convert::number().with_constraint(|n: &f64| *n > 0.0);
    /// assert!(positive.convert(&json!(-1)).is_err());
    ///
    /// let tier = convert::integer().with_constraint(|n: &i64| {
    ///     if (1..=6).contains(n) {
    ///         Ok(())
    ///     } else {
    ///         Err(Failure::message(format!("tier {n} is out of range")))
    ///     }
    /// });
    /// assert_eq!(tier.convert(&json!(9)).unwrap_err().to_string(), "tier 9 is out of range");
    /// ```
    pub fn with_constraint<C: ConstraintOutcome>(
        self,
        predicate: impl Fn(&T) -> C + Send + Sync + 'static,
    ) -> Converter<T> {
        Converter::new(move |from| {
            let value = self.convert(from)?;
            predicate(&value).into_outcome()?;
            Ok(value)
        })
    }

    /// Wraps every success in `Some`, for the combinators that skip `None`.
    pub fn some(self) -> Converter<Option<T>> {
        self.map(|value| Ok(Some(value)))
    }
}

impl<T: Serialize + 'static> Converter<T> {
    /// Re-expresses the converted value as untyped JSON.
    pub fn to_value(self) -> Converter<Value> {
        self.map(|value| {
            serde_json::to_value(value)
                .map_err(|err| Failure::message(format!("cannot represent value: {err}")))
        })
    }
}

impl Converter<Map<String, Value>> {
    /// Deserializes the built structure into a typed value.
    pub fn into_typed<U: DeserializeOwned + 'static>(self) -> Converter<U> {
        self.map(|map| {
            serde_json::from_value(Value::Object(map))
                .map_err(|err| Failure::message(format!("cannot build typed value: {err}")))
        })
    }
}

/// Renders a value for failure messages.
pub(crate) fn describe(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<unprintable>".to_string())
}
