//! Alternation, array and record combinators.

use indexmap::IndexMap;
use serde_json::Value;

use super::{Converter, OnError, describe};
use crate::outcome::{FAILURE_SEPARATOR, Failure};

/// Tries each converter in order; the first success wins.
///
/// See [`one_of_some`] for the failure policy.
///
/// # Examples
///
/// ```
/// use command_grammar_core::convert::{self, OnError};
/// use serde_json::json;
///
/// let number_or_text = convert::one_of(
///     vec![convert::number().to_value(), convert::string().to_value()],
///     OnError::IgnoreErrors,
/// );
/// assert_eq!(number_or_text.convert(&json!("10")).unwrap(), json!(10.0));
/// assert_eq!(number_or_text.convert(&json!("ten")).unwrap(), json!("ten"));
///
/// let failure = number_or_text.convert(&json!(true)).unwrap_err();
/// assert!(failure.to_string().starts_with("no matching decoder"));
/// ```
pub fn one_of<T: 'static>(converters: Vec<Converter<T>>, on_error: OnError) -> Converter<T> {
    one_of_some(
        converters.into_iter().map(Converter::some).collect(),
        on_error,
    )
}

/// Tries each converter in order; the first success that is `Some` wins.
///
/// With [`OnError::IgnoreErrors`] failures are collected and the scan goes
/// on; when nothing produced a value the collected messages are reported.
/// With [`OnError::FailOnError`] the first failure aborts the scan.
pub fn one_of_some<T: 'static>(
    converters: Vec<Converter<Option<T>>>,
    on_error: OnError,
) -> Converter<T> {
    Converter::new(move |from| {
        let mut failures = Vec::new();
        for converter in &converters {
            match converter.convert(from) {
                Ok(Some(value)) => return Ok(value),
                Ok(None) => {}
                Err(failure) if on_error == OnError::FailOnError => return Err(failure),
                Err(failure) => failures.push(failure.to_string()),
            }
        }
        let mut message = format!("no matching decoder for {}", describe(from));
        if !failures.is_empty() {
            message.push_str(": ");
            message.push_str(&failures.join(FAILURE_SEPARATOR));
        }
        Err(Failure::Message(message))
    })
}

/// Converts every element of an array.
///
/// See [`array_of_some`] for the failure policy.
pub fn array_of<T: 'static>(item: Converter<T>, on_error: OnError) -> Converter<Vec<T>> {
    array_of_some(item.some(), on_error)
}

/// Converts every element of an array, dropping elements that convert to `None`.
///
/// With [`OnError::FailOnError`] any failing element fails the whole
/// conversion, reporting every failing index. With
/// [`OnError::IgnoreErrors`] failing elements are dropped.
///
/// # Examples
///
/// ```
/// use command_grammar_core::convert::{self, OnError};
/// use serde_json::json;
///
/// let lenient = convert::array_of(convert::integer(), OnError::IgnoreErrors);
/// assert_eq!(lenient.convert(&json!([1, "x", "3"])).unwrap(), vec![1, 3]);
///
/// let strict = convert::array_of(convert::integer(), OnError::FailOnError);
/// assert_eq!(
///     strict.convert(&json!([1, "x", true])).unwrap_err().to_string(),
///     "[1]: expected an integer, received \"x\"; [2]: expected an integer, received true"
/// );
/// ```
pub fn array_of_some<T: 'static>(
    item: Converter<Option<T>>,
    on_error: OnError,
) -> Converter<Vec<T>> {
    Converter::new(move |from| {
        let Value::Array(elements) = from else {
            return Err(Failure::message(format!(
                "expected an array, received {}",
                describe(from)
            )));
        };

        let mut converted = Vec::with_capacity(elements.len());
        let mut failures = Vec::new();
        for (index, element) in elements.iter().enumerate() {
            match item.convert(element) {
                Ok(Some(value)) => converted.push(value),
                Ok(None) => {}
                Err(failure) => failures.push(failure.context(&format!("[{index}]"))),
            }
        }

        if on_error == OnError::FailOnError && !failures.is_empty() {
            return Err(Failure::join(failures));
        }
        Ok(converted)
    })
}

/// Converts every property of a keyed record.
///
/// See [`record_of_some`] for the failure policy.
pub fn record_of<T: 'static>(
    item: Converter<T>,
    on_error: OnError,
) -> Converter<IndexMap<String, T>> {
    record_of_some(item.some(), on_error)
}

/// Converts every property of a keyed record, dropping properties that convert to `None`.
///
/// The input must be a JSON object (arrays are rejected). Failure policy
/// matches [`array_of_some`], applied per key.
pub fn record_of_some<T: 'static>(
    item: Converter<Option<T>>,
    on_error: OnError,
) -> Converter<IndexMap<String, T>> {
    Converter::new(move |from| {
        let Value::Object(properties) = from else {
            return Err(Failure::message(format!(
                "expected a record, received {}",
                describe(from)
            )));
        };

        let mut converted = IndexMap::with_capacity(properties.len());
        let mut failures = Vec::new();
        for (key, property) in properties {
            match item.convert(property) {
                Ok(Some(value)) => {
                    converted.insert(key.clone(), value);
                }
                Ok(None) => {}
                Err(failure) => failures.push(failure.context(key)),
            }
        }

        if on_error == OnError::FailOnError && !failures.is_empty() {
            return Err(Failure::join(failures));
        }
        Ok(converted)
    })
}
