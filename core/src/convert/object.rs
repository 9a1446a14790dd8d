//! Field projection and object-shape combinators.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use super::{Converter, describe};
use crate::outcome::Failure;

/// Projects the property `name` out of an object and converts it.
///
/// Fails when the input is not an object or the property is absent.
pub fn field<T: 'static>(name: &str, converter: Converter<T>) -> Converter<T> {
    let name = name.to_string();
    Converter::new(move |from| {
        let properties = expect_object(from)?;
        match properties.get(&name) {
            Some(property) => converter
                .convert(property)
                .map_err(|failure| failure.context(&name)),
            None => Err(Failure::message(format!("{name}: field is missing"))),
        }
    })
}

/// Like [`field`], but an absent property succeeds with `None`.
///
/// A non-object input still fails.
pub fn optional_field<T: 'static>(name: &str, converter: Converter<T>) -> Converter<Option<T>> {
    let name = name.to_string();
    Converter::new(move |from| {
        let properties = expect_object(from)?;
        properties
            .get(&name)
            .map(|property| {
                converter
                    .convert(property)
                    .map_err(|failure| failure.context(&name))
            })
            .transpose()
    })
}

/// Ordered set of per-key converters used by [`object`] and [`transform`].
#[derive(Debug, Clone, Default)]
pub struct Shape {
    entries: Vec<(String, Converter<Option<Value>>)>,
}

impl Shape {
    /// Creates an empty shape.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key whose converter always yields a value.
    pub fn field<T: Serialize + 'static>(mut self, key: &str, converter: Converter<T>) -> Self {
        self.entries
            .push((key.to_string(), converter.to_value().some()));
        self
    }

    /// Adds a key whose converter may yield `None`; `None` omits the key.
    pub fn field_some<T: Serialize + 'static>(
        mut self,
        key: &str,
        converter: Converter<Option<T>>,
    ) -> Self {
        let converter = converter.map(|value| {
            value
                .map(|value| {
                    serde_json::to_value(value)
                        .map_err(|err| Failure::message(format!("cannot represent value: {err}")))
                })
                .transpose()
        });
        self.entries.push((key.to_string(), converter));
        self
    }

    /// Number of keys in the shape.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when the shape has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Builds an object by converting each same-named property of the source.
///
/// Keys listed in `optional` may be absent from the source and are then
/// omitted from the result. Every key is attempted before failing, so a
/// failed conversion reports every broken field at once.
///
/// # Examples
///
/// ```
/// use command_grammar_core::convert::{self, Shape};
/// use serde_json::json;
///
/// let shape = Shape::new()
///     .field("a", convert::string())
///     .field("b", convert::number());
/// let converter = convert::object(shape, &["b"]);
///
/// let built = converter.convert(&json!({ "a": "x" })).unwrap();
/// assert_eq!(serde_json::Value::Object(built), json!({ "a": "x" }));
///
/// let failure = converter.convert(&json!({ "a": 1 })).unwrap_err();
/// assert_eq!(failure.to_string(), "a: expected a string, received 1");
/// ```
pub fn object(shape: Shape, optional: &[&str]) -> Converter<Map<String, Value>> {
    let optional: HashSet<&str> = optional.iter().copied().collect();
    let entries = shape
        .entries
        .into_iter()
        .map(|(key, converter)| {
            let projected = if optional.contains(key.as_str()) {
                optional_field(&key, converter).map(|value| Ok(value.flatten()))
            } else {
                field(&key, converter)
            };
            (key, projected)
        })
        .collect();

    let built = transform(Shape { entries });
    Converter::new(move |from| {
        expect_object(from)?;
        built.convert(from)
    })
}

/// Builds an object where each key's converter receives the whole source.
///
/// Source and target shapes may differ; entries are usually built from
/// [`field`]. Keys whose converter yields `None` are omitted; failures are
/// collected across all keys and reported together.
///
/// # Examples
///
/// ```
/// use command_grammar_core::convert::{self, Shape};
/// use serde_json::json;
///
/// let rename = convert::transform(
///     Shape::new()
///         .field("name", convert::field("gym_name", convert::string()))
///         .field_some("zone", convert::optional_field("zone", convert::string())),
/// );
///
/// let built = rename.convert(&json!({ "gym_name": "Fountain" })).unwrap();
/// assert_eq!(serde_json::Value::Object(built), json!({ "name": "Fountain" }));
/// ```
pub fn transform(shape: Shape) -> Converter<Map<String, Value>> {
    let entries = shape.entries;
    Converter::new(move |from| {
        let mut built = Map::new();
        let mut failures = Vec::new();
        for (key, converter) in &entries {
            match converter.convert(from) {
                Ok(Some(value)) => {
                    built.insert(key.clone(), value);
                }
                Ok(None) => {}
                Err(failure) => failures.push(failure),
            }
        }

        if failures.is_empty() {
            Ok(built)
        } else {
            Err(Failure::join(failures))
        }
    })
}

fn expect_object(from: &Value) -> Result<&Map<String, Value>, Failure> {
    from.as_object()
        .ok_or_else(|| Failure::message(format!("expected an object, received {}", describe(from))))
}
