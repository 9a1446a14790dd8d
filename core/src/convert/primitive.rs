//! Primitive converters.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use super::{Converter, describe};
use crate::outcome::Failure;

static CANONICAL_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?$").expect("static regex must compile")
});

static CANONICAL_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?\d+$").expect("static regex must compile"));

/// Accepts strings only.
pub fn string() -> Converter<String> {
    Converter::new(|from| match from {
        Value::String(s) => Ok(s.clone()),
        other => Err(rejected("a string", other)),
    })
}

/// Accepts numbers and strings spelling a number (e.g. `"10"`, `"-2.5"`, `"1e3"`).
pub fn number() -> Converter<f64> {
    Converter::new(|from| match from {
        Value::Number(n) => n.as_f64().ok_or_else(|| rejected("a number", from)),
        Value::String(s) if CANONICAL_NUMBER.is_match(s) => s
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| rejected("a number", from)),
        other => Err(rejected("a number", other)),
    })
}

/// Accepts whole numbers and strings of decimal digits.
pub fn integer() -> Converter<i64> {
    Converter::new(|from| match from {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| rejected("an integer", from)),
        Value::String(s) if CANONICAL_INTEGER.is_match(s) => {
            s.parse::<i64>().map_err(|_| rejected("an integer", from))
        }
        other => Err(rejected("an integer", other)),
    })
}

/// Accepts booleans and case-insensitive `"true"`/`"false"`.
pub fn boolean() -> Converter<bool> {
    Converter::new(|from| match from {
        Value::Bool(b) => Ok(*b),
        Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
        Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
        other => Err(rejected("a boolean", other)),
    })
}

/// Passes any value through unchanged.
pub fn value() -> Converter<Value> {
    Converter::new(|from| Ok(from.clone()))
}

fn rejected(expected: &str, from: &Value) -> Failure {
    Failure::message(format!("expected {expected}, received {}", describe(from)))
}
