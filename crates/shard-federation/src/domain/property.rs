//! # Property Access
//!
//! Structural access to fields of result objects. A `PropertyPath` is parsed
//! once when a query is built; resolving it walks a chain of named-field
//! lookups through the `PropertySource` capability.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::FederationError;
use super::value_objects::{Record, Value};

/// Result of looking up one field.
pub enum Property<'a> {
    /// A terminal value.
    Value(Value),
    /// A nested object that further segments can descend into.
    Nested(&'a dyn PropertySource),
}

/// Capability implemented by every result type the exit pipeline handles.
pub trait PropertySource {
    /// Look up a single named field.
    fn property(&self, name: &str) -> Option<Property<'_>>;

    /// Whole-object value, used when a path ends on a nested object.
    fn to_value(&self) -> Value {
        Value::Null
    }
}

impl PropertySource for Record {
    fn property(&self, name: &str) -> Option<Property<'_>> {
        self.get(name).map(|value| match value {
            Value::Record(nested) => Property::Nested(nested),
            other => Property::Value(other.clone()),
        })
    }

    fn to_value(&self) -> Value {
        Value::Record(self.clone())
    }
}

impl PropertySource for Value {
    fn property(&self, name: &str) -> Option<Property<'_>> {
        match self {
            Value::Record(record) => record.property(name),
            _ => None,
        }
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

/// Dotted chain of field names, e.g. `inner.value`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PropertyPath {
    segments: Vec<String>,
}

impl PropertyPath {
    /// Parse a dotted path. Empty paths and empty segments are rejected.
    pub fn parse(path: &str) -> Result<Self, FederationError> {
        let segments: Vec<String> = path.split('.').map(str::trim).map(String::from).collect();
        if segments.iter().any(String::is_empty) {
            return Err(FederationError::InvalidPropertyPath(path.to_string()));
        }
        Ok(Self { segments })
    }

    /// Path segments in lookup order.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Resolve the path against an object. Missing fields, and intermediate
    /// segments that are not nested objects, resolve to `Null`.
    pub fn resolve<T: PropertySource>(&self, source: &T) -> Value {
        resolve_segments(source, &self.segments)
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl TryFrom<String> for PropertyPath {
    type Error = FederationError;

    fn try_from(path: String) -> Result<Self, Self::Error> {
        Self::parse(&path)
    }
}

impl From<PropertyPath> for String {
    fn from(path: PropertyPath) -> Self {
        path.to_string()
    }
}

fn resolve_segments(source: &dyn PropertySource, segments: &[String]) -> Value {
    let Some((head, rest)) = segments.split_first() else {
        return source.to_value();
    };
    match source.property(head) {
        Some(Property::Nested(nested)) => resolve_segments(nested, rest),
        Some(Property::Value(value)) if rest.is_empty() => value,
        _ => Value::Null,
    }
}
