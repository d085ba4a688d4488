// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Type Descriptors
 * Structural shape of a JSON value, compared by kind rather than content
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Primitive kind of a JSON value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Object,
    Null,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Object => "object",
            ValueKind::Null => "null",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structural shape of a value: a kind for scalars, element shapes for
/// arrays, key-sorted field shapes for objects.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum TypeDescriptor {
    Scalar(ValueKind),
    Array(Vec<TypeDescriptor>),
    Object(BTreeMap<String, TypeDescriptor>),
}

pub fn type_descriptor(value: &Value) -> TypeDescriptor {
    match value {
        Value::Null => TypeDescriptor::Scalar(ValueKind::Null),
        Value::Bool(_) => TypeDescriptor::Scalar(ValueKind::Boolean),
        Value::Number(_) => TypeDescriptor::Scalar(ValueKind::Number),
        Value::String(_) => TypeDescriptor::Scalar(ValueKind::String),
        Value::Array(items) => TypeDescriptor::Array(items.iter().map(type_descriptor).collect()),
        Value::Object(fields) => TypeDescriptor::Object(
            fields
                .iter()
                .map(|(key, value)| (key.clone(), type_descriptor(value)))
                .collect(),
        ),
    }
}

/// Two values are type-equal iff their descriptors are deeply equal
pub fn types_equal(a: &Value, b: &Value) -> bool {
    type_descriptor(a) == type_descriptor(b)
}
