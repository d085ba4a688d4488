// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Type Confusion Derivation
 * Access paths and replacement kinds derived from a parameter shape
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;

use super::descriptor::{TypeDescriptor, ValueKind};
use crate::errors::ConfuserError;

/// Replacement kinds offered in place of a scalar
pub const REPLACEMENT_KINDS: [ValueKind; 4] = [
    ValueKind::String,
    ValueKind::Number,
    ValueKind::Boolean,
    ValueKind::Object,
];

/// Replacement kinds offered in place of a whole array or object
pub const SCALAR_KINDS: [ValueKind; 3] = [ValueKind::String, ValueKind::Number, ValueKind::Boolean];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Index(index) => write!(f, "{}", index),
            PathSegment::Key(key) => f.write_str(key),
        }
    }
}

/// Route from the parameter list to one value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AccessPath(pub Vec<PathSegment>);

impl AccessPath {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    fn prepended(mut self, head: PathSegment) -> Self {
        self.0.insert(0, head);
        self
    }
}

/// Dotted form, e.g. `0.user.2`
impl fmt::Display for AccessPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

/// A path plus the kinds to try there
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Confuser {
    pub path: AccessPath,
    pub candidates: Vec<ValueKind>,
}

/// Name of the control probe that sends the template unchanged
pub const BASELINE_PROBE: &str = "baseline";

/// One (path, kind) substitution. A probe without a kind is the
/// unmodified control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfuserProbe {
    pub name: String,
    pub path: AccessPath,
    pub kind: Option<ValueKind>,
}

impl ConfuserProbe {
    /// Control probe: the template as captured, for a reference reply
    pub fn baseline() -> Self {
        Self {
            name: BASELINE_PROBE.to_string(),
            path: AccessPath::default(),
            kind: None,
        }
    }

    pub fn is_baseline(&self) -> bool {
        self.kind.is_none()
    }
}

/// Every substitution point of a descriptor. The empty path (the whole
/// parameter list) is dropped at the top level only.
pub fn derive_confusers(descriptor: &TypeDescriptor) -> Vec<Confuser> {
    derive(descriptor)
        .into_iter()
        .filter(|c| !c.path.is_empty())
        .collect()
}

fn derive(descriptor: &TypeDescriptor) -> Vec<Confuser> {
    match descriptor {
        TypeDescriptor::Scalar(kind) => vec![Confuser {
            path: AccessPath::default(),
            candidates: REPLACEMENT_KINDS
                .iter()
                .copied()
                .filter(|k| k != kind)
                .collect(),
        }],
        TypeDescriptor::Array(items) => {
            let children = items
                .iter()
                .enumerate()
                .map(|(index, child)| (PathSegment::Index(index), child));
            derive_container(children)
        }
        TypeDescriptor::Object(fields) => {
            let children = fields
                .iter()
                .map(|(key, child)| (PathSegment::Key(key.clone()), child));
            derive_container(children)
        }
    }
}

fn derive_container<'a>(
    children: impl Iterator<Item = (PathSegment, &'a TypeDescriptor)>,
) -> Vec<Confuser> {
    let mut confusers = Vec::new();
    for (segment, child) in children {
        confusers.extend(derive(child).into_iter().map(|c| Confuser {
            path: c.path.prepended(segment.clone()),
            candidates: c.candidates,
        }));
    }
    confusers.push(Confuser {
        path: AccessPath::default(),
        candidates: SCALAR_KINDS.to_vec(),
    });
    confusers
}

/// One probe per (path, candidate kind), named `<dotted path>-<kind>`
pub fn instantiate_probes(confusers: &[Confuser]) -> Vec<ConfuserProbe> {
    confusers
        .iter()
        .flat_map(|confuser| {
            confuser.candidates.iter().map(move |kind| ConfuserProbe {
                name: format!("{}-{}", confuser.path, kind),
                path: confuser.path.clone(),
                kind: Some(*kind),
            })
        })
        .collect()
}

/// Fixed representative value for a kind
pub fn sample_value(kind: ValueKind) -> Value {
    match kind {
        ValueKind::String => json!("helloworld"),
        ValueKind::Number => json!(5),
        ValueKind::Boolean => json!(true),
        ValueKind::Object => json!({"key": "value"}),
        ValueKind::Null => Value::Null,
    }
}

/// Copy of `params` with the value at the probe's path replaced by the
/// sample for its kind. The baseline probe returns the copy untouched.
pub fn apply_probe(params: &[Value], probe: &ConfuserProbe) -> Result<Vec<Value>, ConfuserError> {
    let Some(kind) = probe.kind else {
        return Ok(params.to_vec());
    };
    let Some((last, parents)) = probe.path.segments().split_last() else {
        return Err(ConfuserError::EmptyPath);
    };
    let invalid = || ConfuserError::InvalidPath {
        path: probe.path.to_string(),
    };

    let mut tree = Value::Array(params.to_vec());
    let mut cursor = &mut tree;
    for segment in parents {
        cursor = match (segment, cursor) {
            (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index).ok_or_else(invalid)?,
            (PathSegment::Key(key), Value::Object(fields)) => fields.get_mut(key).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
    }

    let slot = match (last, cursor) {
        (PathSegment::Index(index), Value::Array(items)) => items.get_mut(*index),
        (PathSegment::Key(key), Value::Object(fields)) => fields.get_mut(key),
        _ => None,
    }
    .ok_or_else(invalid)?;
    *slot = sample_value(kind);

    match tree {
        Value::Array(items) => Ok(items),
        _ => Err(invalid()),
    }
}
