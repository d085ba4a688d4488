// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Collection Snapshot
 * Ordered client-side mirror of server-pushed collections
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

use super::message::Message;

/// One synchronized document
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry("_id", &self.id)?;
        for (key, value) in &self.fields {
            if key != "_id" {
                map.serialize_entry(key, value)?;
            }
        }
        map.end()
    }
}

/// Collection name to ordered documents.
///
/// Invariant: within one collection a document id appears at most once.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CollectionSnapshot {
    collections: BTreeMap<String, Vec<Document>>,
}

impl CollectionSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.collections.values().all(Vec::is_empty)
    }

    pub fn clear(&mut self) {
        self.collections.clear();
    }

    pub fn collection(&self, name: &str) -> Option<&[Document]> {
        self.collections.get(name).map(Vec::as_slice)
    }

    pub fn collection_names(&self) -> impl Iterator<Item = &str> {
        self.collections.keys().map(String::as_str)
    }

    /// Apply a collection push. Returns true if the message was a push.
    pub fn apply(&mut self, message: &Message) -> bool {
        match message {
            Message::Added {
                collection,
                id,
                fields,
            } => {
                let docs = self.collections.entry(collection.clone()).or_default();
                let doc = Document {
                    id: id.clone(),
                    fields: fields.clone().unwrap_or_default(),
                };
                match position(docs, id) {
                    Some(index) => docs[index] = doc,
                    None => docs.push(doc),
                }
            }
            Message::Changed {
                collection,
                id,
                fields,
                cleared,
            } => {
                let Some(docs) = self.collections.get_mut(collection) else {
                    trace!("[DDP] changed for unknown collection {}", collection);
                    return true;
                };
                if let Some(index) = position(docs, id) {
                    let doc = &mut docs[index];
                    if let Some(fields) = fields {
                        for (key, value) in fields {
                            doc.fields.insert(key.clone(), value.clone());
                        }
                    }
                    for key in cleared.iter().flatten() {
                        doc.fields.remove(key);
                    }
                }
            }
            Message::Removed { collection, id } => {
                if let Some(docs) = self.collections.get_mut(collection) {
                    docs.retain(|d| &d.id != id);
                }
            }
            Message::AddedBefore {
                collection,
                id,
                fields,
                before,
            } => {
                let docs = self.collections.entry(collection.clone()).or_default();
                docs.retain(|d| &d.id != id);
                let doc = Document {
                    id: id.clone(),
                    fields: fields.clone().unwrap_or_default(),
                };
                insert_before(docs, doc, before.as_deref());
            }
            Message::MovedBefore {
                collection,
                id,
                before,
            } => {
                let Some(docs) = self.collections.get_mut(collection) else {
                    return true;
                };
                if let Some(index) = position(docs, id) {
                    let doc = docs.remove(index);
                    insert_before(docs, doc, before.as_deref());
                }
            }
            _ => return false,
        }
        true
    }
}

fn position(docs: &[Document], id: &str) -> Option<usize> {
    docs.iter().position(|d| d.id == id)
}

/// Insert immediately before `before`; a missing or unknown reference appends.
fn insert_before(docs: &mut Vec<Document>, doc: Document, before: Option<&str>) {
    match before.and_then(|b| position(docs, b)) {
        Some(index) => docs.insert(index, doc),
        None => docs.push(doc),
    }
}
