// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DDP Message Model
 * Closed tagged union over every DDP message kind
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// One DDP message. The `msg` field on the wire selects the variant.
///
/// Optional reply payloads (`result`, `error`, `randomSeed`,
/// `offendingMessage`) distinguish an explicit `null` from an absent field
/// so a decoded message re-encodes to the same document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg", rename_all = "camelCase")]
pub enum Message {
    Connect {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session: Option<String>,
        version: String,
        #[serde(default)]
        support: Vec<String>,
    },
    Connected {
        session: String,
    },
    Failed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        version: Option<String>,
    },
    Ping {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Pong {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Method {
        id: String,
        method: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Vec<Value>>,
        #[serde(
            rename = "randomSeed",
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        random_seed: Option<Value>,
    },
    Sub {
        id: String,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Vec<Value>>,
    },
    Unsub {
        id: String,
    },
    Nosub {
        id: String,
        #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
    },
    Result {
        id: String,
        #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
        error: Option<Value>,
        #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
        result: Option<Value>,
    },
    Updated {
        #[serde(default)]
        methods: Vec<String>,
    },
    Ready {
        #[serde(default)]
        subs: Vec<String>,
    },
    Added {
        collection: String,
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Map<String, Value>>,
    },
    Changed {
        collection: String,
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cleared: Option<Vec<String>>,
    },
    Removed {
        collection: String,
        id: String,
    },
    AddedBefore {
        collection: String,
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fields: Option<Map<String, Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<String>,
    },
    MovedBefore {
        collection: String,
        id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        before: Option<String>,
    },
    Error {
        #[serde(default)]
        reason: String,
        #[serde(
            rename = "offendingMessage",
            default,
            deserialize_with = "present",
            skip_serializing_if = "Option::is_none"
        )]
        offending_message: Option<Value>,
    },
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// The `msg` discriminator without payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MessageKind {
    Connect,
    Connected,
    Failed,
    Ping,
    Pong,
    Method,
    Sub,
    Unsub,
    Nosub,
    Result,
    Updated,
    Ready,
    Added,
    Changed,
    Removed,
    AddedBefore,
    MovedBefore,
    Error,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Connect => "connect",
            MessageKind::Connected => "connected",
            MessageKind::Failed => "failed",
            MessageKind::Ping => "ping",
            MessageKind::Pong => "pong",
            MessageKind::Method => "method",
            MessageKind::Sub => "sub",
            MessageKind::Unsub => "unsub",
            MessageKind::Nosub => "nosub",
            MessageKind::Result => "result",
            MessageKind::Updated => "updated",
            MessageKind::Ready => "ready",
            MessageKind::Added => "added",
            MessageKind::Changed => "changed",
            MessageKind::Removed => "removed",
            MessageKind::AddedBefore => "addedBefore",
            MessageKind::MovedBefore => "movedBefore",
            MessageKind::Error => "error",
        }
    }

    /// Kinds that mutate the collection snapshot
    pub fn is_collection_push(&self) -> bool {
        matches!(
            self,
            MessageKind::Added
                | MessageKind::Changed
                | MessageKind::Removed
                | MessageKind::AddedBefore
                | MessageKind::MovedBefore
        )
    }

    /// Kinds sent by a client that expect a correlated reply
    pub fn is_client_call(&self) -> bool {
        matches!(self, MessageKind::Method | MessageKind::Sub)
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Message {
    /// Protocol handshake offering every version the tool speaks
    pub fn connect() -> Self {
        Message::Connect {
            session: None,
            version: "1".to_string(),
            support: vec!["1".to_string(), "pre2".to_string(), "pre1".to_string()],
        }
    }

    /// Method call; the correlation id is assigned when the message is sent.
    pub fn method(name: impl Into<String>, params: Vec<Value>) -> Self {
        Message::Method {
            id: String::new(),
            method: name.into(),
            params: Some(params),
            random_seed: None,
        }
    }

    /// Subscription request; the correlation id is assigned when the message is sent.
    pub fn sub(name: impl Into<String>, params: Vec<Value>) -> Self {
        Message::Sub {
            id: String::new(),
            name: name.into(),
            params: Some(params),
        }
    }

    pub fn pong(id: Option<String>) -> Self {
        Message::Pong { id }
    }

    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Connect { .. } => MessageKind::Connect,
            Message::Connected { .. } => MessageKind::Connected,
            Message::Failed { .. } => MessageKind::Failed,
            Message::Ping { .. } => MessageKind::Ping,
            Message::Pong { .. } => MessageKind::Pong,
            Message::Method { .. } => MessageKind::Method,
            Message::Sub { .. } => MessageKind::Sub,
            Message::Unsub { .. } => MessageKind::Unsub,
            Message::Nosub { .. } => MessageKind::Nosub,
            Message::Result { .. } => MessageKind::Result,
            Message::Updated { .. } => MessageKind::Updated,
            Message::Ready { .. } => MessageKind::Ready,
            Message::Added { .. } => MessageKind::Added,
            Message::Changed { .. } => MessageKind::Changed,
            Message::Removed { .. } => MessageKind::Removed,
            Message::AddedBefore { .. } => MessageKind::AddedBefore,
            Message::MovedBefore { .. } => MessageKind::MovedBefore,
            Message::Error { .. } => MessageKind::Error,
        }
    }

    /// Identifier a reply should be matched against.
    ///
    /// Only reply kinds correlate: collection pushes also carry an `id`, but
    /// that is a document id and must never be mistaken for a request id.
    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            Message::Result { id, .. } | Message::Nosub { id, .. } => Some(id.as_str()),
            Message::Ready { subs } => subs.first().map(String::as_str),
            Message::Error {
                offending_message, ..
            } => offending_message
                .as_ref()
                .and_then(|m| m.get("id"))
                .and_then(Value::as_str),
            _ => None,
        }
    }

    /// Request id of a client-originated message
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Message::Method { id, .. } | Message::Sub { id, .. } | Message::Unsub { id } => {
                Some(id.as_str())
            }
            _ => None,
        }
    }

    /// Overwrite the request id. Returns false for kinds without one.
    pub fn set_request_id(&mut self, new_id: impl Into<String>) -> bool {
        match self {
            Message::Method { id, .. } | Message::Sub { id, .. } | Message::Unsub { id } => {
                *id = new_id.into();
                true
            }
            _ => false,
        }
    }

    /// Method or publication name of a client call
    pub fn operation_name(&self) -> Option<&str> {
        match self {
            Message::Method { method, .. } => Some(method.as_str()),
            Message::Sub { name, .. } => Some(name.as_str()),
            _ => None,
        }
    }

    pub fn params(&self) -> Option<&[Value]> {
        match self {
            Message::Method { params, .. } | Message::Sub { params, .. } => params.as_deref(),
            _ => None,
        }
    }

    /// Replace the parameter list of a client call. Returns false for other kinds.
    pub fn set_params(&mut self, new_params: Vec<Value>) -> bool {
        match self {
            Message::Method { params, .. } | Message::Sub { params, .. } => {
                *params = Some(new_params);
                true
            }
            _ => false,
        }
    }

    /// The `error` object carried by a `result` or `nosub` reply
    pub fn error_payload(&self) -> Option<&Value> {
        match self {
            Message::Result { error, .. } | Message::Nosub { error, .. } => error.as_ref(),
            _ => None,
        }
    }

    /// Numeric or string error code (`error.error`)
    pub fn error_code(&self) -> Option<&Value> {
        self.error_payload().and_then(|e| e.get("error"))
    }

    /// Human-readable error reason (`error.reason`, or the top-level reason of an `error` message)
    pub fn error_reason(&self) -> Option<&str> {
        match self {
            Message::Error { reason, .. } => Some(reason.as_str()),
            _ => self
                .error_payload()
                .and_then(|e| e.get("reason"))
                .and_then(Value::as_str),
        }
    }

    /// Session token granted by a successful login result
    pub fn session_token(&self) -> Option<&str> {
        match self {
            Message::Result {
                result: Some(result),
                ..
            } => result.get("token").and_then(Value::as_str),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tag_serialized_first() {
        let msg = Message::method("getUser", vec![json!(1)]);
        let text = serde_json::to_string(&msg).unwrap();
        assert!(text.starts_with(r#"{"msg":"method""#), "{}", text);
    }

    #[test]
    fn test_camel_case_kinds() {
        let msg: Message = serde_json::from_value(json!({
            "msg": "addedBefore",
            "collection": "tasks",
            "id": "a1",
            "fields": {"title": "x"},
            "before": "b2"
        }))
        .unwrap();
        assert_eq!(msg.kind(), MessageKind::AddedBefore);
        assert_eq!(msg.kind().as_str(), "addedBefore");
    }

    #[test]
    fn test_null_result_is_preserved() {
        let msg: Message =
            serde_json::from_value(json!({"msg": "result", "id": "7", "result": null})).unwrap();
        assert_eq!(
            msg,
            Message::Result {
                id: "7".into(),
                error: None,
                result: Some(Value::Null)
            }
        );
        let absent: Message = serde_json::from_value(json!({"msg": "result", "id": "7"})).unwrap();
        assert_eq!(
            absent,
            Message::Result {
                id: "7".into(),
                error: None,
                result: None
            }
        );
    }

    #[test]
    fn test_correlation_rules() {
        let result: Message = serde_json::from_value(json!({"msg": "result", "id": "3"})).unwrap();
        assert_eq!(result.correlation_id(), Some("3"));

        let error: Message = serde_json::from_value(json!({
            "msg": "error",
            "reason": "Malformed method invocation",
            "offendingMessage": {"msg": "method", "id": "9"}
        }))
        .unwrap();
        assert_eq!(error.correlation_id(), Some("9"));

        let ready: Message =
            serde_json::from_value(json!({"msg": "ready", "subs": ["4", "5"]})).unwrap();
        assert_eq!(ready.correlation_id(), Some("4"));

        let added: Message = serde_json::from_value(json!({
            "msg": "added", "collection": "users", "id": "3"
        }))
        .unwrap();
        assert_eq!(added.correlation_id(), None);
    }

    #[test]
    fn test_error_accessors() {
        let msg: Message = serde_json::from_value(json!({
            "msg": "result",
            "id": "1",
            "error": {"error": 404, "reason": "Method 'x' not found", "errorType": "Meteor.Error"}
        }))
        .unwrap();
        assert_eq!(msg.error_code(), Some(&json!(404)));
        assert_eq!(msg.error_reason(), Some("Method 'x' not found"));
        assert_eq!(msg.session_token(), None);
    }

    #[test]
    fn test_set_request_id() {
        let mut msg = Message::sub("tasks", vec![]);
        assert!(msg.set_request_id("12"));
        assert_eq!(msg.request_id(), Some("12"));
        let mut ping = Message::Ping { id: None };
        assert!(!ping.set_request_id("1"));
    }
}
