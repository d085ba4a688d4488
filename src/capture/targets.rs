// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Capture Targets
 * Dump views and distinct client calls recovered from a capture
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde_json::Value;
use std::collections::HashSet;

use crate::confuser::{type_descriptor, TypeDescriptor};
use crate::ddp::{Message, MessageKind};

/// Framework-internal calls that are never interesting targets
pub const IGNORED_OPERATIONS: &[&str] = &[
    "login",
    "logout",
    "logoutOtherClients",
    "getNewToken",
    "removeOtherTokens",
    "meteor.loginServiceConfiguration",
    "meteor_autoupdate_clientVersions",
];

pub fn default_ignored_operations() -> Vec<String> {
    IGNORED_OPERATIONS.iter().map(|s| s.to_string()).collect()
}

/// Which recovered messages a dump should contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DumpFilter {
    #[default]
    All,
    Methods,
    Subscriptions,
    /// `method` and `sub` only
    ClientCalls,
}

impl DumpFilter {
    pub fn accepts(&self, message: &Message) -> bool {
        match self {
            DumpFilter::All => true,
            DumpFilter::Methods => message.kind() == MessageKind::Method,
            DumpFilter::Subscriptions => message.kind() == MessageKind::Sub,
            DumpFilter::ClientCalls => message.kind().is_client_call(),
        }
    }

    pub fn apply<'a>(&self, messages: &'a [Message]) -> Vec<&'a Message> {
        messages.iter().filter(|m| self.accepts(m)).collect()
    }
}

/// Collapse recovered traffic to distinct client calls: one per
/// (kind, name, parameter shape), in first-seen order, ignored names removed.
pub fn extract_targets(messages: &[Message], ignored: &[String]) -> Vec<Message> {
    let mut seen: HashSet<(MessageKind, String, TypeDescriptor)> = HashSet::new();
    let mut targets = Vec::new();

    for message in messages {
        let kind = message.kind();
        if !kind.is_client_call() {
            continue;
        }
        let Some(name) = message.operation_name() else {
            continue;
        };
        if ignored.iter().any(|i| i == name) {
            continue;
        }
        let shape = type_descriptor(&Value::Array(
            message.params().unwrap_or_default().to_vec(),
        ));
        if seen.insert((kind, name.to_string(), shape)) {
            targets.push(message.clone());
        }
    }

    targets
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dedup_by_shape() {
        let messages = vec![
            Message::method("tasks.insert", vec![json!("a")]),
            Message::method("tasks.insert", vec![json!("b")]),
            Message::method("tasks.insert", vec![json!(1)]),
            Message::sub("tasks.insert", vec![json!("a")]),
            Message::method("login", vec![json!({"resume": "t"})]),
            Message::Ping { id: None },
            Message::Result {
                id: "1".into(),
                error: None,
                result: None,
            },
        ];
        let targets = extract_targets(&messages, &default_ignored_operations());
        assert_eq!(targets.len(), 3);
        assert_eq!(targets[0].params().unwrap()[0], json!("a"));
        assert_eq!(targets[1].params().unwrap()[0], json!(1));
        assert_eq!(targets[2].kind(), MessageKind::Sub);
    }

    #[test]
    fn test_dump_filter() {
        let messages = vec![
            Message::method("a", vec![]),
            Message::sub("b", vec![]),
            Message::Ping { id: None },
        ];
        assert_eq!(DumpFilter::All.apply(&messages).len(), 3);
        assert_eq!(DumpFilter::Methods.apply(&messages).len(), 1);
        assert_eq!(DumpFilter::Subscriptions.apply(&messages).len(), 1);
        assert_eq!(DumpFilter::ClientCalls.apply(&messages).len(), 2);
    }
}
