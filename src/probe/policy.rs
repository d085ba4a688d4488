// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Probe Policies
 * Message generation, answer classification and reply filters
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::table::Probe;
use crate::ddp::Message;
use crate::errors::DdpResult;

/// Turns one input into the outbound message for its probe.
/// The correlation id is assigned afterwards by the orchestrator.
pub trait MessageGenerator<I>: Send + Sync {
    fn generate(&self, input: &I) -> DdpResult<Message>;
}

impl<I, F> MessageGenerator<I> for F
where
    F: Fn(&I) -> DdpResult<Message> + Send + Sync,
{
    fn generate(&self, input: &I) -> DdpResult<Message> {
        self(input)
    }
}

/// Scores a correlated reply. `None` means "not interesting".
pub trait AnswerClassifier: Send + Sync {
    fn classify(&self, reply: &Message, probe: &Probe) -> Option<Message>;
}

impl<F> AnswerClassifier for F
where
    F: Fn(&Message, &Probe) -> Option<Message> + Send + Sync,
{
    fn classify(&self, reply: &Message, probe: &Probe) -> Option<Message> {
        self(reply, probe)
    }
}

/// Keeps every reply
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAll;

impl AnswerClassifier for KeepAll {
    fn classify(&self, reply: &Message, _probe: &Probe) -> Option<Message> {
        Some(reply.clone())
    }
}

/// Error code as servers send it: numeric (`404`) or textual (`"too-many-requests"`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl ErrorCode {
    fn matches(&self, value: &Value) -> bool {
        match self {
            ErrorCode::Number(n) => {
                value.as_i64() == Some(*n)
                    || value.as_f64() == Some(*n as f64)
                    || value.as_str() == Some(n.to_string().as_str())
            }
            ErrorCode::Text(text) => value.as_str() == Some(text.as_str()),
        }
    }
}

/// Matches an uninteresting error reply by code and/or reason text.
/// A filter with neither set matches nothing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplyFilter {
    #[serde(default)]
    pub code: Option<ErrorCode>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl ReplyFilter {
    pub fn code(code: i64) -> Self {
        Self {
            code: Some(ErrorCode::Number(code)),
            reason: None,
        }
    }

    pub fn reason(reason: impl Into<String>) -> Self {
        Self {
            code: None,
            reason: Some(reason.into()),
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Unknown method or publication
    pub fn not_found() -> Self {
        Self::code(404)
    }

    /// `check()` failure raised by a confused argument
    pub fn match_failed() -> Self {
        Self::code(400).with_reason("Match failed")
    }

    pub fn user_not_found() -> Self {
        Self::reason("User not found")
    }

    pub fn incorrect_password() -> Self {
        Self::reason("Incorrect password")
    }

    pub fn matches(&self, reply: &Message) -> bool {
        if self.code.is_none() && self.reason.is_none() {
            return false;
        }
        if let Some(code) = &self.code {
            match reply.error_code() {
                Some(value) if code.matches(value) => {}
                _ => return false,
            }
        }
        if let Some(reason) = &self.reason {
            if reply.error_reason() != Some(reason.as_str()) {
                return false;
            }
        }
        true
    }
}

/// Keeps every reply except those matched by one of the filters
#[derive(Debug, Clone, Default)]
pub struct DiscardMatching {
    filters: Vec<ReplyFilter>,
}

impl DiscardMatching {
    pub fn new(filters: impl IntoIterator<Item = ReplyFilter>) -> Self {
        Self {
            filters: filters.into_iter().collect(),
        }
    }

    pub fn is_discarded(&self, reply: &Message) -> bool {
        self.filters.iter().any(|f| f.matches(reply))
    }
}

impl AnswerClassifier for DiscardMatching {
    fn classify(&self, reply: &Message, _probe: &Probe) -> Option<Message> {
        if self.is_discarded(reply) {
            None
        } else {
            Some(reply.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(value: Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    fn probe() -> Probe {
        Probe {
            name: "p".into(),
            correlation_id: "1".into(),
            message: Message::method("p", vec![]),
        }
    }

    #[test]
    fn test_not_found_filter() {
        let filter = ReplyFilter::not_found();
        assert!(filter.matches(&reply(json!({"msg": "result", "id": "1", "error": {"error": 404, "reason": "Method 'x' not found"}}))));
        assert!(filter.matches(&reply(json!({"msg": "nosub", "id": "1", "error": {"error": 404}}))));
        assert!(!filter.matches(&reply(json!({"msg": "result", "id": "1", "result": 1}))));
        assert!(!filter.matches(&reply(json!({"msg": "result", "id": "1", "error": {"error": 403}}))));
    }

    #[test]
    fn test_code_and_reason_must_both_match() {
        let filter = ReplyFilter::match_failed();
        assert!(filter.matches(&reply(json!({"msg": "result", "id": "1", "error": {"error": 400, "reason": "Match failed"}}))));
        assert!(!filter.matches(&reply(json!({"msg": "result", "id": "1", "error": {"error": 400, "reason": "Other"}}))));
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        let filter = ReplyFilter::default();
        assert!(!filter.matches(&reply(json!({"msg": "result", "id": "1", "error": {"error": 404}}))));
    }

    #[test]
    fn test_text_code_from_config() {
        let filter: ReplyFilter = serde_json::from_value(json!({"code": "too-many-requests"})).unwrap();
        assert!(filter.matches(&reply(json!({"msg": "result", "id": "1", "error": {"error": "too-many-requests"}}))));
    }

    #[test]
    fn test_discard_matching_classifier() {
        let classifier = DiscardMatching::new([ReplyFilter::user_not_found()]);
        let miss = reply(json!({"msg": "result", "id": "1", "error": {"error": 403, "reason": "User not found"}}));
        let hit = reply(json!({"msg": "result", "id": "1", "error": {"error": 403, "reason": "Incorrect password"}}));
        assert!(classifier.classify(&miss, &probe()).is_none());
        assert_eq!(classifier.classify(&hit, &probe()), Some(hit));
    }

    #[test]
    fn test_closure_policies() {
        let generator =
            |input: &String| -> DdpResult<Message> { Ok(Message::method(input.clone(), vec![])) };
        let msg = MessageGenerator::generate(&generator, &"x".to_string()).unwrap();
        assert_eq!(msg.operation_name(), Some("x"));

        let classifier = |reply: &Message, _: &Probe| reply.error_payload().map(|_| reply.clone());
        assert!(classifier.classify(&reply(json!({"msg": "result", "id": "1"})), &probe()).is_none());
    }
}
