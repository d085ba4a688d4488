// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Probe Table
 * In-flight probe bookkeeping, independent of any socket
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::policy::AnswerClassifier;
use crate::ddp::Message;

/// One outstanding request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Probe {
    pub name: String,
    pub correlation_id: String,
    pub message: Message,
}

/// Probe name to classified reply. `None` records an absent classification.
pub type AnswerSet = BTreeMap<String, Option<Message>>;

/// Outcome of feeding one reply to the table
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// The reply matched a probe; `kept` says whether an answer was stored
    Resolved { probe: Probe, kept: bool },
    /// Unsolicited or unknown reply
    Miss,
}

#[derive(Debug, Default)]
pub struct ProbeTable {
    concurrency: usize,
    record_absent: bool,
    in_flight: HashMap<String, Probe>,
    answers: AnswerSet,
    peak_in_flight: usize,
    completed: bool,
}

impl ProbeTable {
    /// `concurrency` of 0 means unbounded
    pub fn new(concurrency: usize, record_absent: bool) -> Self {
        Self {
            concurrency,
            record_absent,
            ..Self::default()
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight
    }

    pub fn answers(&self) -> &AnswerSet {
        &self.answers
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn has_capacity(&self) -> bool {
        self.concurrency == 0 || self.in_flight.len() < self.concurrency
    }

    pub fn track(&mut self, probe: Probe) {
        self.in_flight.insert(probe.correlation_id.clone(), probe);
        self.peak_in_flight = self.peak_in_flight.max(self.in_flight.len());
    }

    /// Drop a probe whose send failed
    pub fn forget(&mut self, correlation_id: &str) -> Option<Probe> {
        self.in_flight.remove(correlation_id)
    }

    pub fn resolve(&mut self, reply: &Message, classifier: &dyn AnswerClassifier) -> Resolution {
        let Some(id) = reply.correlation_id() else {
            return Resolution::Miss;
        };
        let Some(probe) = self.in_flight.remove(id) else {
            return Resolution::Miss;
        };

        let answer = classifier.classify(reply, &probe);
        let kept = answer.is_some();
        if kept || self.record_absent {
            self.answers.insert(probe.name.clone(), answer);
        }
        Resolution::Resolved { probe, kept }
    }

    /// Flip to completed iff the source is exhausted and nothing is in
    /// flight. Returns true only on the call that completes the run.
    pub fn try_complete(&mut self, source_exhausted: bool) -> bool {
        if self.completed || !source_exhausted || !self.in_flight.is_empty() {
            return false;
        }
        self.completed = true;
        true
    }

    pub fn take_answers(&mut self) -> AnswerSet {
        std::mem::take(&mut self.answers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::policy::{DiscardMatching, KeepAll, ReplyFilter};
    use serde_json::json;

    fn probe(name: &str, id: &str) -> Probe {
        let mut message = Message::method(name, vec![]);
        message.set_request_id(id);
        Probe {
            name: name.into(),
            correlation_id: id.into(),
            message,
        }
    }

    fn reply(value: serde_json::Value) -> Message {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_capacity() {
        let mut table = ProbeTable::new(2, false);
        assert!(table.has_capacity());
        table.track(probe("a", "1"));
        table.track(probe("b", "2"));
        assert!(!table.has_capacity());
        assert_eq!(table.peak_in_flight(), 2);

        let unbounded = ProbeTable::new(0, false);
        assert!(unbounded.has_capacity());
    }

    #[test]
    fn test_resolve_and_miss() {
        let mut table = ProbeTable::new(0, false);
        table.track(probe("a", "1"));

        let push = reply(json!({"msg": "added", "collection": "c", "id": "1"}));
        assert_eq!(table.resolve(&push, &KeepAll), Resolution::Miss);
        let stray = reply(json!({"msg": "result", "id": "99"}));
        assert_eq!(table.resolve(&stray, &KeepAll), Resolution::Miss);
        assert_eq!(table.in_flight(), 1);

        let answer = reply(json!({"msg": "result", "id": "1", "result": true}));
        assert!(matches!(
            table.resolve(&answer, &KeepAll),
            Resolution::Resolved { kept: true, .. }
        ));
        assert_eq!(table.answers().get("a"), Some(&Some(answer.clone())));
        assert_eq!(table.in_flight(), 0);

        let taken = table.take_answers();
        assert_eq!(taken.get("a"), Some(&Some(answer)));
        assert!(table.answers().is_empty());
    }

    #[test]
    fn test_absent_answers_recorded_on_request() {
        let classifier = DiscardMatching::new([ReplyFilter::not_found()]);
        let not_found = reply(json!({"msg": "result", "id": "1", "error": {"error": 404}}));

        let mut quiet = ProbeTable::new(0, false);
        quiet.track(probe("a", "1"));
        quiet.resolve(&not_found, &classifier);
        assert!(quiet.answers().is_empty());

        let mut verbose = ProbeTable::new(0, true);
        verbose.track(probe("a", "1"));
        verbose.resolve(&not_found, &classifier);
        assert_eq!(verbose.answers().get("a"), Some(&None));
    }

    #[test]
    fn test_completion_fires_once() {
        let mut table = ProbeTable::new(1, false);
        table.track(probe("a", "1"));
        assert!(!table.try_complete(true));
        table.resolve(&reply(json!({"msg": "result", "id": "1"})), &KeepAll);
        assert!(!table.try_complete(false));
        assert!(table.try_complete(true));
        assert!(!table.try_complete(true));
        assert!(table.is_completed());
    }
}
