// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Brute-Force Presets
 * Method/publication discovery, user enumeration and password guessing
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use futures_util::future::join_all;
use std::path::Path;
use tracing::info;

use super::orchestrator::{OrchestratorOptions, ProbeOrchestrator, RunReport, StopHandle};
use super::policy::{AnswerClassifier, DiscardMatching, ReplyFilter};
use super::source::{InputSource, LineSource, NamedInput, Partition};
use super::table::Probe;
use super::transport::DdpConnector;
use crate::ddp::{login_message, ClientConfig, Credentials, DdpClient, Message};
use crate::errors::DdpResult;
use crate::retry::RetryConfig;

/// What a wordlist buster calls each word as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusterKind {
    Method,
    Publication,
}

impl BusterKind {
    pub fn label(&self) -> &'static str {
        match self {
            BusterKind::Method => "methodbuster",
            BusterKind::Publication => "pubbuster",
        }
    }

    fn message(&self, name: &str) -> Message {
        match self {
            BusterKind::Method => Message::method(name, vec![]),
            BusterKind::Publication => Message::sub(name, vec![]),
        }
    }
}

fn labelled(options: &OrchestratorOptions, label: &str) -> OrchestratorOptions {
    OrchestratorOptions {
        label: label.to_string(),
        ..options.clone()
    }
}

/// Call every word as a method (or subscribe to it as a publication),
/// keeping replies that are not "not found".
pub fn buster(
    kind: BusterKind,
    source: impl InputSource<NamedInput> + 'static,
    filters: Vec<ReplyFilter>,
    options: &OrchestratorOptions,
) -> ProbeOrchestrator<NamedInput> {
    let generator = move |input: &NamedInput| -> DdpResult<Message> { Ok(kind.message(&input.name)) };
    ProbeOrchestrator::with_options(
        source,
        generator,
        DiscardMatching::new(filters),
        labelled(options, kind.label()),
    )
}

/// Login as each word with a throwaway password; anything other than
/// "User not found" means the account exists.
pub fn user_enumerator(
    source: impl InputSource<NamedInput> + 'static,
    filters: Vec<ReplyFilter>,
    options: &OrchestratorOptions,
) -> ProbeOrchestrator<NamedInput> {
    let password = uuid::Uuid::new_v4().to_string();
    let generator = move |input: &NamedInput| -> DdpResult<Message> {
        let credentials = if input.name.contains('@') {
            Credentials::Email {
                email: input.name.clone(),
                password: password.clone(),
            }
        } else {
            Credentials::Username {
                username: input.name.clone(),
                password: password.clone(),
            }
        };
        Ok(login_message(&credentials))
    };
    ProbeOrchestrator::with_options(
        source,
        generator,
        DiscardMatching::new(filters),
        labelled(options, "userbuster"),
    )
}

/// Keeps unfiltered replies and stops the run once a login succeeds
struct StopOnToken {
    filter: DiscardMatching,
    stop: StopHandle,
}

impl AnswerClassifier for StopOnToken {
    fn classify(&self, reply: &Message, probe: &Probe) -> Option<Message> {
        if reply.session_token().is_some() {
            info!("[Probe] Password found: {}", probe.name);
            self.stop.stop();
            return Some(reply.clone());
        }
        self.filter.classify(reply, probe)
    }
}

/// Try each word as the password of `username`
pub fn password_bruteforcer(
    username: &str,
    source: impl InputSource<NamedInput> + 'static,
    filters: Vec<ReplyFilter>,
    options: &OrchestratorOptions,
) -> ProbeOrchestrator<NamedInput> {
    let stop = StopHandle::default();
    let username = username.to_string();
    let generator = move |input: &NamedInput| -> DdpResult<Message> {
        Ok(login_message(&Credentials::Username {
            username: username.clone(),
            password: input.name.clone(),
        }))
    };
    let classifier = StopOnToken {
        filter: DiscardMatching::new(filters),
        stop: stop.clone(),
    };
    ProbeOrchestrator::with_options(source, generator, classifier, labelled(options, "passwordbuster"))
        .with_stop_handle(stop)
}

/// Fold partitioned runs into one report
pub fn merge_reports(label: &str, reports: Vec<RunReport>) -> RunReport {
    let mut merged = RunReport {
        label: label.to_string(),
        answers: Default::default(),
        probes_sent: 0,
        skipped_inputs: 0,
        rounds: 0,
        peak_in_flight: 0,
        completed: !reports.is_empty(),
        stopped: false,
        halted: None,
    };
    for report in reports {
        merged.answers.extend(report.answers);
        merged.probes_sent += report.probes_sent;
        merged.skipped_inputs += report.skipped_inputs;
        merged.rounds += report.rounds;
        merged.peak_in_flight = merged.peak_in_flight.max(report.peak_in_flight);
        merged.completed &= report.completed;
        merged.stopped |= report.stopped;
        if merged.halted.is_none() {
            merged.halted = report.halted;
        }
    }
    merged
}

/// Split a wordlist across `parallelism` busters, each with its own
/// connection, and merge their answers.
pub async fn run_wordlist_buster(
    kind: BusterKind,
    client: &ClientConfig,
    wordlist: &Path,
    parallelism: usize,
    filters: Vec<ReplyFilter>,
    options: &OrchestratorOptions,
) -> DdpResult<RunReport> {
    let mut workers = Vec::new();
    for partition in Partition::split(parallelism) {
        let source = LineSource::open(wordlist, partition).await?;
        let connection = DdpClient::connect(client.clone()).await?;
        let orchestrator = buster(kind, source, filters.clone(), options);
        workers.push((orchestrator, connection));
    }
    info!(
        "[Probe] {} running {} partitions over {}",
        kind.label(),
        workers.len(),
        wordlist.display()
    );

    let reports = join_all(
        workers
            .iter_mut()
            .map(|(orchestrator, connection)| orchestrator.run(&*connection)),
    )
    .await;

    for (_, connection) in &workers {
        connection.close();
    }
    Ok(merge_reports(kind.label(), reports))
}

/// Recycling connections never log in; every probe is a login attempt
fn anonymous(client: &ClientConfig) -> ClientConfig {
    ClientConfig {
        credentials: None,
        ..client.clone()
    }
}

pub async fn run_user_enumeration(
    client: &ClientConfig,
    wordlist: &Path,
    filters: Vec<ReplyFilter>,
    options: &OrchestratorOptions,
    retry: RetryConfig,
) -> DdpResult<RunReport> {
    let source = LineSource::open(wordlist, Partition::default()).await?;
    let connector = DdpConnector::new(anonymous(client)).with_retry(retry);
    let mut orchestrator = user_enumerator(source, filters, options);
    Ok(orchestrator.run_recycling(&connector).await)
}

pub async fn run_password_bruteforce(
    client: &ClientConfig,
    username: &str,
    wordlist: &Path,
    filters: Vec<ReplyFilter>,
    options: &OrchestratorOptions,
    retry: RetryConfig,
) -> DdpResult<RunReport> {
    let source = LineSource::open(wordlist, Partition::default()).await?;
    let connector = DdpConnector::new(anonymous(client)).with_retry(retry);
    let mut orchestrator = password_bruteforcer(username, source, filters, options);
    Ok(orchestrator.run_recycling(&connector).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn report(label: &str, answers: &[&str], completed: bool) -> RunReport {
        RunReport {
            label: label.into(),
            answers: answers
                .iter()
                .map(|a| (a.to_string(), Some(Message::Ping { id: None })))
                .collect(),
            probes_sent: 3,
            skipped_inputs: 1,
            rounds: 1,
            peak_in_flight: 2,
            completed,
            stopped: false,
            halted: None,
        }
    }

    #[test]
    fn test_merge_reports() {
        let merged = merge_reports("m", vec![report("a", &["x"], true), report("b", &["y"], false)]);
        assert_eq!(merged.answers.len(), 2);
        assert_eq!(merged.probes_sent, 6);
        assert_eq!(merged.skipped_inputs, 2);
        assert_eq!(merged.peak_in_flight, 2);
        assert!(!merged.completed);
    }

    #[test]
    fn test_stop_on_token() {
        let stop = StopHandle::default();
        let classifier = StopOnToken {
            filter: DiscardMatching::new([ReplyFilter::incorrect_password()]),
            stop: stop.clone(),
        };
        let probe = Probe {
            name: "hunter2".into(),
            correlation_id: "1".into(),
            message: Message::method("login", vec![]),
        };

        let wrong: Message = serde_json::from_value(json!({"msg": "result", "id": "1", "error": {"error": 403, "reason": "Incorrect password"}})).unwrap();
        assert!(classifier.classify(&wrong, &probe).is_none());
        assert!(!stop.is_stopped());

        let right: Message = serde_json::from_value(json!({"msg": "result", "id": "1", "result": {"id": "u", "token": "t"}})).unwrap();
        assert!(classifier.classify(&right, &probe).is_some());
        assert!(stop.is_stopped());
    }

    #[test]
    fn test_buster_labels() {
        assert_eq!(BusterKind::Method.label(), "methodbuster");
        assert_eq!(
            BusterKind::Publication.message("users").kind(),
            crate::ddp::MessageKind::Sub
        );
    }
}
