// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Probe Orchestrator
 * Correlated request/response probing under a concurrency ceiling,
 * over one persistent connection or a fresh connection per batch
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{debug, info, info_span, trace, warn, Instrument};

use super::policy::{AnswerClassifier, MessageGenerator};
use super::source::{InputSource, ProbeInput};
use super::table::{AnswerSet, Probe, ProbeTable, Resolution};
use super::transport::{Connector, ProbeTransport};
use crate::ddp::{ClientEvent, Message};
use crate::errors::{DdpError, DdpResult};

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Ceiling on in-flight probes; 0 means unbounded
    pub concurrency: usize,
    /// Store `None` for replies the classifier rejects
    pub record_absent: bool,
    /// Name used in logs and reports
    pub label: String,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            record_absent: false,
            label: "probe".to_string(),
        }
    }
}

/// Cooperative stop: no new probes are issued, in-flight ones still resolve
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of one orchestrator run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub label: String,
    pub answers: AnswerSet,
    pub probes_sent: usize,
    pub skipped_inputs: usize,
    pub rounds: usize,
    pub peak_in_flight: usize,
    pub completed: bool,
    pub stopped: bool,
    pub halted: Option<String>,
}

pub struct ProbeOrchestrator<I: ProbeInput> {
    options: OrchestratorOptions,
    source: Box<dyn InputSource<I>>,
    generator: Box<dyn MessageGenerator<I>>,
    classifier: Box<dyn AnswerClassifier>,
    table: ProbeTable,
    stop: StopHandle,
    completion: Option<oneshot::Sender<()>>,
    pending: Option<I>,
    exhausted: bool,
    halted: Option<String>,
    probes_sent: usize,
    skipped_inputs: usize,
    rounds: usize,
}

impl<I: ProbeInput> ProbeOrchestrator<I> {
    pub fn new(
        source: impl InputSource<I> + 'static,
        generator: impl MessageGenerator<I> + 'static,
        classifier: impl AnswerClassifier + 'static,
    ) -> Self {
        Self::with_options(source, generator, classifier, OrchestratorOptions::default())
    }

    pub fn with_options(
        source: impl InputSource<I> + 'static,
        generator: impl MessageGenerator<I> + 'static,
        classifier: impl AnswerClassifier + 'static,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            table: ProbeTable::new(options.concurrency, options.record_absent),
            options,
            source: Box::new(source),
            generator: Box::new(generator),
            classifier: Box::new(classifier),
            stop: StopHandle::default(),
            completion: None,
            pending: None,
            exhausted: false,
            halted: None,
            probes_sent: 0,
            skipped_inputs: 0,
            rounds: 0,
        }
    }

    /// Share a stop flag with other parties (e.g. a classifier that halts on success)
    pub fn with_stop_handle(mut self, stop: StopHandle) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn label(&self) -> &str {
        &self.options.label
    }

    /// Fires once, when the source is exhausted and nothing is in flight
    pub fn completion(&mut self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        self.completion = Some(tx);
        rx
    }

    /// Drive the run over one persistent, already ready connection.
    pub async fn run<T>(&mut self, transport: &T) -> RunReport
    where
        T: ProbeTransport + ?Sized,
    {
        let span = info_span!("probe_run", label = %self.options.label, mode = "persistent");
        self.run_persistent(transport).instrument(span).await
    }

    /// Drive the run with a brand-new connection per batch of `concurrency`
    /// probes. A round ends once every probe it issued is answered.
    pub async fn run_recycling<C>(&mut self, connector: &C) -> RunReport
    where
        C: Connector + ?Sized,
    {
        let span = info_span!("probe_run", label = %self.options.label, mode = "recycling");
        self.run_rounds(connector).instrument(span).await
    }

    async fn run_persistent<T>(&mut self, transport: &T) -> RunReport
    where
        T: ProbeTransport + ?Sized,
    {
        let mut events = transport.subscribe();
        self.rounds = 1;
        info!(
            "[Probe] Starting with concurrency {}",
            self.options.concurrency
        );

        self.refill(transport).await;
        self.check_completion();

        while !self.is_finished() {
            match events.recv().await {
                Some(ClientEvent::Message(reply)) => {
                    if self.on_reply(&reply) {
                        self.refill(transport).await;
                        self.check_completion();
                    }
                }
                Some(ClientEvent::Error(reason)) => self.halt(reason),
                Some(ClientEvent::Closed { reason }) => {
                    self.halt(format!("connection closed: {}", reason))
                }
                Some(_) => {}
                None => self.halt("event stream ended"),
            }
        }

        self.report()
    }

    async fn run_rounds<C>(&mut self, connector: &C) -> RunReport
    where
        C: Connector + ?Sized,
    {
        info!(
            "[Quiver] Starting with {} probes per connection",
            self.options.concurrency
        );

        while self.halted.is_none() && !self.stop.is_stopped() {
            // Look ahead so an exhausted source never costs a connection
            match self.next_input().await {
                Some(input) => self.pending = Some(input),
                None => {
                    self.check_completion();
                    break;
                }
            }

            let transport = match connector.open().await {
                Ok(transport) => transport,
                Err(e) => {
                    self.halt(format!("could not open connection: {}", e));
                    break;
                }
            };
            self.rounds += 1;

            let mut events = transport.subscribe();
            let issued = self.refill(&transport).await;
            debug!("[Quiver] Round {} issued {} probes", self.rounds, issued);

            while self.table.in_flight() > 0 && self.halted.is_none() {
                match events.recv().await {
                    Some(ClientEvent::Message(reply)) => {
                        self.on_reply(&reply);
                    }
                    Some(ClientEvent::Error(reason)) => self.halt(reason),
                    Some(ClientEvent::Closed { reason }) => {
                        self.halt(format!("connection closed: {}", reason))
                    }
                    Some(_) => {}
                    None => self.halt("event stream ended"),
                }
            }

            transport.close();
            debug!("[Quiver] Round {} complete", self.rounds);
        }

        self.report()
    }

    fn is_finished(&self) -> bool {
        self.table.is_completed()
            || self.halted.is_some()
            || (self.stop.is_stopped() && self.table.in_flight() == 0)
    }

    /// Returns true if the reply resolved one of our probes
    fn on_reply(&mut self, reply: &Message) -> bool {
        match self.table.resolve(reply, self.classifier.as_ref()) {
            Resolution::Miss => {
                trace!("[Probe] Uncorrelated {} message", reply.kind());
                false
            }
            Resolution::Resolved { probe, kept } => {
                if kept {
                    info!("[Probe] {} answered", probe.name);
                } else {
                    debug!("[Probe] {} discarded", probe.name);
                }
                true
            }
        }
    }

    async fn refill<T>(&mut self, transport: &T) -> usize
    where
        T: ProbeTransport + ?Sized,
    {
        let mut issued = 0;
        while self.halted.is_none() && !self.stop.is_stopped() && self.table.has_capacity() {
            let Some(input) = self.next_input().await else {
                break;
            };
            match self.issue(input, transport) {
                Ok(()) => issued += 1,
                Err(e) if e.is_connection_fatal() => {
                    self.halt(e.to_string());
                    break;
                }
                Err(e) => {
                    self.skipped_inputs += 1;
                    warn!("[Probe] Skipping input: {}", e);
                }
            }
        }
        issued
    }

    async fn next_input(&mut self) -> Option<I> {
        if let Some(input) = self.pending.take() {
            return Some(input);
        }
        if self.exhausted {
            return None;
        }
        match self.source.next_input().await {
            Ok(Some(input)) => Some(input),
            Ok(None) => {
                self.exhausted = true;
                None
            }
            Err(e) => {
                self.exhausted = true;
                self.halt(format!("input source failed: {}", e));
                None
            }
        }
    }

    fn issue<T>(&mut self, input: I, transport: &T) -> DdpResult<()>
    where
        T: ProbeTransport + ?Sized,
    {
        let name = input.probe_name();
        let mut message = self
            .generator
            .generate(&input)
            .map_err(|e| DdpError::ProbeGeneration {
                input: name.clone(),
                reason: match e {
                    DdpError::ProbeGeneration { reason, .. } => reason,
                    other => other.to_string(),
                },
            })?;

        let correlation_id = transport.allocate_id();
        if !message.set_request_id(correlation_id.clone()) {
            return Err(DdpError::ProbeGeneration {
                input: name,
                reason: format!(
                    "generated a '{}' message; only method and sub can be correlated",
                    message.kind()
                ),
            });
        }

        self.table.track(Probe {
            name,
            correlation_id: correlation_id.clone(),
            message: message.clone(),
        });
        if let Err(e) = transport.send(message) {
            self.table.forget(&correlation_id);
            return Err(e);
        }
        self.probes_sent += 1;
        Ok(())
    }

    fn check_completion(&mut self) {
        if self.halted.is_none() && self.table.try_complete(self.exhausted) {
            info!(
                "[Probe] Completed: {} answers from {} probes",
                self.table.answers().len(),
                self.probes_sent
            );
            if let Some(tx) = self.completion.take() {
                let _ = tx.send(());
            }
        }
    }

    fn halt(&mut self, reason: impl Into<String>) {
        if self.halted.is_none() {
            let reason = reason.into();
            warn!(
                "[Probe] Halted with {} probes in flight: {}",
                self.table.in_flight(),
                reason
            );
            self.halted = Some(reason);
        }
    }

    /// Hands the answer set over to the report
    fn report(&mut self) -> RunReport {
        RunReport {
            label: self.options.label.clone(),
            answers: self.table.take_answers(),
            probes_sent: self.probes_sent,
            skipped_inputs: self.skipped_inputs,
            rounds: self.rounds,
            peak_in_flight: self.table.peak_in_flight(),
            completed: self.table.is_completed(),
            stopped: self.stop.is_stopped(),
            halted: self.halted.clone(),
        }
    }
}
