// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Probe orchestration: inputs in, correlated and classified replies out.

pub mod attacks;
pub mod orchestrator;
pub mod policy;
pub mod source;
pub mod table;
pub mod transport;

pub use orchestrator::{OrchestratorOptions, ProbeOrchestrator, RunReport, StopHandle};
pub use policy::{AnswerClassifier, DiscardMatching, ErrorCode, KeepAll, MessageGenerator, ReplyFilter};
pub use source::{InputSource, LineSource, NamedInput, Partition, ProbeInput, VecSource};
pub use table::{AnswerSet, Probe, ProbeTable, Resolution};
pub use transport::{Connector, DdpConnector, ProbeTransport};
