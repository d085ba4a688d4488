// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Confuser Campaign
 * One type-confusion orchestrator per template message
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use futures_util::future::join_all;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{info, warn};

use super::derive::{apply_probe, derive_confusers, instantiate_probes, ConfuserProbe};
use super::descriptor::type_descriptor;
use crate::ddp::Message;
use crate::errors::{ConfuserError, DdpError, DdpResult};
use crate::probe::{
    DiscardMatching, MessageGenerator, OrchestratorOptions, ProbeInput, ProbeOrchestrator,
    ProbeTransport, ReplyFilter, RunReport, VecSource,
};

impl ProbeInput for ConfuserProbe {
    fn probe_name(&self) -> String {
        self.name.clone()
    }
}

/// Builds each probe's message from the template
#[derive(Debug, Clone)]
pub struct ConfuserGenerator {
    template: Message,
}

impl ConfuserGenerator {
    pub fn new(template: Message) -> Self {
        Self { template }
    }
}

impl MessageGenerator<ConfuserProbe> for ConfuserGenerator {
    fn generate(&self, probe: &ConfuserProbe) -> DdpResult<Message> {
        let params = self.template.params().unwrap_or_default();
        let confused = apply_probe(params, probe)?;
        let mut message = self.template.clone();
        message.set_params(confused);
        Ok(message)
    }
}

/// All probes for one `method`/`sub` template: the unmodified baseline
/// first, then one probe per single-field type swap
pub fn confuser_probes(template: &Message) -> Result<Vec<ConfuserProbe>, ConfuserError> {
    if !template.kind().is_client_call() {
        return Err(ConfuserError::UnsupportedTemplate);
    }
    let params = template.params().unwrap_or_default();
    if params.is_empty() {
        return Err(ConfuserError::NoParams {
            name: template.operation_name().unwrap_or_default().to_string(),
        });
    }
    let descriptor = type_descriptor(&Value::Array(params.to_vec()));
    let mut probes = vec![ConfuserProbe::baseline()];
    probes.extend(instantiate_probes(&derive_confusers(&descriptor)));
    Ok(probes)
}

pub fn confuser_orchestrator(
    template: Message,
    filters: Vec<ReplyFilter>,
    options: &OrchestratorOptions,
) -> Result<ProbeOrchestrator<ConfuserProbe>, ConfuserError> {
    let probes = confuser_probes(&template)?;
    let options = OrchestratorOptions {
        label: format!(
            "confuser:{}",
            template.operation_name().unwrap_or_default()
        ),
        ..options.clone()
    };
    Ok(ProbeOrchestrator::with_options(
        VecSource::new(probes),
        ConfuserGenerator::new(template),
        DiscardMatching::new(filters),
        options,
    ))
}

/// Parse templates given as a JSON array or as one JSON object per line
pub fn parse_templates(text: &str) -> DdpResult<Vec<Message>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return Ok(serde_json::from_str(trimmed)?);
    }
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| serde_json::from_str(line).map_err(DdpError::from))
        .collect()
}

pub async fn load_templates(path: impl AsRef<Path>) -> DdpResult<Vec<Message>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    parse_templates(&text)
}

/// Canonical JSON of a template, used as the campaign result key
fn template_key(template: &Message) -> String {
    serde_json::to_string(template).unwrap_or_else(|_| format!("{:?}", template))
}

/// Run one confuser per template concurrently over a shared connection.
/// Templates without parameters are skipped, repeated templates run once.
pub async fn run_campaign<T>(
    transport: &T,
    templates: Vec<Message>,
    filters: Vec<ReplyFilter>,
    options: &OrchestratorOptions,
) -> BTreeMap<String, RunReport>
where
    T: ProbeTransport + ?Sized,
{
    let mut orchestrators = Vec::new();
    let mut seen = HashSet::new();
    for template in templates {
        let key = template_key(&template);
        if !seen.insert(key.clone()) {
            warn!("[Confuser] Skipping repeated template: {}", key);
            continue;
        }
        match confuser_orchestrator(template, filters.clone(), options) {
            Ok(orchestrator) => orchestrators.push((key, orchestrator)),
            Err(e) => warn!("[Confuser] Skipping template: {}", e),
        }
    }
    info!("[Confuser] Running {} templates", orchestrators.len());

    let reports = join_all(
        orchestrators
            .iter_mut()
            .map(|(_, orchestrator)| orchestrator.run(transport)),
    )
    .await;

    orchestrators
        .into_iter()
        .map(|(key, _)| key)
        .zip(reports)
        .collect()
}
