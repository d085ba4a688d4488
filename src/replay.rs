// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Message Replay
 * Forward one message over a transient connection and return the answer
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::ddp::{ClientConfig, ClientEvent, CollectionSnapshot, DdpClient, Message};
use crate::errors::{DdpError, DdpResult};

/// The correlated reply, bundled with the synchronized collections when
/// the exchange produced any
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum ReplayOutcome {
    Reply(Message),
    Bundle {
        #[serde(rename = "finalMessage")]
        final_message: Message,
        collections: CollectionSnapshot,
    },
}

impl ReplayOutcome {
    pub fn reply(&self) -> &Message {
        match self {
            ReplayOutcome::Reply(message) => message,
            ReplayOutcome::Bundle { final_message, .. } => final_message,
        }
    }
}

/// Send `message` with a fresh correlation id on a new connection and wait
/// up to `wait` for its reply. The connection is closed afterwards.
pub async fn forward_message(
    config: &ClientConfig,
    message: Message,
    wait: Duration,
) -> DdpResult<ReplayOutcome> {
    let client = DdpClient::connect(config.clone()).await?;
    let result = exchange(&client, message, wait).await;
    client.close();
    result
}

async fn exchange(client: &DdpClient, mut message: Message, wait: Duration) -> DdpResult<ReplayOutcome> {
    let id = client.allocate_id();
    if !message.set_request_id(id.clone()) {
        return Err(DdpError::Codec(format!(
            "cannot replay a '{}' message; only method and sub expect a reply",
            message.kind()
        )));
    }

    let mut events = client.subscribe();
    info!(
        "[DDP] Replaying {} '{}'",
        message.kind(),
        message.operation_name().unwrap_or_default()
    );
    client.send(message)?;

    let endpoint = client.endpoint().to_string();
    let reply = tokio::time::timeout(wait, async {
        loop {
            match events.recv().await {
                Some(ClientEvent::Message(reply)) if reply.correlation_id() == Some(id.as_str()) => {
                    return Ok(reply);
                }
                Some(ClientEvent::Error(reason)) => return Err(DdpError::transport(&endpoint, reason)),
                Some(ClientEvent::Closed { reason }) => return Err(DdpError::transport(&endpoint, reason)),
                Some(_) => continue,
                None => return Err(DdpError::NotConnected),
            }
        }
    })
    .await
    .map_err(|_| DdpError::Timeout { duration: wait })??;

    let collections = client.collections();
    debug!("[DDP] Replay answered; snapshot empty: {}", collections.is_empty());
    if collections.is_empty() {
        Ok(ReplayOutcome::Reply(reply))
    } else {
        Ok(ReplayOutcome::Bundle {
            final_message: reply,
            collections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_serialization() {
        let reply = Message::Result {
            id: "1".into(),
            error: None,
            result: Some(json!(2)),
        };
        assert_eq!(
            serde_json::to_value(ReplayOutcome::Reply(reply.clone())).unwrap(),
            json!({"msg": "result", "id": "1", "result": 2})
        );

        let mut collections = CollectionSnapshot::new();
        collections.apply(&serde_json::from_value(json!({"msg": "added", "collection": "c", "id": "x"})).unwrap());
        let bundle = ReplayOutcome::Bundle {
            final_message: reply,
            collections,
        };
        let value = serde_json::to_value(&bundle).unwrap();
        assert_eq!(value["finalMessage"]["id"], "1");
        assert_eq!(value["collections"]["c"][0]["_id"], "x");
        assert_eq!(bundle.reply().correlation_id(), Some("1"));
    }
}
