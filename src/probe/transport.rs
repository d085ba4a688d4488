// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::ddp::{ClientConfig, ClientEvent, DdpClient, Message};
use crate::errors::DdpResult;
use crate::retry::{retry_with_backoff, RetryConfig};

/// What an orchestrator needs from a ready connection
pub trait ProbeTransport: Send + Sync {
    fn allocate_id(&self) -> String;
    fn subscribe(&self) -> mpsc::UnboundedReceiver<ClientEvent>;
    fn send(&self, message: Message) -> DdpResult<()>;
    fn close(&self);
}

impl ProbeTransport for DdpClient {
    fn allocate_id(&self) -> String {
        DdpClient::allocate_id(self)
    }

    fn subscribe(&self) -> mpsc::UnboundedReceiver<ClientEvent> {
        DdpClient::subscribe(self)
    }

    fn send(&self, message: Message) -> DdpResult<()> {
        DdpClient::send(self, message)
    }

    fn close(&self) {
        DdpClient::close(self)
    }
}

/// Opens fresh connections for the recycling driver. `open` resolves only
/// once the new connection is ready.
#[async_trait]
pub trait Connector: Send + Sync {
    type Transport: ProbeTransport + 'static;

    async fn open(&self) -> DdpResult<Self::Transport>;
}

/// Opens real DDP connections, retrying transient failures
#[derive(Debug, Clone)]
pub struct DdpConnector {
    config: ClientConfig,
    retry: RetryConfig,
}

impl DdpConnector {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }
}

#[async_trait]
impl Connector for DdpConnector {
    type Transport = DdpClient;

    async fn open(&self) -> DdpResult<DdpClient> {
        retry_with_backoff(&self.retry, "ddp_connect", || {
            DdpClient::connect(self.config.clone())
        })
        .await
    }
}
