// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod core;
pub mod loader;
pub mod targets;
pub mod validation;

pub use core::{AppConfig, CaptureConfig, ClientOptions, FilterConfig, ProbingConfig};

pub use loader::{apply_overrides, load_default_config, ConfigFormat, ConfigLoader};

pub use targets::TargetConfig;

pub use validation::ConfigValidator;

use anyhow::{Context, Result};
use std::path::Path;

use crate::capture::CaptureScanner;
use crate::ddp::ClientConfig;

/// Load from `config_path` when given, otherwise start from defaults.
/// Environment overrides apply either way.
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    match config_path {
        Some(path) => ConfigLoader::new(path)?.load_config(),
        None => load_default_config(),
    }
}

impl AppConfig {
    /// Connection settings for the configured target
    pub fn client_config(&self) -> Result<ClientConfig> {
        let url = self
            .target
            .url
            .clone()
            .context("No target URL configured (set target.url, DDP_URL or --url)")?;

        let mut config = ClientConfig::new(url);
        config.credentials = self.target.credentials()?;
        config.proxy = self.target.proxy.clone();
        config.auto_connect = self.client.auto_connect;
        config.auto_pong = self.client.auto_pong;
        config.track_collections = self.client.track_collections;
        config.connect_timeout = self.client.connect_timeout();
        Ok(config)
    }

    pub fn capture_scanner(&self) -> CaptureScanner {
        CaptureScanner::new()
            .with_page_size(self.capture.page_size)
            .include_ping_pong(self.capture.include_ping_pong)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ddp::Credentials;
    use std::time::Duration;

    #[test]
    fn test_client_config_requires_url() {
        assert!(AppConfig::default().client_config().is_err());
    }

    #[test]
    fn test_client_config_mapping() {
        let mut config = AppConfig::default();
        config.target.url = Some("https://app.example.com".into());
        config.target.token = Some("tok".into());
        config.target.proxy = Some("127.0.0.1:8080".into());
        config.client.auto_pong = false;
        config.client.connect_timeout_secs = 4;

        let client = config.client_config().unwrap();
        assert_eq!(client.endpoint, "https://app.example.com");
        assert_eq!(client.credentials, Some(Credentials::Token { token: "tok".into() }));
        assert_eq!(client.proxy.as_deref(), Some("127.0.0.1:8080"));
        assert!(!client.auto_pong);
        assert_eq!(client.connect_timeout, Duration::from_secs(4));
    }
}
