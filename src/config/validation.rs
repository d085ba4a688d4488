// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use validator::Validate;

use super::core::AppConfig;
use crate::ddp::endpoint::{resolve_ws_url, ProxyAddr};

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_app_config(config: &AppConfig) -> Result<()> {
        config.validate()
            .context("Configuration validation failed")?;

        Self::validate_target_config(config)?;
        Self::validate_filter_config(config)?;

        Ok(())
    }

    fn validate_target_config(config: &AppConfig) -> Result<()> {
        let target = &config.target;

        if let Some(url) = &target.url {
            if url.trim().is_empty() {
                return Err(anyhow::anyhow!("Target URL cannot be empty"));
            }
            resolve_ws_url(url).context("Invalid target URL")?;
        }

        if let Some(proxy) = &target.proxy {
            ProxyAddr::parse(proxy).context("Invalid proxy address")?;
        }

        target.credentials().context("Invalid target credentials")?;

        Ok(())
    }

    fn validate_filter_config(config: &AppConfig) -> Result<()> {
        let filters = &config.filters;
        let lists = [
            ("method_not_found", &filters.method_not_found),
            ("publication_not_found", &filters.publication_not_found),
            ("confuser_match_failed", &filters.confuser_match_failed),
            ("user_not_found", &filters.user_not_found),
            ("incorrect_password", &filters.incorrect_password),
        ];

        for (name, list) in lists {
            if list.iter().any(|f| f.code.is_none() && f.reason.is_none()) {
                return Err(anyhow::anyhow!(
                    "Filter in {} needs a code or a reason",
                    name
                ));
            }
        }

        Ok(())
    }
}
