// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use validator::Validate;

use super::targets::TargetConfig;
use crate::capture::{default_ignored_operations, DEFAULT_PAGE_SIZE};
use crate::probe::{OrchestratorOptions, ReplyFilter};
use crate::retry::RetryConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct AppConfig {
    #[serde(default)]
    #[validate(nested)]
    pub target: TargetConfig,

    #[serde(default)]
    #[validate(nested)]
    pub client: ClientOptions,

    #[serde(default)]
    #[validate(nested)]
    pub probing: ProbingConfig,

    #[serde(default)]
    #[validate(nested)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub filters: FilterConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ClientOptions {
    #[serde(default = "default_true")]
    pub auto_connect: bool,

    #[serde(default = "default_true")]
    pub auto_pong: bool,

    #[serde(default = "default_true")]
    pub track_collections: bool,

    #[validate(range(min = 1, max = 600))]
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Attempts per connection open, the first one included
    #[validate(range(min = 1, max = 20))]
    #[serde(default = "default_open_retries")]
    pub open_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProbingConfig {
    /// In-flight ceiling per orchestrator; 0 = unbounded
    #[validate(range(max = 10000))]
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Partitioned orchestrators per wordlist buster
    #[validate(range(min = 1, max = 256))]
    #[serde(default = "default_parallelism")]
    pub parallelism: usize,

    #[serde(default)]
    pub record_absent_answers: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CaptureConfig {
    #[validate(range(min = 64))]
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    #[serde(default)]
    pub include_ping_pong: bool,

    #[serde(default = "default_ignored_operations")]
    pub ignored_operations: Vec<String>,
}

/// Uninteresting replies per attack
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_not_found")]
    pub method_not_found: Vec<ReplyFilter>,

    #[serde(default = "default_not_found")]
    pub publication_not_found: Vec<ReplyFilter>,

    #[serde(default = "default_match_failed")]
    pub confuser_match_failed: Vec<ReplyFilter>,

    #[serde(default = "default_user_not_found")]
    pub user_not_found: Vec<ReplyFilter>,

    #[serde(default = "default_incorrect_password")]
    pub incorrect_password: Vec<ReplyFilter>,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            auto_connect: true,
            auto_pong: true,
            track_collections: true,
            connect_timeout_secs: default_connect_timeout(),
            open_retries: default_open_retries(),
        }
    }
}

impl Default for ProbingConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            parallelism: default_parallelism(),
            record_absent_answers: false,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            include_ping_pong: false,
            ignored_operations: default_ignored_operations(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            method_not_found: default_not_found(),
            publication_not_found: default_not_found(),
            confuser_match_failed: default_match_failed(),
            user_not_found: default_user_not_found(),
            incorrect_password: default_incorrect_password(),
        }
    }
}

impl ClientOptions {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn retry(&self) -> RetryConfig {
        RetryConfig::default().with_max_attempts(self.open_retries)
    }
}

impl ProbingConfig {
    pub fn orchestrator_options(&self) -> OrchestratorOptions {
        OrchestratorOptions {
            concurrency: self.concurrency,
            record_absent: self.record_absent_answers,
            ..OrchestratorOptions::default()
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_open_retries() -> u32 {
    3
}

fn default_concurrency() -> usize {
    5
}

fn default_parallelism() -> usize {
    1
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_not_found() -> Vec<ReplyFilter> {
    vec![ReplyFilter::not_found()]
}

fn default_match_failed() -> Vec<ReplyFilter> {
    vec![ReplyFilter::match_failed()]
}

fn default_user_not_found() -> Vec<ReplyFilter> {
    vec![ReplyFilter::user_not_found()]
}

fn default_incorrect_password() -> Vec<ReplyFilter> {
    vec![ReplyFilter::incorrect_password()]
}
