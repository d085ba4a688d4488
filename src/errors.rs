// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DDP Error Types
 * Connection-scope and probe-scope failures with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::time::Duration;
use thiserror::Error;

/// Main error type for DDP transport, probing and capture recovery
#[derive(Error, Debug)]
pub enum DdpError {
    /// Socket-level error or a protocol-level `failed` message
    #[error("Transport failure on {endpoint}: {reason}")]
    TransportFailure {
        endpoint: String,
        reason: String,
    },

    /// Credentials or resume token refused by the server
    #[error("Login rejected: {reason}")]
    LoginRejected {
        reason: String,
    },

    /// A single input could not be turned into an outbound message
    #[error("Probe generation failed for '{input}': {reason}")]
    ProbeGeneration {
        input: String,
        reason: String,
    },

    /// A reply whose correlation id matches no outstanding probe
    #[error("No outstanding probe for correlation id {id}")]
    CorrelationMiss {
        id: String,
    },

    /// Capture marker found without a length-consistent record start
    #[error("Ambiguous capture record at offset {offset}")]
    CaptureParseAmbiguity {
        offset: u64,
    },

    /// Wire encoding or decoding error
    #[error("Codec error: {0}")]
    Codec(String),

    /// Unusable endpoint URL
    #[error("Invalid endpoint {url}: {reason}")]
    Endpoint {
        url: String,
        reason: String,
    },

    /// Upstream proxy refused or broke the tunnel
    #[error("Proxy error via {proxy}: {reason}")]
    Proxy {
        proxy: String,
        reason: String,
    },

    #[error("Operation timed out after {duration:?}")]
    Timeout {
        duration: Duration,
    },

    #[error("DDP client already started")]
    AlreadyStarted,

    #[error("DDP client is not connected")]
    NotConnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while deriving or applying type-confusion probes
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfuserError {
    #[error("Access path {path} does not exist in the parameter tree")]
    InvalidPath {
        path: String,
    },

    #[error("Access path is empty")]
    EmptyPath,

    #[error("Template message '{name}' has no parameters to confuse")]
    NoParams {
        name: String,
    },

    #[error("Template is not a method or subscription message")]
    UnsupportedTemplate,
}

impl DdpError {
    /// Whether this error ends the owning connection (and halts its run)
    pub fn is_connection_fatal(&self) -> bool {
        match self {
            DdpError::TransportFailure { .. } => true,
            DdpError::Endpoint { .. } => true,
            DdpError::Proxy { .. } => true,
            DdpError::Timeout { .. } => true,
            DdpError::NotConnected => true,
            DdpError::Io(_) => true,
            DdpError::LoginRejected { .. } => false,
            DdpError::ProbeGeneration { .. } => false,
            DdpError::CorrelationMiss { .. } => false,
            DdpError::CaptureParseAmbiguity { .. } => false,
            DdpError::Codec(_) => false,
            DdpError::AlreadyStarted => false,
        }
    }

    /// Whether opening a fresh connection may succeed on a later attempt
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DdpError::TransportFailure { .. }
                | DdpError::Timeout { .. }
                | DdpError::Proxy { .. }
                | DdpError::Io(_)
        )
    }

    pub fn transport(endpoint: impl Into<String>, reason: impl ToString) -> Self {
        DdpError::TransportFailure {
            endpoint: endpoint.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for DdpError {
    fn from(err: serde_json::Error) -> Self {
        DdpError::Codec(err.to_string())
    }
}

impl From<ConfuserError> for DdpError {
    fn from(err: ConfuserError) -> Self {
        DdpError::ProbeGeneration {
            input: String::new(),
            reason: err.to_string(),
        }
    }
}

/// Result type for DDP operations
pub type DdpResult<T> = Result<T, DdpError>;
