// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - DDP Assessment Library
 * Exposes the DDP client, probe orchestration, confuser and capture modules
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

pub mod config;

// Error handling and resilience
pub mod errors;
pub mod retry;

// Protocol transport
pub mod ddp;

// Probe orchestration and attack presets
pub mod probe;

// Type-confusion fuzzing
pub mod confuser;

// Capture file recovery
pub mod capture;

pub mod replay;

pub mod str_utils;

pub use errors::{ConfuserError, DdpError, DdpResult};
