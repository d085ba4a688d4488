// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Recovery of DDP traffic from capture files.

pub mod scanner;
pub mod targets;

pub use scanner::{CaptureScan, CaptureScanner, DEFAULT_PAGE_SIZE, MESSAGE_MARKER, SENTINEL};
pub use targets::{default_ignored_operations, extract_targets, DumpFilter, IGNORED_OPERATIONS};
