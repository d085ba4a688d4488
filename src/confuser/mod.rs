// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Structural type-confusion fuzzing derived from example messages.

pub mod derive;
pub mod descriptor;
pub mod probe;

pub use derive::{
    apply_probe, derive_confusers, instantiate_probes, sample_value, AccessPath, Confuser,
    ConfuserProbe, PathSegment, BASELINE_PROBE,
};
pub use descriptor::{type_descriptor, types_equal, TypeDescriptor, ValueKind};
pub use probe::{
    confuser_orchestrator, confuser_probes, load_templates, parse_templates, run_campaign,
    ConfuserGenerator,
};
