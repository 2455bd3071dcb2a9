// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Types
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Data model, configuration, and error hierarchy for the FHRI
//! reliability kernel: the fusion engine that turns per-answer
//! sub-scores and cross-turn contradiction signals into a trust label.

pub mod config;
pub mod error;
pub mod scenario;
pub mod score;

pub use config::FusionConfig;
pub use error::{FusionError, FusionResult};
pub use scenario::{Component, Scenario, ScenarioProfile, ScenarioTable, WeightVector};
pub use score::{
    clamp_score, clamp_signal, CompositeResult, ComponentContribution, ContradictionAssessment,
    ContradictionLevel, ConversationState, FinalLabel, FusionStep, Label, ReliabilityBand,
    ReliabilityReport, ResolvedWeights, SkipReason, SubScoreSet, Turn,
};
