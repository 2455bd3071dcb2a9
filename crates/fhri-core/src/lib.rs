// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Core Engine
// (C) 1998-2026 Miroslav Sotek. All rights reserved.
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
#![deny(unsafe_code)]
//! Scenario-aware composite reliability scoring and cross-turn
//! contradiction fusion for finance answers.
//!
//! # Invariants
//!
//! 1. **Scores are bounded**: every sub-score is clamped to [0, 1] on
//!    entry (NaN counts as missing) and the composite is clamped after
//!    the adequacy bonus.
//!
//! 2. **The high-risk floor dominates**: a high-risk answer below the
//!    floor is never labelled accurate, whatever the scenario threshold,
//!    hysteresis state or contradiction outcome.
//!
//! 3. **Fusion order is fixed**: topical gate, comparative discount,
//!    numeric override, paraphrase suppression. A gated turn pair is
//!    "not applicable", never "consistent".
//!
//! 4. **State only moves forward on success**: a turn that fails (no
//!    sub-score at all) leaves its `ConversationState` untouched.

pub mod contradiction;
pub mod decision;
pub mod engine;
pub mod labels;
pub mod scenario;
pub mod scorer;
pub mod session;
pub mod signals;
pub mod smoother;
pub mod text;
pub mod weights;

pub use contradiction::{ContradictionFusion, FusionOptions};
pub use decision::{
    best_by_f1, sweep_thresholds, CalibrationSample, Decision, DecisionEngine, SweepPoint,
    ThresholdGrid, MAX_GRID_POINTS,
};
pub use engine::{ReliabilityEngine, TurnInput};
pub use labels::{LabelResolver, Resolution};
pub use scenario::{Classification, ScenarioClassifier, ScenarioSource};
pub use scorer::{CompositeScorer, ScoreBreakdown, ScoringOptions};
pub use session::{SessionHandle, SessionRegistry};
pub use signals::{
    ContradictionSignals, ExternalNli, ExternalSimilarity, HeuristicNli, LexicalSimilarity,
    NliBackend, SignalProviders, SimilarityBackend,
};
pub use smoother::{LabelHysteresis, TemporalSmoother};
