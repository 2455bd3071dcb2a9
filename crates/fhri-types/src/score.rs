// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Score, Label and Assessment Types
// ─────────────────────────────────────────────────────────────────────

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::scenario::{Component, Scenario, WeightVector};

/// Clamp a value to [lo, hi], mapping NaN to lo and Inf to nearest bound.
#[inline]
pub fn clamp_score(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        log::warn!("clamp_score: NaN detected, clamping to {lo:.4}");
        return lo;
    }
    if value.is_infinite() {
        let boundary = if value > 0.0 { hi } else { lo };
        log::warn!("clamp_score: Inf detected, clamping to {boundary:.4}");
        return boundary;
    }
    value.clamp(lo, hi)
}

/// Clamp an optional signal to [0, 1]. NaN becomes `None`: an
/// unreadable signal is treated as missing, not as zero.
#[inline]
pub fn clamp_signal(value: Option<f64>) -> Option<f64> {
    match value {
        Some(v) if v.is_nan() => {
            log::warn!("clamp_signal: NaN signal treated as unavailable");
            None
        }
        Some(v) => Some(clamp_score(v, 0.0, 1.0)),
        None => None,
    }
}

/// Up to five optional per-answer sub-scores in [0, 1].
///
/// `None` means the upstream computation was skipped, timed out, or does
/// not apply to this scenario.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubScoreSet {
    pub grounding: Option<f64>,
    pub numeric: Option<f64>,
    pub temporal: Option<f64>,
    pub citation: Option<f64>,
    pub entropy: Option<f64>,
}

impl SubScoreSet {
    /// All five components present.
    pub fn full(grounding: f64, numeric: f64, temporal: f64, citation: f64, entropy: f64) -> Self {
        Self {
            grounding: Some(grounding),
            numeric: Some(numeric),
            temporal: Some(temporal),
            citation: Some(citation),
            entropy: Some(entropy),
        }
    }

    pub fn get(&self, component: Component) -> Option<f64> {
        match component {
            Component::Grounding => self.grounding,
            Component::Numeric => self.numeric,
            Component::Temporal => self.temporal,
            Component::Citation => self.citation,
            Component::Entropy => self.entropy,
        }
    }

    pub fn set(&mut self, component: Component, value: Option<f64>) {
        match component {
            Component::Grounding => self.grounding = value,
            Component::Numeric => self.numeric = value,
            Component::Temporal => self.temporal = value,
            Component::Citation => self.citation = value,
            Component::Entropy => self.entropy = value,
        }
    }

    /// Same set with every value clamped to [0, 1] and NaN dropped.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for component in Component::ALL {
            out.set(component, clamp_signal(self.get(component)));
        }
        out
    }

    pub fn available(&self) -> impl Iterator<Item = (Component, f64)> + '_ {
        Component::ALL
            .into_iter()
            .filter_map(|c| self.get(c).map(|v| (c, v)))
    }

    pub fn missing(&self) -> Vec<Component> {
        Component::ALL
            .into_iter()
            .filter(|c| self.get(*c).is_none())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        Component::ALL.iter().all(|c| self.get(*c).is_none())
    }
}

/// Base label from thresholding the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Accurate,
    Hallucination,
}

/// Final label after the contradiction channel is reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalLabel {
    Accurate,
    Hallucination,
    Contradiction,
    SelfCorrection,
}

impl From<Label> for FinalLabel {
    fn from(label: Label) -> Self {
        match label {
            Label::Accurate => FinalLabel::Accurate,
            Label::Hallucination => FinalLabel::Hallucination,
        }
    }
}

impl fmt::Display for FinalLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FinalLabel::Accurate => "accurate",
            FinalLabel::Hallucination => "hallucination",
            FinalLabel::Contradiction => "contradiction",
            FinalLabel::SelfCorrection => "self-correction",
        })
    }
}

/// Display band of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReliabilityBand {
    High,
    Moderate,
    Low,
}

/// Weight vector actually applied after dropping missing components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedWeights {
    pub weights: WeightVector,
    /// Components dropped because their sub-score was missing.
    pub dropped: Vec<Component>,
    /// True whenever any component was dropped.
    pub renormalized: bool,
}

/// One row of the component breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ComponentContribution {
    pub component: Component,
    /// Sub-score as supplied.
    pub raw: f64,
    /// Sub-score after the fairness transform (equal to `raw` if off).
    pub transformed: f64,
    pub weight: f64,
    /// `weight * transformed`.
    pub contribution: f64,
}

/// Composite reliability for one answer. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeResult {
    /// Composite (FHRI) score in [0, 1].
    pub score: f64,
    pub label: Label,
    pub weights_used: ResolvedWeights,
    pub breakdown: Vec<ComponentContribution>,
    pub adequacy_bonus_applied: bool,
    pub high_risk: bool,
    pub warnings: Vec<String>,
}

/// One conversational turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Why contradiction evaluation was gated off for a turn pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Questions are neither semantically close nor share terms.
    UnrelatedContext,
    /// No raw contradiction score was available.
    NliUnavailable,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnrelatedContext => "unrelated-context",
            SkipReason::NliUnavailable => "nli-unavailable",
        }
    }
}

/// Adjustment steps of the contradiction fusion, in application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionStep {
    TopicalGate,
    DirectionalDiscount,
    ComparativeDiscount,
    NumericOverride,
    ParaphraseSuppression,
}

/// Outcome of the contradiction channel for a turn pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContradictionLevel {
    /// Evaluation was gated off; neither consistent nor contradictory.
    NotApplicable,
    Consistent,
    PossibleInconsistency,
    Contradiction,
}

/// Contradiction assessment for (previous answer, current answer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContradictionAssessment {
    /// Raw NLI contradiction score (0.0 if unavailable).
    pub raw: f64,
    /// Score after discounts, override and suppression.
    pub adjusted: f64,
    /// EMA-smoothed score; `None` until the smoother has run or when gated.
    pub smoothed: Option<f64>,
    pub comparative_intent: bool,
    pub skip_reason: Option<SkipReason>,
    /// Steps that fired, in order.
    pub steps: Vec<FusionStep>,
    pub level: ContradictionLevel,
}

impl ContradictionAssessment {
    pub fn is_gated(&self) -> bool {
        self.skip_reason.is_some()
    }

    pub fn fired(&self, step: FusionStep) -> bool {
        self.steps.contains(&step)
    }
}

/// Per-conversation state carried between turns.
///
/// Owned by the caller's session; the only state that outlives a request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    /// Recent contradiction scores fed to the smoother, oldest first.
    pub history: VecDeque<f64>,
    /// Most recent smoothed contradiction score.
    pub smoothed: Option<f64>,
    /// Most recent base label, for hysteresis.
    pub last_label: Option<Label>,
    /// Scenario `last_label` was decided under. Hysteresis only holds a
    /// label within the same scenario.
    #[serde(default)]
    pub last_scenario: Option<Scenario>,
    /// Previous turn, compared against the next one.
    pub previous_turn: Option<Turn>,
    pub turns: u64,
}

impl ConversationState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fresh(&self) -> bool {
        self.turns == 0
    }

    /// Drop everything and start over as a first turn.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Final per-turn output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityReport {
    pub scenario: Scenario,
    pub composite: CompositeResult,
    pub band: ReliabilityBand,
    pub label: FinalLabel,
    pub warnings: Vec<String>,
    pub contradiction: Option<ContradictionAssessment>,
}
