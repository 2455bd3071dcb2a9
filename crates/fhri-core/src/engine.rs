// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Reliability Engine
// ─────────────────────────────────────────────────────────────────────
//! Per-turn pipeline:
//!
//! classifier → weight resolver → composite scorer → contradiction fusion
//! → temporal smoother → decision (hysteresis, high-risk floor) → label
//! resolver.
//!
//! The decision runs after fusion so that a turn gated as unrelated to
//! the previous one does not inherit the previous label through
//! hysteresis.
//!
//! The engine itself is immutable and shareable across threads. The only
//! state that survives a turn is the caller's `ConversationState`, which
//! is left untouched when evaluation fails.

use fhri_types::{
    CompositeResult, ConversationState, FusionConfig, FusionResult, ReliabilityBand,
    ReliabilityReport, Scenario, SkipReason, SubScoreSet, Turn,
};

use crate::contradiction::{step_warnings, ContradictionFusion};
use crate::decision::DecisionEngine;
use crate::labels::LabelResolver;
use crate::scenario::ScenarioClassifier;
use crate::scorer::CompositeScorer;
use crate::session::SessionRegistry;
use crate::signals::{ContradictionSignals, SignalProviders};
use crate::smoother::TemporalSmoother;
use crate::weights;

/// Everything known about one turn before fusion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TurnInput {
    pub question: String,
    pub answer: String,
    pub subscores: SubScoreSet,
    pub high_risk: bool,
    /// Scenario name forced by the caller; invalid names are ignored.
    pub scenario_override: Option<String>,
    /// Contradiction signals against the previous turn's answer.
    pub signals: ContradictionSignals,
}

impl TurnInput {
    pub fn new(question: impl Into<String>, answer: impl Into<String>, subscores: SubScoreSet) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            subscores,
            ..Default::default()
        }
    }

    pub fn high_risk(mut self, high_risk: bool) -> Self {
        self.high_risk = high_risk;
        self
    }

    pub fn with_scenario(mut self, scenario: impl Into<String>) -> Self {
        self.scenario_override = Some(scenario.into());
        self
    }

    pub fn with_signals(mut self, signals: ContradictionSignals) -> Self {
        self.signals = signals;
        self
    }
}

pub struct ReliabilityEngine {
    config: FusionConfig,
    classifier: ScenarioClassifier,
    scorer: CompositeScorer,
    decision: DecisionEngine,
    fusion: ContradictionFusion,
    smoother: TemporalSmoother,
    resolver: LabelResolver,
}

impl ReliabilityEngine {
    /// Build an engine. Fails on an invalid configuration.
    pub fn new(config: FusionConfig) -> FusionResult<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: FusionConfig) -> Self {
        Self {
            classifier: ScenarioClassifier::new(config.scenarios.clone()),
            scorer: CompositeScorer::from_config(&config),
            decision: DecisionEngine::from_config(&config),
            fusion: ContradictionFusion::from_config(&config),
            smoother: TemporalSmoother::from_config(&config),
            resolver: LabelResolver::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ScenarioClassifier {
        &self.classifier
    }

    /// Display band for a composite score.
    pub fn band(&self, score: f64) -> ReliabilityBand {
        if score >= self.config.band_high {
            ReliabilityBand::High
        } else if score >= self.config.band_moderate {
            ReliabilityBand::Moderate
        } else {
            ReliabilityBand::Low
        }
    }

    /// Evaluate one turn against the conversation so far.
    pub fn evaluate(&self, state: &mut ConversationState, input: &TurnInput) -> FusionResult<ReliabilityReport> {
        let classification = self
            .classifier
            .classify(&input.question, input.scenario_override.as_deref());
        let scenario = classification.scenario;
        let mut warnings = classification.warnings;

        let subscores = input.subscores.clamped();
        let resolved = weights::resolve(&classification.profile.weights, &subscores)?;
        warnings.extend(weights::renormalization_warning(&resolved));

        let breakdown = self.scorer.breakdown(&resolved.weights, &subscores);
        let score = breakdown.score;
        let composite_warnings = warnings.clone();

        if !self.smoother.is_consistent(state) {
            log::warn!(
                "Conversation history of {} exceeds window {}, starting fresh",
                state.history.len(),
                self.smoother.window()
            );
            warnings.push("stale conversation state: history reset".to_string());
            state.reset();
        }

        let current = Turn::new(input.question.as_str(), input.answer.as_str());
        let mut contradiction = state
            .previous_turn
            .as_ref()
            .map(|prev| self.fusion.fuse(&input.signals, prev, &current));
        if let Some(assessment) = contradiction.as_mut() {
            if !assessment.is_gated() {
                assessment.smoothed = Some(self.smoother.smooth(state, assessment.adjusted));
            }
            warnings.extend(step_warnings(assessment));
        }

        // A held label only carries over within the same scenario and topic.
        let unrelated = contradiction
            .as_ref()
            .is_some_and(|a| a.skip_reason == Some(SkipReason::UnrelatedContext));
        let previous = state
            .last_label
            .filter(|_| state.last_scenario == Some(scenario) && !unrelated);
        let decision = self
            .decision
            .decide_with_history(score, scenario, input.high_risk, previous);
        if decision.floor_applied {
            warnings.push(format!(
                "high-risk floor {:.2} applied",
                self.decision.high_risk_floor()
            ));
        }

        let bar = self.config.acceptance_bar(scenario, input.high_risk);
        let resolution = self
            .resolver
            .resolve(decision.label, contradiction.as_ref(), score, bar);
        if let Some(assessment) = contradiction.as_mut() {
            assessment.level = resolution.level;
        }
        warnings.extend(resolution.warnings);

        state.last_label = Some(decision.label);
        state.last_scenario = Some(scenario);
        state.previous_turn = Some(current);
        state.turns += 1;

        log::info!(
            "Turn {}: scenario {scenario}, composite {score:.4}, base {:?}, final {}",
            state.turns,
            decision.label,
            resolution.label
        );

        Ok(ReliabilityReport {
            scenario,
            composite: CompositeResult {
                score,
                label: decision.label,
                weights_used: resolved,
                breakdown: breakdown.contributions,
                adequacy_bonus_applied: breakdown.adequacy_bonus_applied,
                high_risk: input.high_risk,
                warnings: composite_warnings,
            },
            band: self.band(score),
            label: resolution.label,
            warnings,
            contradiction,
        })
    }

    /// [`evaluate`](Self::evaluate) with contradiction signals computed by
    /// `providers` instead of supplied by the caller.
    pub fn evaluate_with_providers(
        &self,
        state: &mut ConversationState,
        input: &TurnInput,
        providers: &SignalProviders,
    ) -> FusionResult<ReliabilityReport> {
        let Some(prev) = state.previous_turn.clone() else {
            return self.evaluate(state, input);
        };
        let current = Turn::new(input.question.as_str(), input.answer.as_str());
        let (signals, signal_warnings) = providers.contradiction_signals(&prev, &current);

        let input = input.clone().with_signals(signals);
        let mut report = self.evaluate(state, &input)?;
        let mut warnings = signal_warnings;
        warnings.append(&mut report.warnings);
        report.warnings = warnings;
        Ok(report)
    }

    /// [`evaluate`](Self::evaluate) against a registry-owned session.
    /// Turns of one session are serialized by its lock.
    pub fn evaluate_in_session(
        &self,
        registry: &SessionRegistry,
        session_id: &str,
        input: &TurnInput,
    ) -> FusionResult<ReliabilityReport> {
        let handle = registry.checkout(session_id);
        let mut state = handle.state.lock();
        let mut report = self.evaluate(&mut state, input)?;
        if let Some(warning) = handle.reset_warning {
            report.warnings.insert(0, warning);
        }
        Ok(report)
    }

    /// Scenario a question would be scored under, without scoring it.
    pub fn scenario_for(&self, question: &str, manual_override: Option<&str>) -> Scenario {
        self.classifier.classify(question, manual_override).scenario
    }
}

impl Default for ReliabilityEngine {
    fn default() -> Self {
        Self::build(FusionConfig::default())
    }
}
