// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Composite Scorer
// ─────────────────────────────────────────────────────────────────────
//! Weighted fusion of the five per-answer sub-scores.
//!
//! The composite is `Σ w_i · f_i(x_i)` over available components, where
//! `f_i` is `sqrt` for grounding and citation when the fairness transform
//! is on and the identity otherwise. An optional adequacy bonus rewards
//! answers whose grounding, numeric and entropy scores all clear loose
//! floors. Both adjustments are monotone, so raising any single sub-score
//! never lowers the composite.

use fhri_types::score::clamp_score;
use fhri_types::{Component, ComponentContribution, FusionConfig, SubScoreSet, WeightVector};

/// Toggles and constants for the composite score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringOptions {
    pub fairness_transform: bool,
    pub adequacy_bonus_enabled: bool,
    pub adequacy_bonus: f64,
    pub grounding_floor: f64,
    pub numeric_floor: f64,
    pub entropy_floor: f64,
}

impl From<&FusionConfig> for ScoringOptions {
    fn from(config: &FusionConfig) -> Self {
        Self {
            fairness_transform: config.fairness_transform,
            adequacy_bonus_enabled: config.adequacy_bonus_enabled,
            adequacy_bonus: config.adequacy_bonus,
            grounding_floor: config.adequacy_grounding_floor,
            numeric_floor: config.adequacy_numeric_floor,
            entropy_floor: config.adequacy_entropy_floor,
        }
    }
}

impl Default for ScoringOptions {
    fn default() -> Self {
        Self::from(&FusionConfig::default())
    }
}

/// Composite score with its per-component breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreBreakdown {
    pub score: f64,
    pub contributions: Vec<ComponentContribution>,
    pub adequacy_bonus_applied: bool,
}

/// Stateless composite scorer.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompositeScorer {
    options: ScoringOptions,
}

impl CompositeScorer {
    pub fn new(options: ScoringOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(ScoringOptions::from(config))
    }

    pub fn options(&self) -> &ScoringOptions {
        &self.options
    }

    /// Per-component transform applied before weighting.
    pub fn transform(&self, component: Component, value: f64) -> f64 {
        match component {
            Component::Grounding | Component::Citation if self.options.fairness_transform => {
                value.sqrt()
            }
            _ => value,
        }
    }

    fn qualifies_for_bonus(&self, subscores: &SubScoreSet) -> bool {
        if !self.options.adequacy_bonus_enabled {
            return false;
        }
        matches!(
            (subscores.grounding, subscores.numeric, subscores.entropy),
            (Some(g), Some(n), Some(e))
                if g > self.options.grounding_floor
                    && n > self.options.numeric_floor
                    && e > self.options.entropy_floor
        )
    }

    /// Composite score and breakdown.
    ///
    /// `weights` should already be resolved against `subscores`; a
    /// component with a weight but no value contributes nothing.
    pub fn breakdown(&self, weights: &WeightVector, subscores: &SubScoreSet) -> ScoreBreakdown {
        let subscores = subscores.clamped();
        let mut contributions = Vec::with_capacity(Component::ALL.len());
        let mut total = 0.0;

        for (component, raw) in subscores.available() {
            let weight = weights.get(component);
            let transformed = self.transform(component, raw);
            let contribution = weight * transformed;
            total += contribution;
            contributions.push(ComponentContribution {
                component,
                raw,
                transformed,
                weight,
                contribution,
            });
        }

        let adequacy_bonus_applied = self.qualifies_for_bonus(&subscores);
        if adequacy_bonus_applied {
            total += self.options.adequacy_bonus;
        }

        ScoreBreakdown {
            score: clamp_score(total, 0.0, 1.0),
            contributions,
            adequacy_bonus_applied,
        }
    }

    /// Composite score only.
    pub fn score(&self, weights: &WeightVector, subscores: &SubScoreSet) -> f64 {
        self.breakdown(weights, subscores).score
    }
}
