// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Label Resolver
// ─────────────────────────────────────────────────────────────────────
//! Reconciles the base label with the contradiction channel.
//!
//! Priority order:
//! 1. gated contradiction check → base label
//! 2. smoothed ≥ hard, composite ≤ bar → contradiction
//! 3. smoothed ≥ hard, composite > bar → self-correction
//! 4. soft ≤ smoothed < hard → base label + "possible inconsistency"
//! 5. otherwise → base label

use fhri_types::{ContradictionAssessment, ContradictionLevel, FinalLabel, FusionConfig, Label};

/// Classify a contradiction score against the soft/hard thresholds.
pub fn contradiction_level(score: f64, soft: f64, hard: f64) -> ContradictionLevel {
    if score >= hard {
        ContradictionLevel::Contradiction
    } else if score >= soft {
        ContradictionLevel::PossibleInconsistency
    } else {
        ContradictionLevel::Consistent
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub label: FinalLabel,
    pub level: ContradictionLevel,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelResolver {
    soft: f64,
    hard: f64,
}

impl Default for LabelResolver {
    fn default() -> Self {
        Self::from_config(&FusionConfig::default())
    }
}

impl LabelResolver {
    pub fn new(soft: f64, hard: f64) -> Self {
        Self { soft, hard }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(
            config.soft_contradiction_threshold,
            config.hard_contradiction_threshold,
        )
    }

    /// Resolve the final label.
    ///
    /// On a hard contradiction the turn is a self-correction only when
    /// `composite` strictly exceeds `acceptance_bar`, never the bare
    /// scenario threshold. The bar is the scenario threshold raised to
    /// the high-risk floor for high-risk answers (see
    /// `FusionConfig::acceptance_bar`), so a high-risk answer scoring
    /// between the two is a contradiction. `assessment` is `None` on the
    /// first turn.
    pub fn resolve(
        &self,
        base: Label,
        assessment: Option<&ContradictionAssessment>,
        composite: f64,
        acceptance_bar: f64,
    ) -> Resolution {
        let unchanged = |level| Resolution {
            label: base.into(),
            level,
            warnings: Vec::new(),
        };

        let Some(assessment) = assessment else {
            return unchanged(ContradictionLevel::NotApplicable);
        };
        if assessment.is_gated() {
            return unchanged(ContradictionLevel::NotApplicable);
        }

        let smoothed = assessment.smoothed.unwrap_or(assessment.adjusted);
        match contradiction_level(smoothed, self.soft, self.hard) {
            ContradictionLevel::Contradiction => {
                let label = if composite > acceptance_bar {
                    FinalLabel::SelfCorrection
                } else {
                    FinalLabel::Contradiction
                };
                log::info!(
                    "Contradiction {smoothed:.4} >= {}: composite {composite:.4} vs bar {acceptance_bar:.4} -> {label}",
                    self.hard
                );
                Resolution {
                    label,
                    level: ContradictionLevel::Contradiction,
                    warnings: Vec::new(),
                }
            }
            ContradictionLevel::PossibleInconsistency => Resolution {
                label: base.into(),
                level: ContradictionLevel::PossibleInconsistency,
                warnings: vec![format!(
                    "possible inconsistency: smoothed contradiction {smoothed:.3}"
                )],
            },
            level => unchanged(level),
        }
    }
}
