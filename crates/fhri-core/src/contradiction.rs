// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Contradiction Fusion
// ─────────────────────────────────────────────────────────────────────
//! Adjusts a raw cross-turn NLI contradiction score using conversational
//! context.
//!
//! Steps, always in this order (each sees the previous step's output):
//!
//! 1. **Topical gate**: questions that are neither semantically close
//!    nor share a term are unrelated; evaluation is skipped and the
//!    result is "not applicable", never "no contradiction".
//! 2. **Comparative discount**: comparison questions legitimately
//!    produce divergent claims. Opposite directions for different
//!    entities get the strong discount, anything else the mild one.
//! 3. **Numeric override**: NLI models under-score numeric conflicts
//!    with high lexical overlap; a sign flip or large magnitude gap on
//!    the same subject raises the score to the numeric floor.
//! 4. **Paraphrase suppression**: a high score between near-identical
//!    answers is a negation/antonym false positive and is scaled down.
//!
//! Steps that depend on a missing similarity signal are skipped; a
//! missing similarity is never read as 0 or 1.

use fhri_types::{
    ContradictionAssessment, ContradictionLevel, FusionConfig, FusionStep, SkipReason, Turn,
};

use crate::labels::contradiction_level;
use crate::signals::ContradictionSignals;
use crate::text;

/// Constants for the fusion steps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionOptions {
    pub gate_similarity: f64,
    pub directional_discount: f64,
    pub comparative_discount: f64,
    pub numeric_tolerance: f64,
    pub numeric_floor: f64,
    pub paraphrase_score_cutoff: f64,
    pub paraphrase_similarity_cutoff: f64,
    pub paraphrase_scale: f64,
    pub soft_threshold: f64,
    pub hard_threshold: f64,
}

impl From<&FusionConfig> for FusionOptions {
    fn from(config: &FusionConfig) -> Self {
        Self {
            gate_similarity: config.gate_similarity,
            directional_discount: config.directional_discount,
            comparative_discount: config.comparative_discount,
            numeric_tolerance: config.numeric_tolerance,
            numeric_floor: config.numeric_floor,
            paraphrase_score_cutoff: config.paraphrase_score_cutoff,
            paraphrase_similarity_cutoff: config.paraphrase_similarity_cutoff,
            paraphrase_scale: config.paraphrase_scale,
            soft_threshold: config.soft_contradiction_threshold,
            hard_threshold: config.hard_contradiction_threshold,
        }
    }
}

impl Default for FusionOptions {
    fn default() -> Self {
        Self::from(&FusionConfig::default())
    }
}

/// Stateless contradiction fusion.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContradictionFusion {
    options: FusionOptions,
}

impl ContradictionFusion {
    pub fn new(options: FusionOptions) -> Self {
        Self { options }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(FusionOptions::from(config))
    }

    pub fn options(&self) -> &FusionOptions {
        &self.options
    }

    fn gated(&self, raw: f64, comparative_intent: bool, reason: SkipReason, steps: Vec<FusionStep>) -> ContradictionAssessment {
        log::debug!("Contradiction evaluation skipped: {}", reason.as_str());
        ContradictionAssessment {
            raw,
            adjusted: raw,
            smoothed: None,
            comparative_intent,
            skip_reason: Some(reason),
            steps,
            level: ContradictionLevel::NotApplicable,
        }
    }

    /// Fuse a raw contradiction score with the context of two turns.
    pub fn fuse(&self, signals: &ContradictionSignals, prev: &Turn, curr: &Turn) -> ContradictionAssessment {
        let o = &self.options;
        let comparative_intent = text::has_comparative_intent(&curr.question);

        let Some(raw) = signals.raw_nli.filter(|v| !v.is_nan()) else {
            return self.gated(0.0, comparative_intent, SkipReason::NliUnavailable, Vec::new());
        };
        let raw = raw.clamp(0.0, 1.0);
        let mut steps = Vec::new();

        // 1. Topical gate
        if let Some(q_sim) = signals.question_similarity {
            if q_sim < o.gate_similarity && !text::shares_terms(&prev.question, &curr.question) {
                steps.push(FusionStep::TopicalGate);
                return self.gated(raw, comparative_intent, SkipReason::UnrelatedContext, steps);
            }
        }

        let mut score = raw;

        // 2. Comparative-intent discount
        let mut split_entities: Vec<String> = Vec::new();
        if comparative_intent {
            let mut claims = text::directional_claims(&prev.answer);
            claims.extend(text::directional_claims(&curr.answer));
            if text::is_clean_directional_split(&claims) {
                score *= o.directional_discount;
                steps.push(FusionStep::DirectionalDiscount);
                log::debug!("Directional split across entities, score {raw:.4} -> {score:.4}");
                split_entities = claims.into_iter().filter_map(|c| c.entity).collect();
            } else {
                score *= o.comparative_discount;
                steps.push(FusionStep::ComparativeDiscount);
                log::debug!("Comparative intent, score {raw:.4} -> {score:.4}");
            }
        }
        let directional = !split_entities.is_empty();

        // 3. Numeric-contradiction override. Under a directional split the
        // override may restore the undiscounted score but never exceed it.
        let target = if directional {
            o.numeric_floor.min(raw)
        } else {
            o.numeric_floor
        };
        if score < target {
            let prev_subject = text::sole_entity(&prev.question);
            let curr_subject = text::sole_entity(&curr.question);
            let prev_claims = text::numeric_claims_about(&prev.answer, prev_subject.as_deref());
            let curr_claims = text::numeric_claims_about(&curr.answer, curr_subject.as_deref());
            if text::numeric_conflict_outside(
                &prev_claims,
                &curr_claims,
                o.numeric_tolerance,
                &split_entities,
            ) {
                log::debug!("Numeric contradiction override: {score:.4} -> {target:.4}");
                score = target;
                steps.push(FusionStep::NumericOverride);
            }
        }

        // 4. Paraphrase suppression
        if let Some(a_sim) = signals.answer_similarity {
            if score > o.paraphrase_score_cutoff && a_sim > o.paraphrase_similarity_cutoff {
                let suppressed = score * o.paraphrase_scale;
                log::debug!(
                    "Paraphrase suppression (similarity {a_sim:.4}): {score:.4} -> {suppressed:.4}"
                );
                score = suppressed;
                steps.push(FusionStep::ParaphraseSuppression);
            }
        }

        let adjusted = score.clamp(0.0, 1.0);
        ContradictionAssessment {
            raw,
            adjusted,
            smoothed: None,
            comparative_intent,
            skip_reason: None,
            steps,
            level: contradiction_level(adjusted, o.soft_threshold, o.hard_threshold),
        }
    }
}

/// Human-readable warnings for the steps that fired.
pub fn step_warnings(assessment: &ContradictionAssessment) -> Vec<String> {
    let mut warnings = Vec::new();
    if let Some(reason) = assessment.skip_reason {
        warnings.push(format!("contradiction check skipped: {}", reason.as_str()));
    }
    for step in &assessment.steps {
        let message = match step {
            FusionStep::TopicalGate => continue,
            FusionStep::DirectionalDiscount => "comparative directional discount applied",
            FusionStep::ComparativeDiscount => "comparative discount applied",
            FusionStep::NumericOverride => "numeric contradiction override applied",
            FusionStep::ParaphraseSuppression => "paraphrase suppression applied",
        };
        warnings.push(message.to_string());
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fusion() -> ContradictionFusion {
        ContradictionFusion::default()
    }

    fn signals(raw: f64, q_sim: Option<f64>, a_sim: Option<f64>) -> ContradictionSignals {
        ContradictionSignals {
            raw_nli: Some(raw),
            question_similarity: q_sim,
            answer_similarity: a_sim,
        }
    }

    #[test]
    fn test_directional_discount() {
        let prev = Turn::new("How did tech stocks do today?", "Tech was mixed today.");
        let curr = Turn::new("Compare AAPL vs MSFT", "AAPL up 5%, MSFT down 2%");
        let a = fusion().fuse(&signals(0.95, Some(0.8), Some(0.3)), &prev, &curr);
        assert!(a.comparative_intent);
        assert!(a.fired(FusionStep::DirectionalDiscount));
        assert!(a.adjusted <= 0.30);
        assert!((a.adjusted - 0.285).abs() < 1e-9);
    }

    #[test]
    fn test_pronoun_answer_keeps_directional_discount() {
        let prev = Turn::new("How did AAPL do today?", "It rose 5%.");
        let curr = Turn::new("Compare AAPL vs MSFT", "AAPL up 5%, MSFT down 2%");
        for raw in [0.2, 0.95] {
            let a = fusion().fuse(&signals(raw, Some(0.8), Some(0.3)), &prev, &curr);
            assert!(a.fired(FusionStep::DirectionalDiscount));
            assert!(!a.fired(FusionStep::NumericOverride));
            assert!((a.adjusted - raw * 0.3).abs() < 1e-9);
        }
    }

    #[test]
    fn test_override_under_split_is_capped_at_raw() {
        // AAPL 1% vs 5% is a magnitude conflict inside a clean split.
        let prev = Turn::new("How did AAPL do today?", "AAPL rose 1%.");
        let curr = Turn::new("Compare AAPL vs MSFT", "AAPL up 5%, MSFT down 2%");
        let a = fusion().fuse(&signals(0.2, Some(0.8), None), &prev, &curr);
        assert!(a.fired(FusionStep::DirectionalDiscount));
        assert!(a.fired(FusionStep::NumericOverride));
        assert!((a.adjusted - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_mild_comparative_discount() {
        let prev = Turn::new("Tell me about AAPL", "AAPL has strong cash flow.");
        let curr = Turn::new("Which is better, AAPL or MSFT?", "MSFT has the stronger balance sheet.");
        let a = fusion().fuse(&signals(0.8, Some(0.75), None), &prev, &curr);
        assert!(a.fired(FusionStep::ComparativeDiscount));
        assert!((a.adjusted - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_numeric_override() {
        let prev = Turn::new("How did GDP change?", "GDP grew 2%");
        let curr = Turn::new("How did GDP change last year?", "GDP shrank 10%");
        let a = fusion().fuse(&signals(0.04, Some(0.9), Some(0.7)), &prev, &curr);
        assert!(a.fired(FusionStep::NumericOverride));
        assert!(a.adjusted >= 0.50);
    }

    #[test]
    fn test_numeric_override_not_applied_above_floor() {
        let prev = Turn::new("How did GDP change?", "GDP grew 2%");
        let curr = Turn::new("How did GDP change?", "GDP shrank 10%");
        let a = fusion().fuse(&signals(0.7, Some(0.9), Some(0.5)), &prev, &curr);
        assert!(!a.fired(FusionStep::NumericOverride));
        assert!((a.adjusted - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_paraphrase_suppression() {
        let prev = Turn::new("Is Apple profitable?", "Apple is highly profitable.");
        let curr = Turn::new("Is Apple profitable?", "Apple is very profitable.");
        let a = fusion().fuse(&signals(0.99, Some(1.0), Some(0.95)), &prev, &curr);
        assert!(a.fired(FusionStep::ParaphraseSuppression));
        assert!(a.adjusted <= 0.35);
    }

    #[test]
    fn test_paraphrase_skipped_without_similarity() {
        let prev = Turn::new("Is Apple profitable?", "Apple is highly profitable.");
        let curr = Turn::new("Is Apple profitable?", "Apple is very profitable.");
        let a = fusion().fuse(&signals(0.99, Some(1.0), None), &prev, &curr);
        assert!(a.steps.is_empty());
        assert!((a.adjusted - 0.99).abs() < 1e-12);
        assert_eq!(a.level, ContradictionLevel::Contradiction);
    }

    #[test]
    fn test_topical_gate() {
        let prev = Turn::new("What is AAPL's dividend?", "It pays 0.24 per share.");
        let curr = Turn::new("How is the weather in Oslo?", "Rainy.");
        let a = fusion().fuse(&signals(0.9, Some(0.1), None), &prev, &curr);
        assert_eq!(a.skip_reason, Some(SkipReason::UnrelatedContext));
        assert_eq!(a.level, ContradictionLevel::NotApplicable);
        assert_eq!(a.steps, vec![FusionStep::TopicalGate]);
    }

    #[test]
    fn test_gate_needs_no_shared_terms() {
        let prev = Turn::new("What is AAPL's dividend?", "0.24 per share.");
        let curr = Turn::new("Did AAPL raise it?", "Yes.");
        let a = fusion().fuse(&signals(0.9, Some(0.1), None), &prev, &curr);
        assert!(a.skip_reason.is_none());
    }

    #[test]
    fn test_gate_skipped_without_similarity() {
        let prev = Turn::new("What is AAPL's dividend?", "It pays 0.24 per share.");
        let curr = Turn::new("How is the weather in Oslo?", "Rainy.");
        let a = fusion().fuse(&signals(0.9, None, None), &prev, &curr);
        assert!(a.skip_reason.is_none());
        assert_eq!(a.level, ContradictionLevel::Contradiction);
    }

    #[test]
    fn test_missing_nli_is_not_applicable() {
        let prev = Turn::new("q", "a");
        let curr = Turn::new("q", "b");
        let a = fusion().fuse(&ContradictionSignals::default(), &prev, &curr);
        assert_eq!(a.skip_reason, Some(SkipReason::NliUnavailable));
        assert_eq!(a.level, ContradictionLevel::NotApplicable);
    }

    #[test]
    fn test_step_warnings() {
        let prev = Turn::new("How did GDP change?", "GDP grew 2%");
        let curr = Turn::new("How did GDP change?", "GDP shrank 10%");
        let a = fusion().fuse(&signals(0.04, Some(0.9), None), &prev, &curr);
        assert_eq!(step_warnings(&a), vec!["numeric contradiction override applied".to_string()]);
    }
}
