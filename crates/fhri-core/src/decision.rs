// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Threshold Decision Engine + Calibration
// ─────────────────────────────────────────────────────────────────────
//! Turns a composite score into a base label.
//!
//! `label = accurate iff score >= scenario.threshold`, then the global
//! high-risk floor: a high-risk answer below the floor is a
//! hallucination no matter how lenient the scenario threshold is.
//!
//! Thresholds and the floor are data. `sweep_thresholds` evaluates a
//! labelled sample set over a grid of thresholds for calibration.

use serde::{Deserialize, Serialize};

use fhri_types::{FusionConfig, FusionError, FusionResult, Label, Scenario, ScenarioTable};

use crate::smoother::LabelHysteresis;

/// Pure threshold rule shared by the engine and the sweep.
#[inline]
pub fn decide_with(score: f64, threshold: f64, high_risk: bool, floor: f64) -> Label {
    if high_risk && score < floor {
        return Label::Hallucination;
    }
    if score >= threshold {
        Label::Accurate
    } else {
        Label::Hallucination
    }
}

/// Base label plus how it was reached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub label: Label,
    pub threshold: f64,
    /// The high-risk floor overrode an otherwise accurate label.
    pub floor_applied: bool,
    /// Hysteresis kept the previous label where the plain rule would flip.
    pub hysteresis_held: bool,
}

/// Scenario thresholds + global high-risk floor + hysteresis.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    table: ScenarioTable,
    high_risk_floor: f64,
    hysteresis: LabelHysteresis,
}

impl DecisionEngine {
    pub fn new(table: ScenarioTable, high_risk_floor: f64, hysteresis: LabelHysteresis) -> Self {
        Self {
            table,
            high_risk_floor,
            hysteresis,
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(
            config.scenarios.clone(),
            config.high_risk_floor,
            LabelHysteresis::from_config(config),
        )
    }

    pub fn threshold(&self, scenario: Scenario) -> f64 {
        self.table.threshold(scenario)
    }

    pub fn high_risk_floor(&self) -> f64 {
        self.high_risk_floor
    }

    /// Stateless decision.
    pub fn decide(&self, score: f64, scenario: Scenario, high_risk: bool) -> Label {
        decide_with(score, self.threshold(scenario), high_risk, self.high_risk_floor)
    }

    /// Decision with hysteresis against the previous turn's label.
    ///
    /// The floor is applied after hysteresis so a held label can never
    /// sneak a high-risk answer past it.
    pub fn decide_with_history(
        &self,
        score: f64,
        scenario: Scenario,
        high_risk: bool,
        previous: Option<Label>,
    ) -> Decision {
        let threshold = self.threshold(scenario);
        let plain = decide_with(score, threshold, false, self.high_risk_floor);
        let mut label = self.hysteresis.apply(previous, score, threshold);
        let hysteresis_held = label != plain;

        let floor_applied = high_risk && score < self.high_risk_floor && label == Label::Accurate;
        if floor_applied {
            log::warn!(
                "High-risk floor applied: {score:.4} < {} (scenario {scenario}, threshold {threshold})",
                self.high_risk_floor
            );
            label = Label::Hallucination;
        }

        Decision {
            label,
            threshold,
            floor_applied,
            hysteresis_held,
        }
    }
}

/// Largest grid a sweep will materialize.
pub const MAX_GRID_POINTS: usize = 10_000;

/// Inclusive grid of thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdGrid {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl ThresholdGrid {
    pub fn new(start: f64, end: f64, step: f64) -> Self {
        Self { start, end, step }
    }

    pub fn validate(&self) -> FusionResult<()> {
        if !(0.0..=1.0).contains(&self.start) || !(0.0..=1.0).contains(&self.end) {
            return Err(FusionError::Validation(format!(
                "grid bounds must be in [0, 1], got [{}, {}]",
                self.start, self.end
            )));
        }
        if self.start > self.end {
            return Err(FusionError::Validation(format!(
                "grid start {} exceeds end {}",
                self.start, self.end
            )));
        }
        if !(self.step.is_finite() && self.step > 0.0) {
            return Err(FusionError::Validation(format!(
                "grid step must be > 0, got {}",
                self.step
            )));
        }
        let count = self.last_index() + 1.0;
        if count > MAX_GRID_POINTS as f64 {
            return Err(FusionError::Validation(format!(
                "grid of {count:.0} points exceeds the limit of {MAX_GRID_POINTS}"
            )));
        }
        Ok(())
    }

    fn last_index(&self) -> f64 {
        ((self.end - self.start) / self.step + 1e-9).floor()
    }

    /// Grid points, computed by index so rounding never accumulates.
    pub fn points(&self) -> FusionResult<Vec<f64>> {
        self.validate()?;
        let n = self.last_index() as usize;
        Ok((0..=n)
            .map(|i| (self.start + i as f64 * self.step).min(self.end))
            .collect())
    }
}

impl Default for ThresholdGrid {
    fn default() -> Self {
        Self::new(0.50, 0.95, 0.05)
    }
}

/// One labelled example for calibration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub score: f64,
    pub high_risk: bool,
    /// Ground truth: the answer is a hallucination.
    pub is_hallucination: bool,
}

/// Metrics at one grid threshold. Hallucination is the positive class.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub threshold: f64,
    pub true_positives: usize,
    pub false_positives: usize,
    pub true_negatives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub accuracy: f64,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

/// Evaluate `samples` at every threshold of `grid`, with the given
/// high-risk floor held fixed.
pub fn sweep_thresholds(
    samples: &[CalibrationSample],
    grid: &ThresholdGrid,
    high_risk_floor: f64,
) -> FusionResult<Vec<SweepPoint>> {
    if samples.is_empty() {
        return Err(FusionError::Validation(
            "threshold sweep needs at least one sample".to_string(),
        ));
    }
    let points = grid.points()?;

    Ok(points
        .into_iter()
        .map(|threshold| {
            let (mut tp, mut fp, mut tn, mut fneg) = (0, 0, 0, 0);
            for s in samples {
                let predicted = decide_with(s.score, threshold, s.high_risk, high_risk_floor)
                    == Label::Hallucination;
                match (predicted, s.is_hallucination) {
                    (true, true) => tp += 1,
                    (true, false) => fp += 1,
                    (false, false) => tn += 1,
                    (false, true) => fneg += 1,
                }
            }
            let precision = ratio(tp, tp + fp);
            let recall = ratio(tp, tp + fneg);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            SweepPoint {
                threshold,
                true_positives: tp,
                false_positives: fp,
                true_negatives: tn,
                false_negatives: fneg,
                precision,
                recall,
                f1,
                accuracy: ratio(tp + tn, samples.len()),
            }
        })
        .collect())
}

/// Highest F1; ties go to the lowest threshold.
pub fn best_by_f1(points: &[SweepPoint]) -> Option<&SweepPoint> {
    points.iter().fold(None, |best, p| match best {
        Some(b) if b.f1 >= p.f1 => Some(b),
        _ => Some(p),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> DecisionEngine {
        DecisionEngine::from_config(&FusionConfig::default())
    }

    #[test]
    fn test_base_rule() {
        let e = engine();
        assert_eq!(e.decide(0.70, Scenario::Directional, false), Label::Accurate);
        assert_eq!(e.decide(0.6999, Scenario::Directional, false), Label::Hallucination);
    }

    #[test]
    fn test_high_risk_floor_dominates() {
        // threshold 0.70, floor 0.85, score 0.78
        let e = engine();
        assert_eq!(e.decide(0.78, Scenario::Directional, false), Label::Accurate);
        assert_eq!(e.decide(0.78, Scenario::Directional, true), Label::Hallucination);
        assert_eq!(e.decide(0.85, Scenario::Directional, true), Label::Accurate);
    }

    #[test]
    fn test_floor_with_hysteresis() {
        let e = engine();
        let d = e.decide_with_history(0.78, Scenario::Directional, true, Some(Label::Accurate));
        assert_eq!(d.label, Label::Hallucination);
        assert!(d.floor_applied);
    }

    #[test]
    fn test_hysteresis_held_flag() {
        let e = engine();
        let d = e.decide_with_history(0.69, Scenario::Directional, false, Some(Label::Accurate));
        assert_eq!(d.label, Label::Accurate);
        assert!(d.hysteresis_held);
        assert!(!d.floor_applied);
    }

    #[test]
    fn test_overridden_threshold() {
        let config = FusionConfig::default().with_threshold(Scenario::Directional, 0.9);
        let e = DecisionEngine::from_config(&config);
        assert_eq!(e.decide(0.8, Scenario::Directional, false), Label::Hallucination);
    }

    #[test]
    fn test_grid_points() {
        let points = ThresholdGrid::new(0.5, 0.7, 0.1).points().unwrap();
        assert_eq!(points.len(), 3);
        assert!((points[2] - 0.7).abs() < 1e-12);
        assert_eq!(ThresholdGrid::default().points().unwrap().len(), 10);
    }

    #[test]
    fn test_grid_invalid() {
        assert!(ThresholdGrid::new(0.8, 0.5, 0.1).points().is_err());
        assert!(ThresholdGrid::new(0.5, 0.8, 0.0).points().is_err());
        assert!(ThresholdGrid::new(-0.1, 0.8, 0.1).points().is_err());
    }

    #[test]
    fn test_grid_too_fine() {
        let err = ThresholdGrid::new(0.0, 1.0, 1e-12).points().unwrap_err();
        assert!(matches!(err, FusionError::Validation(_)));
        let sample = CalibrationSample { score: 0.7, high_risk: false, is_hallucination: false };
        assert!(sweep_thresholds(&[sample], &ThresholdGrid::new(0.0, 1.0, 1e-12), 0.85).is_err());
        assert!(ThresholdGrid::new(0.0, 1.0, 1e-3).points().unwrap().len() <= MAX_GRID_POINTS);
    }

    #[test]
    fn test_sweep_metrics() {
        let samples = [
            CalibrationSample { score: 0.9, high_risk: false, is_hallucination: false },
            CalibrationSample { score: 0.75, high_risk: false, is_hallucination: false },
            CalibrationSample { score: 0.62, high_risk: false, is_hallucination: true },
            CalibrationSample { score: 0.4, high_risk: false, is_hallucination: true },
        ];
        let points = sweep_thresholds(&samples, &ThresholdGrid::new(0.5, 0.8, 0.1), 0.85).unwrap();
        // threshold 0.7: flags 0.62 and 0.4 → perfect
        let at_07 = points.iter().find(|p| (p.threshold - 0.7).abs() < 1e-9).unwrap();
        assert_eq!(at_07.true_positives, 2);
        assert_eq!(at_07.false_positives, 0);
        assert_eq!(at_07.f1, 1.0);
        assert_eq!(at_07.accuracy, 1.0);
        // threshold 0.5: misses 0.62
        assert_eq!(points[0].recall, 0.5);
        let best = best_by_f1(&points).unwrap();
        assert!((best.threshold - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_sweep_respects_floor() {
        let samples = [CalibrationSample { score: 0.8, high_risk: true, is_hallucination: true }];
        let points = sweep_thresholds(&samples, &ThresholdGrid::new(0.5, 0.5, 0.1), 0.85).unwrap();
        assert_eq!(points[0].true_positives, 1);
    }

    #[test]
    fn test_sweep_empty_samples() {
        assert!(sweep_thresholds(&[], &ThresholdGrid::default(), 0.85).is_err());
    }
}
