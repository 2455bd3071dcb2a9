// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Configuration
// ─────────────────────────────────────────────────────────────────────

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, FusionResult};
use crate::scenario::{Scenario, ScenarioTable};

/// Runtime configuration for the reliability kernel.
///
/// Every tuned constant of the fusion pipeline lives here so threshold
/// sweeps and calibration runs never need a code change. The numeric
/// tolerance and similarity cutoffs are empirical; treat the defaults as
/// a starting point, not as optimal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Per-scenario weight vectors and acceptance thresholds.
    pub scenarios: ScenarioTable,

    /// High-risk answers below this composite are never approved.
    /// Default: 0.85.
    pub high_risk_floor: f64,

    /// Apply `sqrt` to grounding and citation before weighting.
    /// Default: true.
    pub fairness_transform: bool,

    /// Add `adequacy_bonus` when grounding, numeric and entropy clear
    /// their loose floors. Default: true.
    pub adequacy_bonus_enabled: bool,

    /// Default: 0.05.
    pub adequacy_bonus: f64,

    /// Default: 0.4.
    pub adequacy_grounding_floor: f64,

    /// Default: 0.5.
    pub adequacy_numeric_floor: f64,

    /// Default: 0.4.
    pub adequacy_entropy_floor: f64,

    /// Symmetric hysteresis margin around each scenario threshold.
    /// Default: 0.025.
    pub hysteresis_margin: f64,

    /// EMA weight on the newest contradiction score. Default: 0.6.
    pub ema_alpha: f64,

    /// Number of contradiction scores kept per conversation. Default: 3.
    pub history_window: usize,

    /// Smoothed contradiction at or above this warns. Default: 0.15.
    pub soft_contradiction_threshold: f64,

    /// Smoothed contradiction at or above this relabels. Default: 0.40.
    pub hard_contradiction_threshold: f64,

    /// Question similarity below this (with no shared terms) skips
    /// contradiction evaluation. Default: 0.70.
    pub gate_similarity: f64,

    /// Multiplier for comparative queries with a clean cross-entity
    /// directional split. Default: 0.3.
    pub directional_discount: f64,

    /// Multiplier for comparative queries without a clean split.
    /// Default: 0.5.
    pub comparative_discount: f64,

    /// Relative magnitude difference that counts as a numeric
    /// contradiction. Default: 0.25.
    pub numeric_tolerance: f64,

    /// Score a numeric contradiction is raised to. Default: 0.5.
    pub numeric_floor: f64,

    /// Paraphrase suppression fires above this contradiction score.
    /// Default: 0.8.
    pub paraphrase_score_cutoff: f64,

    /// ... and above this answer similarity. Default: 0.9.
    pub paraphrase_similarity_cutoff: f64,

    /// Multiplier applied on suppression. Default: 0.3.
    pub paraphrase_scale: f64,

    /// Deadline for each external signal call, in milliseconds.
    /// Default: 250.
    pub deadline_ms: u64,

    /// Idle sessions older than this start fresh. Default: 1800.
    pub session_ttl_secs: u64,

    /// Composite at or above this is the High band. Default: 0.75.
    pub band_high: f64,

    /// Composite at or above this is the Moderate band. Default: 0.50.
    pub band_moderate: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            scenarios: ScenarioTable::default(),
            high_risk_floor: 0.85,
            fairness_transform: true,
            adequacy_bonus_enabled: true,
            adequacy_bonus: 0.05,
            adequacy_grounding_floor: 0.4,
            adequacy_numeric_floor: 0.5,
            adequacy_entropy_floor: 0.4,
            hysteresis_margin: 0.025,
            ema_alpha: 0.6,
            history_window: 3,
            soft_contradiction_threshold: 0.15,
            hard_contradiction_threshold: 0.40,
            gate_similarity: 0.70,
            directional_discount: 0.3,
            comparative_discount: 0.5,
            numeric_tolerance: 0.25,
            numeric_floor: 0.5,
            paraphrase_score_cutoff: 0.8,
            paraphrase_similarity_cutoff: 0.9,
            paraphrase_scale: 0.3,
            deadline_ms: 250,
            session_ttl_secs: 1800,
            band_high: 0.75,
            band_moderate: 0.50,
        }
    }
}

impl FusionConfig {
    /// Validate configuration parameters.
    pub fn validate(&self) -> FusionResult<()> {
        self.scenarios.validate()?;

        let unit_fields = [
            ("high_risk_floor", self.high_risk_floor),
            ("adequacy_bonus", self.adequacy_bonus),
            ("adequacy_grounding_floor", self.adequacy_grounding_floor),
            ("adequacy_numeric_floor", self.adequacy_numeric_floor),
            ("adequacy_entropy_floor", self.adequacy_entropy_floor),
            ("hysteresis_margin", self.hysteresis_margin),
            ("soft_contradiction_threshold", self.soft_contradiction_threshold),
            ("hard_contradiction_threshold", self.hard_contradiction_threshold),
            ("gate_similarity", self.gate_similarity),
            ("directional_discount", self.directional_discount),
            ("comparative_discount", self.comparative_discount),
            ("numeric_floor", self.numeric_floor),
            ("paraphrase_score_cutoff", self.paraphrase_score_cutoff),
            ("paraphrase_similarity_cutoff", self.paraphrase_similarity_cutoff),
            ("paraphrase_scale", self.paraphrase_scale),
            ("band_high", self.band_high),
            ("band_moderate", self.band_moderate),
        ];
        for (name, value) in unit_fields {
            if !(0.0..=1.0).contains(&value) {
                return Err(FusionError::Config(format!(
                    "{name} must be in [0, 1], got {value}"
                )));
            }
        }
        if !(self.ema_alpha > 0.0 && self.ema_alpha <= 1.0) {
            return Err(FusionError::Config(format!(
                "ema_alpha must be in (0, 1], got {}",
                self.ema_alpha
            )));
        }
        if self.soft_contradiction_threshold >= self.hard_contradiction_threshold {
            return Err(FusionError::Config(format!(
                "soft_contradiction_threshold ({}) must be below hard_contradiction_threshold ({})",
                self.soft_contradiction_threshold, self.hard_contradiction_threshold
            )));
        }
        if self.band_moderate > self.band_high {
            return Err(FusionError::Config(format!(
                "band_moderate ({}) must not exceed band_high ({})",
                self.band_moderate, self.band_high
            )));
        }
        if !(self.numeric_tolerance.is_finite() && self.numeric_tolerance >= 0.0) {
            return Err(FusionError::Config(format!(
                "numeric_tolerance must be finite and >= 0, got {}",
                self.numeric_tolerance
            )));
        }
        if self.history_window < 1 {
            return Err(FusionError::Config(format!(
                "history_window must be >= 1, got {}",
                self.history_window
            )));
        }
        if self.deadline_ms == 0 {
            return Err(FusionError::Config("deadline_ms must be > 0".to_string()));
        }
        Ok(())
    }

    /// Load from JSON string. Missing fields take their defaults.
    pub fn from_json(json: &str) -> FusionResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| FusionError::Config(format!("JSON parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Copy with one scenario's threshold replaced.
    pub fn with_threshold(mut self, scenario: Scenario, threshold: f64) -> Self {
        self.scenarios.get_mut(scenario).threshold = threshold;
        self
    }

    /// Copy with the high-risk floor replaced.
    pub fn with_high_risk_floor(mut self, floor: f64) -> Self {
        self.high_risk_floor = floor;
        self
    }

    /// The bar a composite must clear to be approved: the scenario
    /// threshold, raised to the floor when the answer is high-risk.
    pub fn acceptance_bar(&self, scenario: Scenario, high_risk: bool) -> f64 {
        let threshold = self.scenarios.threshold(scenario);
        if high_risk {
            threshold.max(self.high_risk_floor)
        } else {
            threshold
        }
    }
}
