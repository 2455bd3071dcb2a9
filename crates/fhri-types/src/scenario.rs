// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Scenarios, Components and Weight Table
// ─────────────────────────────────────────────────────────────────────
//! Closed set of query scenarios and the per-scenario weight/threshold
//! table they dispatch to.
//!
//! The table has one field per scenario. Adding a `Scenario` variant
//! without a matching profile fails to compile in [`ScenarioTable::get`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FusionError, FusionResult};

/// Tolerance used when checking that a weight vector sums to one.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-9;

/// Query scenario. Owns a weight vector and an acceptance threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    NumericKpi,
    Intraday,
    Directional,
    Fundamentals,
    Regulatory,
    Advice,
    PortfolioAdvice,
    MultiTicker,
    News,
    Crypto,
    Default,
}

impl Scenario {
    pub const ALL: [Scenario; 11] = [
        Scenario::NumericKpi,
        Scenario::Intraday,
        Scenario::Directional,
        Scenario::Fundamentals,
        Scenario::Regulatory,
        Scenario::Advice,
        Scenario::PortfolioAdvice,
        Scenario::MultiTicker,
        Scenario::News,
        Scenario::Crypto,
        Scenario::Default,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::NumericKpi => "numeric_kpi",
            Scenario::Intraday => "intraday",
            Scenario::Directional => "directional",
            Scenario::Fundamentals => "fundamentals",
            Scenario::Regulatory => "regulatory",
            Scenario::Advice => "advice",
            Scenario::PortfolioAdvice => "portfolio_advice",
            Scenario::MultiTicker => "multi_ticker",
            Scenario::News => "news",
            Scenario::Crypto => "crypto",
            Scenario::Default => "default",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scenario {
    type Err = FusionError;

    /// Parses snake_case names plus a handful of aliases used by callers
    /// (`"numeric"`, `"comparison"`, `"portfolio"`, ...). Case and
    /// separators (`-`, space) are ignored.
    fn from_str(s: &str) -> FusionResult<Self> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        let scenario = match key.as_str() {
            "numeric_kpi" | "numeric" | "kpi" | "numeric_metric" => Scenario::NumericKpi,
            "intraday" | "realtime" | "real_time" | "live_price" => Scenario::Intraday,
            "directional" | "direction" => Scenario::Directional,
            "fundamentals" | "fundamental" => Scenario::Fundamentals,
            "regulatory" | "regulation" | "compliance" => Scenario::Regulatory,
            "advice" | "investment_advice" => Scenario::Advice,
            "portfolio_advice" | "portfolio" => Scenario::PortfolioAdvice,
            "multi_ticker" | "comparison" | "multi_entity_comparison" | "compare" => {
                Scenario::MultiTicker
            }
            "news" => Scenario::News,
            "crypto" | "cryptocurrency" => Scenario::Crypto,
            "default" | "general" => Scenario::Default,
            _ => {
                return Err(FusionError::Validation(format!(
                    "unknown scenario '{s}'"
                )))
            }
        };
        Ok(scenario)
    }
}

/// One of the five per-answer sub-scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Grounding,
    Numeric,
    Temporal,
    Citation,
    Entropy,
}

impl Component {
    pub const ALL: [Component; 5] = [
        Component::Grounding,
        Component::Numeric,
        Component::Temporal,
        Component::Citation,
        Component::Entropy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Component::Grounding => "grounding",
            Component::Numeric => "numeric",
            Component::Temporal => "temporal",
            Component::Citation => "citation",
            Component::Entropy => "entropy",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Five non-negative weights, one per [`Component`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WeightVector {
    pub grounding: f64,
    pub numeric: f64,
    pub temporal: f64,
    pub citation: f64,
    pub entropy: f64,
}

impl WeightVector {
    pub const fn new(grounding: f64, numeric: f64, temporal: f64, citation: f64, entropy: f64) -> Self {
        Self {
            grounding,
            numeric,
            temporal,
            citation,
            entropy,
        }
    }

    pub fn get(&self, component: Component) -> f64 {
        match component {
            Component::Grounding => self.grounding,
            Component::Numeric => self.numeric,
            Component::Temporal => self.temporal,
            Component::Citation => self.citation,
            Component::Entropy => self.entropy,
        }
    }

    pub fn set(&mut self, component: Component, value: f64) {
        match component {
            Component::Grounding => self.grounding = value,
            Component::Numeric => self.numeric = value,
            Component::Temporal => self.temporal = value,
            Component::Citation => self.citation = value,
            Component::Entropy => self.entropy = value,
        }
    }

    pub fn sum(&self) -> f64 {
        Component::ALL.iter().map(|c| self.get(*c)).sum()
    }

    /// Check non-negativity and unit sum.
    pub fn validate(&self) -> FusionResult<()> {
        for component in Component::ALL {
            let w = self.get(component);
            if !w.is_finite() || w < 0.0 {
                return Err(FusionError::Config(format!(
                    "weight for {component} must be finite and >= 0, got {w}"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(FusionError::Config(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Weights and acceptance threshold owned by a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioProfile {
    pub weights: WeightVector,
    /// Composite score must be >= this to be labelled accurate.
    pub threshold: f64,
}

impl ScenarioProfile {
    pub const fn new(weights: WeightVector, threshold: f64) -> Self {
        Self { weights, threshold }
    }

    /// Built-in profile for a scenario.
    ///
    /// Weight order: grounding, numeric, temporal, citation, entropy.
    pub fn builtin(scenario: Scenario) -> Self {
        match scenario {
            Scenario::NumericKpi => Self::new(WeightVector::new(0.25, 0.35, 0.15, 0.15, 0.10), 0.80),
            Scenario::Intraday => Self::new(WeightVector::new(0.20, 0.30, 0.30, 0.10, 0.10), 0.80),
            Scenario::Directional => Self::new(WeightVector::new(0.30, 0.30, 0.15, 0.10, 0.15), 0.70),
            Scenario::Fundamentals => Self::new(WeightVector::new(0.30, 0.30, 0.10, 0.20, 0.10), 0.75),
            Scenario::Regulatory => Self::new(WeightVector::new(0.35, 0.15, 0.10, 0.30, 0.10), 0.80),
            Scenario::Advice => Self::new(WeightVector::new(0.30, 0.10, 0.10, 0.20, 0.30), 0.65),
            Scenario::PortfolioAdvice => Self::new(WeightVector::new(0.30, 0.15, 0.10, 0.15, 0.30), 0.65),
            Scenario::MultiTicker => Self::new(WeightVector::new(0.25, 0.30, 0.15, 0.15, 0.15), 0.70),
            Scenario::News => Self::new(WeightVector::new(0.30, 0.10, 0.25, 0.25, 0.10), 0.70),
            Scenario::Crypto => Self::new(WeightVector::new(0.25, 0.25, 0.25, 0.10, 0.15), 0.75),
            Scenario::Default => Self::new(WeightVector::new(0.30, 0.20, 0.15, 0.20, 0.15), 0.65),
        }
    }
}

/// Scenario → profile lookup table. One field per scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioTable {
    pub numeric_kpi: ScenarioProfile,
    pub intraday: ScenarioProfile,
    pub directional: ScenarioProfile,
    pub fundamentals: ScenarioProfile,
    pub regulatory: ScenarioProfile,
    pub advice: ScenarioProfile,
    pub portfolio_advice: ScenarioProfile,
    pub multi_ticker: ScenarioProfile,
    pub news: ScenarioProfile,
    pub crypto: ScenarioProfile,
    pub default: ScenarioProfile,
}

impl Default for ScenarioTable {
    fn default() -> Self {
        Self {
            numeric_kpi: ScenarioProfile::builtin(Scenario::NumericKpi),
            intraday: ScenarioProfile::builtin(Scenario::Intraday),
            directional: ScenarioProfile::builtin(Scenario::Directional),
            fundamentals: ScenarioProfile::builtin(Scenario::Fundamentals),
            regulatory: ScenarioProfile::builtin(Scenario::Regulatory),
            advice: ScenarioProfile::builtin(Scenario::Advice),
            portfolio_advice: ScenarioProfile::builtin(Scenario::PortfolioAdvice),
            multi_ticker: ScenarioProfile::builtin(Scenario::MultiTicker),
            news: ScenarioProfile::builtin(Scenario::News),
            crypto: ScenarioProfile::builtin(Scenario::Crypto),
            default: ScenarioProfile::builtin(Scenario::Default),
        }
    }
}

impl ScenarioTable {
    pub fn get(&self, scenario: Scenario) -> &ScenarioProfile {
        match scenario {
            Scenario::NumericKpi => &self.numeric_kpi,
            Scenario::Intraday => &self.intraday,
            Scenario::Directional => &self.directional,
            Scenario::Fundamentals => &self.fundamentals,
            Scenario::Regulatory => &self.regulatory,
            Scenario::Advice => &self.advice,
            Scenario::PortfolioAdvice => &self.portfolio_advice,
            Scenario::MultiTicker => &self.multi_ticker,
            Scenario::News => &self.news,
            Scenario::Crypto => &self.crypto,
            Scenario::Default => &self.default,
        }
    }

    pub fn get_mut(&mut self, scenario: Scenario) -> &mut ScenarioProfile {
        match scenario {
            Scenario::NumericKpi => &mut self.numeric_kpi,
            Scenario::Intraday => &mut self.intraday,
            Scenario::Directional => &mut self.directional,
            Scenario::Fundamentals => &mut self.fundamentals,
            Scenario::Regulatory => &mut self.regulatory,
            Scenario::Advice => &mut self.advice,
            Scenario::PortfolioAdvice => &mut self.portfolio_advice,
            Scenario::MultiTicker => &mut self.multi_ticker,
            Scenario::News => &mut self.news,
            Scenario::Crypto => &mut self.crypto,
            Scenario::Default => &mut self.default,
        }
    }

    pub fn threshold(&self, scenario: Scenario) -> f64 {
        self.get(scenario).threshold
    }

    pub fn validate(&self) -> FusionResult<()> {
        for scenario in Scenario::ALL {
            let profile = self.get(scenario);
            profile
                .weights
                .validate()
                .map_err(|e| FusionError::Config(format!("scenario {scenario}: {e}")))?;
            if !(0.0..=1.0).contains(&profile.threshold) {
                return Err(FusionError::Config(format!(
                    "scenario {scenario}: threshold must be in [0, 1], got {}",
                    profile.threshold
                )));
            }
        }
        Ok(())
    }
}
