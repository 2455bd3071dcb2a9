// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Temporal Smoother + Label Hysteresis
// ─────────────────────────────────────────────────────────────────────
//! Turn-over-turn smoothing for a conversation.
//!
//! Two independent mechanisms:
//! - `TemporalSmoother`: EMA over the contradiction scores of a
//!   conversation, with a bounded rolling history.
//! - `LabelHysteresis`: a symmetric dead band around the scenario
//!   threshold so the composite label does not flicker on negligible
//!   score changes between consecutive turns.

use fhri_types::{ConversationState, FusionConfig, Label};

/// Exponential moving average over contradiction scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemporalSmoother {
    alpha: f64,
    window: usize,
}

impl TemporalSmoother {
    pub fn new(alpha: f64, window: usize) -> Self {
        Self {
            alpha: alpha.clamp(f64::MIN_POSITIVE, 1.0),
            window: window.max(1),
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(config.ema_alpha, config.history_window)
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// A state whose history outgrew the window was not produced by this
    /// smoother and cannot be trusted.
    pub fn is_consistent(&self, state: &ConversationState) -> bool {
        state.history.len() <= self.window
    }

    /// Fold a new score into the conversation and return the smoothed
    /// value: `α · new + (1 − α) · previous`, or `new` on the first
    /// contradiction-bearing turn.
    pub fn smooth(&self, state: &mut ConversationState, new_raw: f64) -> f64 {
        let new_raw = new_raw.clamp(0.0, 1.0);
        state.history.push_back(new_raw);
        while state.history.len() > self.window {
            state.history.pop_front();
        }

        let smoothed = match state.smoothed {
            Some(previous) => self.alpha * new_raw + (1.0 - self.alpha) * previous,
            None => new_raw,
        };
        state.smoothed = Some(smoothed);
        smoothed
    }
}

/// Symmetric dead band around a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelHysteresis {
    margin: f64,
}

impl LabelHysteresis {
    pub fn new(margin: f64) -> Self {
        Self {
            margin: margin.max(0.0),
        }
    }

    pub fn from_config(config: &FusionConfig) -> Self {
        Self::new(config.hysteresis_margin)
    }

    pub fn margin(&self) -> f64 {
        self.margin
    }

    /// Label for `score` given the label emitted on the previous turn.
    ///
    /// With no previous label this is the plain `score >= threshold`
    /// rule. An accurate label holds until the score falls more than the
    /// margin below threshold; a hallucination label holds until the
    /// score reaches threshold plus the margin.
    pub fn apply(&self, previous: Option<Label>, score: f64, threshold: f64) -> Label {
        let plain = if score >= threshold {
            Label::Accurate
        } else {
            Label::Hallucination
        };
        match previous {
            None => plain,
            Some(Label::Accurate) if score >= threshold - self.margin => Label::Accurate,
            Some(Label::Hallucination) if score < threshold + self.margin => Label::Hallucination,
            Some(_) => plain,
        }
    }
}
