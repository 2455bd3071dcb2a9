// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Error Hierarchy
// ─────────────────────────────────────────────────────────────────────

use thiserror::Error;

/// Root error type for all reliability-kernel failures.
///
/// Only `NoSignalAvailable` escapes the per-turn scoring path. Unknown
/// scenario overrides, stale sessions and degraded signals are recovered
/// where they occur and reported as warnings on the result instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FusionError {
    /// Every sub-score was absent, so no composite can be computed.
    #[error("no signal available: all sub-scores are missing")]
    NoSignalAvailable,

    /// Invalid configuration (weights, thresholds, windows).
    #[error("config error: {0}")]
    Config(String),

    /// Invalid caller input (e.g. an empty threshold grid).
    #[error("validation error: {0}")]
    Validation(String),

    /// A signal provider missed its deadline.
    #[error("timeout: signal provider exceeded {deadline_ms}ms deadline")]
    Timeout { deadline_ms: u64 },

    /// A signal provider panicked or hung up without answering.
    #[error("signal provider error: {0}")]
    Provider(String),

    /// Numerical error (NaN/Inf that cannot be meaningfully clamped).
    #[error("numerical error: {0}")]
    Numerical(String),
}

pub type FusionResult<T> = Result<T, FusionError>;
