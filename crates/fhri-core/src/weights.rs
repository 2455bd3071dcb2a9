// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Weight Resolver
// ─────────────────────────────────────────────────────────────────────
//! Drops the weights of missing sub-scores and rescales the rest to sum
//! to one. All-missing is the one hard failure of the scoring path.

use fhri_types::{Component, FusionError, FusionResult, ResolvedWeights, SubScoreSet, WeightVector};

/// Resolve the weights to apply for the sub-scores actually available.
pub fn resolve(scenario_weights: &WeightVector, available: &SubScoreSet) -> FusionResult<ResolvedWeights> {
    if available.is_empty() {
        log::error!("Weight resolution failed: no sub-score available");
        return Err(FusionError::NoSignalAvailable);
    }

    let dropped = available.missing();
    let mut weights = WeightVector::default();
    let mut mass = 0.0;
    for (component, _) in available.available() {
        let w = scenario_weights.get(component).max(0.0);
        weights.set(component, w);
        mass += w;
    }

    if mass <= 0.0 {
        // Every available component has zero weight here: spread evenly.
        let present: Vec<Component> = available.available().map(|(c, _)| c).collect();
        let share = 1.0 / present.len() as f64;
        log::warn!(
            "Available components {present:?} have zero scenario weight, using uniform {share:.4}"
        );
        for component in present {
            weights.set(component, share);
        }
    } else {
        for component in Component::ALL {
            weights.set(component, weights.get(component) / mass);
        }
    }

    let renormalized = !dropped.is_empty();
    if renormalized {
        log::warn!("Renormalized weights, dropped {dropped:?}");
    }

    Ok(ResolvedWeights {
        weights,
        dropped,
        renormalized,
    })
}

/// Human-readable warning for a renormalized weight vector.
pub fn renormalization_warning(resolved: &ResolvedWeights) -> Option<String> {
    if !resolved.renormalized {
        return None;
    }
    let names: Vec<&str> = resolved.dropped.iter().map(|c| c.as_str()).collect();
    Some(format!("renormalized: {} unavailable", names.join(", ")))
}
