// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Signal Backends (NLI, Similarity)
// ─────────────────────────────────────────────────────────────────────
//! Model-backed signal interfaces and their deadline-bounded callers.
//!
//! In production the NLI classifier and the embedding model run behind
//! these traits, in-process or behind an inference server. The heuristic
//! implementations are deterministic and model-free; they serve tests
//! and act as a fallback when no model is wired in.
//!
//! Every call goes through [`call_with_deadline`]. A missed deadline, a
//! panicking provider or a non-finite value turns into `None` plus a
//! warning, never into an aborted request. Nothing is retried here.

use std::collections::HashSet;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use fhri_types::{Component, FusionConfig, FusionError, FusionResult, SubScoreSet, Turn};

use crate::text::{self, Direction};

/// Contradiction probability between two texts, in [0, 1].
pub trait NliBackend: Send + Sync {
    fn contradiction(&self, premise: &str, hypothesis: &str) -> f64;
}

/// Semantic similarity between two short texts, in [0, 1].
pub trait SimilarityBackend: Send + Sync {
    fn similarity(&self, a: &str, b: &str) -> f64;
}

fn jaccard(a: &str, b: &str) -> f64 {
    let wa: HashSet<String> = text::words(a).into_iter().collect();
    let wb: HashSet<String> = text::words(b).into_iter().collect();
    if wa.is_empty() || wb.is_empty() {
        return 0.0;
    }
    let inter = wa.intersection(&wb).count() as f64;
    let union = wa.union(&wb).count() as f64;
    inter / union
}

fn is_negated(s: &str) -> bool {
    text::words(s)
        .iter()
        .any(|w| matches!(w.as_str(), "not" | "no" | "never" | "isn't" | "wasn't" | "didn't" | "won't"))
}

fn overall_direction(s: &str) -> Option<Direction> {
    let claims = text::directional_claims(s);
    let first = claims.first()?.direction;
    claims.iter().all(|c| c.direction == first).then_some(first)
}

/// Deterministic lexical NLI stand-in.
///
/// Negation mismatch or an opposite overall direction scores high;
/// otherwise the score falls with word overlap.
pub struct HeuristicNli;

impl NliBackend for HeuristicNli {
    fn contradiction(&self, premise: &str, hypothesis: &str) -> f64 {
        let base = (0.5 - jaccard(premise, hypothesis) * 0.4).clamp(0.05, 0.95);
        let negation_flip = is_negated(premise) != is_negated(hypothesis);
        let direction_flip = matches!(
            (overall_direction(premise), overall_direction(hypothesis)),
            (Some(a), Some(b)) if a != b
        );
        if negation_flip || direction_flip {
            base.max(0.85)
        } else {
            base
        }
    }
}

/// Word-set Jaccard similarity.
pub struct LexicalSimilarity;

impl SimilarityBackend for LexicalSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        jaccard(a, b)
    }
}

type PairScoreFn = Box<dyn Fn(&str, &str) -> f64 + Send + Sync>;

/// NLI backend that delegates to a closure (e.g. a model server client).
pub struct ExternalNli {
    score_fn: PairScoreFn,
}

impl ExternalNli {
    pub fn new(score_fn: impl Fn(&str, &str) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            score_fn: Box::new(score_fn),
        }
    }
}

impl NliBackend for ExternalNli {
    fn contradiction(&self, premise: &str, hypothesis: &str) -> f64 {
        (self.score_fn)(premise, hypothesis)
    }
}

/// Similarity backend that delegates to a closure.
pub struct ExternalSimilarity {
    score_fn: PairScoreFn,
}

impl ExternalSimilarity {
    pub fn new(score_fn: impl Fn(&str, &str) -> f64 + Send + Sync + 'static) -> Self {
        Self {
            score_fn: Box::new(score_fn),
        }
    }
}

impl SimilarityBackend for ExternalSimilarity {
    fn similarity(&self, a: &str, b: &str) -> f64 {
        (self.score_fn)(a, b)
    }
}

/// A blocking signal computation, run on its own thread.
pub type SignalTask = Box<dyn FnOnce() -> f64 + Send + 'static>;

fn spawn_task(task: SignalTask) -> mpsc::Receiver<f64> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let value = task();
        // Receiver may be gone after a timeout.
        let _ = tx.send(value);
    });
    rx
}

fn receive(rx: &mpsc::Receiver<f64>, remaining: Duration, deadline_ms: u64) -> FusionResult<f64> {
    match rx.recv_timeout(remaining) {
        Ok(v) if v.is_finite() => Ok(v.clamp(0.0, 1.0)),
        Ok(v) => Err(FusionError::Numerical(format!("provider returned {v}"))),
        Err(RecvTimeoutError::Timeout) => Err(FusionError::Timeout { deadline_ms }),
        Err(RecvTimeoutError::Disconnected) => Err(FusionError::Provider(
            "provider exited without a value".to_string(),
        )),
    }
}

/// Run a blocking signal computation with a deadline.
///
/// A late task keeps running on its detached thread; its result is
/// discarded.
pub fn call_with_deadline(task: SignalTask, deadline_ms: u64) -> FusionResult<f64> {
    let rx = spawn_task(task);
    receive(&rx, Duration::from_millis(deadline_ms), deadline_ms)
}

/// Contradiction-channel signals for one turn pair. `None` means the
/// signal was unavailable and its dependent step is skipped.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContradictionSignals {
    /// Raw NLI contradiction score, previous vs current answer.
    pub raw_nli: Option<f64>,
    /// Similarity of previous and current question.
    pub question_similarity: Option<f64>,
    /// Similarity of previous and current answer.
    pub answer_similarity: Option<f64>,
}

/// Deadline-bounded access to the NLI and similarity backends.
#[derive(Clone)]
pub struct SignalProviders {
    nli: Arc<dyn NliBackend>,
    similarity: Arc<dyn SimilarityBackend>,
    deadline_ms: u64,
}

impl SignalProviders {
    pub fn new(nli: Arc<dyn NliBackend>, similarity: Arc<dyn SimilarityBackend>, deadline_ms: u64) -> Self {
        Self {
            nli,
            similarity,
            deadline_ms: deadline_ms.max(1),
        }
    }

    /// Heuristic backends with the configured deadline.
    pub fn heuristic(config: &FusionConfig) -> Self {
        Self::new(Arc::new(HeuristicNli), Arc::new(LexicalSimilarity), config.deadline_ms)
    }

    pub fn deadline_ms(&self) -> u64 {
        self.deadline_ms
    }

    /// Compute the three contradiction signals concurrently, each under
    /// the shared deadline.
    pub fn contradiction_signals(&self, prev: &Turn, curr: &Turn) -> (ContradictionSignals, Vec<String>) {
        let started = Instant::now();
        let budget = Duration::from_millis(self.deadline_ms);

        let nli = Arc::clone(&self.nli);
        let (p, h) = (prev.answer.clone(), curr.answer.clone());
        let nli_rx = spawn_task(Box::new(move || nli.contradiction(&p, &h)));

        let sim = Arc::clone(&self.similarity);
        let (qa, qb) = (prev.question.clone(), curr.question.clone());
        let q_rx = spawn_task(Box::new(move || sim.similarity(&qa, &qb)));

        let sim = Arc::clone(&self.similarity);
        let (aa, ab) = (prev.answer.clone(), curr.answer.clone());
        let a_rx = spawn_task(Box::new(move || sim.similarity(&aa, &ab)));

        let mut warnings = Vec::new();
        let mut collect = |name: &str, rx: mpsc::Receiver<f64>| {
            let remaining = budget.saturating_sub(started.elapsed());
            match receive(&rx, remaining, self.deadline_ms) {
                Ok(v) => Some(v),
                Err(e) => {
                    log::warn!("Signal '{name}' unavailable: {e}");
                    warnings.push(format!("{name} unavailable: {e}"));
                    None
                }
            }
        };

        let signals = ContradictionSignals {
            raw_nli: collect("nli contradiction", nli_rx),
            question_similarity: collect("question similarity", q_rx),
            answer_similarity: collect("answer similarity", a_rx),
        };
        (signals, warnings)
    }

    /// Run sub-score tasks concurrently under the shared deadline.
    /// Components whose task misses it stay `None`.
    pub fn collect_subscores(&self, tasks: Vec<(Component, SignalTask)>) -> (SubScoreSet, Vec<String>) {
        let started = Instant::now();
        let budget = Duration::from_millis(self.deadline_ms);
        let pending: Vec<(Component, mpsc::Receiver<f64>)> = tasks
            .into_iter()
            .map(|(component, task)| (component, spawn_task(task)))
            .collect();

        let mut subscores = SubScoreSet::default();
        let mut warnings = Vec::new();
        for (component, rx) in pending {
            let remaining = budget.saturating_sub(started.elapsed());
            match receive(&rx, remaining, self.deadline_ms) {
                Ok(v) => subscores.set(component, Some(v)),
                Err(e) => {
                    log::warn!("Sub-score {component} unavailable: {e}");
                    warnings.push(format!("{component} unavailable: {e}"));
                }
            }
        }
        (subscores, warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heuristic_direction_flip() {
        let nli = HeuristicNli;
        assert!(nli.contradiction("Revenue rose 5%", "Revenue fell 5%") >= 0.85);
    }

    #[test]
    fn test_heuristic_negation_flip() {
        let nli = HeuristicNli;
        assert!(nli.contradiction("The dividend was raised", "The dividend was not raised") >= 0.85);
    }

    #[test]
    fn test_heuristic_identical_is_low() {
        let nli = HeuristicNli;
        let s = nli.contradiction("Apple reports on Thursday", "Apple reports on Thursday");
        assert!((s - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_lexical_similarity() {
        let sim = LexicalSimilarity;
        assert_eq!(sim.similarity("apple shares rose", "apple shares rose"), 1.0);
        assert_eq!(sim.similarity("apple shares rose", "apple shares fell"), 0.5);
        assert_eq!(sim.similarity("bond yields", "crypto winter"), 0.0);
        assert_eq!(sim.similarity("", "anything"), 0.0);
    }

    #[test]
    fn test_external_backends() {
        let nli = ExternalNli::new(|_, _| 0.42);
        assert!((nli.contradiction("a", "b") - 0.42).abs() < 1e-9);
        let sim = ExternalSimilarity::new(|a, b| if a == b { 1.0 } else { 0.0 });
        assert_eq!(sim.similarity("x", "x"), 1.0);
    }

    #[test]
    fn test_call_with_deadline_ok() {
        let v = call_with_deadline(Box::new(|| 0.3), 1_000).unwrap();
        assert!((v - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_call_with_deadline_timeout() {
        let err = call_with_deadline(
            Box::new(|| {
                thread::sleep(Duration::from_millis(500));
                0.3
            }),
            20,
        )
        .unwrap_err();
        assert_eq!(err, FusionError::Timeout { deadline_ms: 20 });
    }

    #[test]
    fn test_call_with_deadline_non_finite() {
        let err = call_with_deadline(Box::new(|| f64::NAN), 1_000).unwrap_err();
        assert!(matches!(err, FusionError::Numerical(_)));
    }

    #[test]
    fn test_call_with_deadline_panic() {
        let err = call_with_deadline(Box::new(|| panic!("boom")), 1_000).unwrap_err();
        assert!(matches!(err, FusionError::Provider(_)));
    }

    #[test]
    fn test_contradiction_signals_degrade_on_timeout() {
        let providers = SignalProviders::new(
            Arc::new(ExternalNli::new(|_, _| {
                thread::sleep(Duration::from_millis(500));
                0.9
            })),
            Arc::new(ExternalSimilarity::new(|_, _| 0.8)),
            50,
        );
        let (signals, warnings) =
            providers.contradiction_signals(&Turn::new("q1", "a1"), &Turn::new("q2", "a2"));
        assert_eq!(signals.raw_nli, None);
        assert_eq!(signals.question_similarity, Some(0.8));
        assert_eq!(signals.answer_similarity, Some(0.8));
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("nli contradiction unavailable"));
    }

    #[test]
    fn test_collect_subscores_partial() {
        let providers = SignalProviders::heuristic(&FusionConfig {
            deadline_ms: 50,
            ..Default::default()
        });
        let tasks: Vec<(Component, SignalTask)> = vec![
            (Component::Grounding, Box::new(|| 0.7)),
            (
                Component::Entropy,
                Box::new(|| {
                    thread::sleep(Duration::from_millis(500));
                    0.9
                }),
            ),
        ];
        let (subscores, warnings) = providers.collect_subscores(tasks);
        assert_eq!(subscores.grounding, Some(0.7));
        assert_eq!(subscores.entropy, None);
        assert_eq!(subscores.numeric, None);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with("entropy unavailable"));
    }
}
