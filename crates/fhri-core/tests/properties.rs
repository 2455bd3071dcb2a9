// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Property Tests
// ─────────────────────────────────────────────────────────────────────

use fhri_core::{
    weights, CompositeScorer, ContradictionFusion, ContradictionSignals, DecisionEngine,
    LabelHysteresis, ReliabilityEngine, TemporalSmoother, TurnInput,
};
use fhri_types::{
    Component, ConversationState, FusionConfig, FusionStep, Label, Scenario, ScenarioProfile,
    SubScoreSet, Turn, WeightVector,
};
use proptest::prelude::*;

fn arb_scenario() -> impl Strategy<Value = Scenario> {
    prop::sample::select(Scenario::ALL.to_vec())
}

fn arb_weights() -> impl Strategy<Value = WeightVector> {
    (0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0)
        .prop_map(|(g, n, t, c, e)| WeightVector::new(g, n, t, c, e))
}

fn arb_subscore() -> impl Strategy<Value = Option<f64>> {
    prop::option::of(0.0f64..=1.0)
}

fn arb_subscores() -> impl Strategy<Value = SubScoreSet> {
    (arb_subscore(), arb_subscore(), arb_subscore(), arb_subscore(), arb_subscore()).prop_map(
        |(grounding, numeric, temporal, citation, entropy)| SubScoreSet {
            grounding,
            numeric,
            temporal,
            citation,
            entropy,
        },
    )
}

fn arb_component() -> impl Strategy<Value = Component> {
    prop::sample::select(Component::ALL.to_vec())
}

fn arb_prev_question() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "How did AAPL do today?",
        "How did tech stocks do today?",
        "What happened to MSFT?",
    ])
}

/// Earlier answers: pronoun and unattributed claims, attributed claims,
/// percentages with and without direction verbs.
fn arb_prev_answer() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "It rose 5%.",
        "It fell 3%.",
        "Shares gained 12% this week.",
        "AAPL rose 5%.",
        "AAPL rose 1%.",
        "MSFT fell 8%, AAPL was flat.",
        "Up 4% on the day.",
        "It dropped 20 percent.",
        "Tech was mixed today.",
    ])
}

fn arb_comparative_answer() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec![
        "AAPL up 5%, MSFT down 2%",
        "AAPL went up while MSFT went down",
        "MSFT rose 3% but AAPL fell 1%",
    ])
}

// ── Weight resolution ────────────────────────────────────────────────

proptest! {
    #[test]
    fn resolved_weights_sum_to_one(w in arb_weights(), s in arb_subscores()) {
        prop_assume!(!s.is_empty());
        let resolved = weights::resolve(&w, &s).unwrap();
        prop_assert!((resolved.weights.sum() - 1.0).abs() <= 1e-9);
        for component in &resolved.dropped {
            prop_assert_eq!(resolved.weights.get(*component), 0.0);
        }
    }

    #[test]
    fn builtin_weights_resolve_for_any_subset(scenario in arb_scenario(), s in arb_subscores()) {
        prop_assume!(!s.is_empty());
        let profile = ScenarioProfile::builtin(scenario);
        let resolved = weights::resolve(&profile.weights, &s).unwrap();
        prop_assert!((resolved.weights.sum() - 1.0).abs() <= 1e-9);
        prop_assert_eq!(resolved.renormalized, !s.missing().is_empty());
    }
}

// ── Composite score ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn composite_is_bounded(scenario in arb_scenario(), s in arb_subscores()) {
        prop_assume!(!s.is_empty());
        let scorer = CompositeScorer::from_config(&FusionConfig::default());
        let resolved = weights::resolve(&ScenarioProfile::builtin(scenario).weights, &s).unwrap();
        let score = scorer.score(&resolved.weights, &s);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn composite_is_bounded_for_out_of_range_input(
        g in -5.0f64..5.0,
        n in -5.0f64..5.0,
        e in -5.0f64..5.0,
    ) {
        let scorer = CompositeScorer::from_config(&FusionConfig::default());
        let s = SubScoreSet {
            grounding: Some(g),
            numeric: Some(n),
            entropy: Some(e),
            ..Default::default()
        };
        let resolved = weights::resolve(&ScenarioProfile::builtin(Scenario::Default).weights, &s).unwrap();
        let score = scorer.score(&resolved.weights, &s);
        prop_assert!((0.0..=1.0).contains(&score));
    }

    #[test]
    fn composite_is_monotonic(
        scenario in arb_scenario(),
        s in arb_subscores(),
        component in arb_component(),
        base in 0.0f64..=1.0,
        bump in 0.0f64..=1.0,
    ) {
        let scorer = CompositeScorer::from_config(&FusionConfig::default());
        let vector = ScenarioProfile::builtin(scenario).weights;

        let mut low = s;
        low.set(component, Some(base));
        let mut high = s;
        high.set(component, Some((base + bump).min(1.0)));

        // Same availability, so both resolve to the same weights.
        let resolved = weights::resolve(&vector, &low).unwrap();
        let a = scorer.score(&resolved.weights, &low);
        let b = scorer.score(&resolved.weights, &high);
        prop_assert!(b >= a - 1e-12, "raising {component} lowered composite: {a} -> {b}");
    }
}

// ── Threshold decision ───────────────────────────────────────────────

proptest! {
    #[test]
    fn decision_is_deterministic(scenario in arb_scenario(), score in 0.0f64..=1.0, high_risk: bool) {
        let engine = DecisionEngine::from_config(&FusionConfig::default());
        prop_assert_eq!(
            engine.decide(score, scenario, high_risk),
            engine.decide(score, scenario, high_risk)
        );
    }

    #[test]
    fn high_risk_floor_dominates(
        scenario in arb_scenario(),
        score in 0.0f64..0.85,
        previous in prop::option::of(prop_oneof![Just(Label::Accurate), Just(Label::Hallucination)]),
    ) {
        let engine = DecisionEngine::from_config(&FusionConfig::default());
        prop_assert_eq!(engine.decide(score, scenario, true), Label::Hallucination);
        let decision = engine.decide_with_history(score, scenario, true, previous);
        prop_assert_eq!(decision.label, Label::Hallucination);
    }

    #[test]
    fn held_label_never_crosses_scenarios(
        first in arb_scenario(),
        second in arb_scenario(),
        first_score in 0.0f64..=1.0,
        second_score in 0.0f64..=1.0,
    ) {
        prop_assume!(first != second);
        let engine = ReliabilityEngine::default();
        let mut state = ConversationState::new();
        let subscores = |v: f64| SubScoreSet { numeric: Some(v), temporal: Some(v), ..Default::default() };
        engine
            .evaluate(
                &mut state,
                &TurnInput::new("Tell me about AAPL", "Fine.", subscores(first_score))
                    .with_scenario(first.as_str()),
            )
            .unwrap();
        let report = engine
            .evaluate(
                &mut state,
                &TurnInput::new("Tell me about AAPL", "Fine.", subscores(second_score))
                    .with_scenario(second.as_str()),
            )
            .unwrap();
        let fresh = DecisionEngine::from_config(&FusionConfig::default())
            .decide(report.composite.score, second, false);
        prop_assert_eq!(report.composite.label, fresh);
    }

    #[test]
    fn hysteresis_holds_inside_band(
        threshold in 0.3f64..0.9,
        first in 0.0f64..=1.0,
        offsets in prop::collection::vec(-0.0249f64..0.0249, 1..20),
    ) {
        let hysteresis = LabelHysteresis::new(0.025);
        let mut label = hysteresis.apply(None, first, threshold);
        let mut settled: Option<Label> = None;
        for offset in offsets {
            label = hysteresis.apply(Some(label), threshold + offset, threshold);
            match settled {
                None => settled = Some(label),
                Some(s) => prop_assert_eq!(s, label),
            }
        }
    }
}

// ── Contradiction fusion ─────────────────────────────────────────────

proptest! {
    #[test]
    fn comparative_directional_never_raises(
        raw in 0.0f64..=1.0,
        q_sim in prop::option::of(0.0f64..=1.0),
        a_sim in prop::option::of(0.0f64..=1.0),
        prev_question in arb_prev_question(),
        prev_answer in arb_prev_answer(),
        curr_answer in arb_comparative_answer(),
    ) {
        let fusion = ContradictionFusion::from_config(&FusionConfig::default());
        let prev = Turn::new(prev_question, prev_answer);
        let curr = Turn::new("Compare AAPL vs MSFT", curr_answer);
        let signals = ContradictionSignals {
            raw_nli: Some(raw),
            question_similarity: q_sim,
            answer_similarity: a_sim,
        };
        let a = fusion.fuse(&signals, &prev, &curr);
        if a.fired(FusionStep::DirectionalDiscount) {
            prop_assert!(
                a.adjusted <= raw + 1e-12,
                "{prev_answer:?} -> {curr_answer:?}: {raw} raised to {}",
                a.adjusted
            );
        }
    }

    #[test]
    fn gated_pairs_are_never_consistent(raw in 0.0f64..=1.0, q_sim in 0.0f64..0.7) {
        let fusion = ContradictionFusion::from_config(&FusionConfig::default());
        let prev = Turn::new("What is AAPL's dividend?", "It pays 0.24 per share.");
        let curr = Turn::new("How is the weather in Oslo?", "Rainy.");
        let signals = ContradictionSignals {
            raw_nli: Some(raw),
            question_similarity: Some(q_sim),
            answer_similarity: None,
        };
        let a = fusion.fuse(&signals, &prev, &curr);
        prop_assert!(a.is_gated());
        prop_assert_eq!(a.level, fhri_types::ContradictionLevel::NotApplicable);
    }
}

// ── Temporal smoothing ───────────────────────────────────────────────

proptest! {
    #[test]
    fn ema_stays_between_previous_and_new(
        alpha in 0.01f64..=1.0,
        scores in prop::collection::vec(0.0f64..=1.0, 2..30),
    ) {
        let smoother = TemporalSmoother::new(alpha, 3);
        let mut state = ConversationState::new();
        let mut previous = smoother.smooth(&mut state, scores[0]);
        for &score in &scores[1..] {
            let smoothed = smoother.smooth(&mut state, score);
            let (lo, hi) = if previous <= score { (previous, score) } else { (score, previous) };
            prop_assert!(smoothed >= lo - 1e-12 && smoothed <= hi + 1e-12);
            prop_assert!(state.history.len() <= 3);
            previous = smoothed;
        }
    }
}
