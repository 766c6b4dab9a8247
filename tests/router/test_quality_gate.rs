// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Scoring properties of the quality gate

use gonggu_ai_router::router::{evaluate, Provider, QualityGate, ToolCandidate};

fn candidate(
    name: &str,
    brand: Option<&str>,
    category: Option<&str>,
    description: Option<&str>,
    confidence: f32,
) -> ToolCandidate {
    let mut c = ToolCandidate::new(name, Provider::Primary).with_confidence(confidence);
    c.brand = brand.map(str::to_string);
    c.category = category.map(str::to_string);
    c.description = description.map(str::to_string);
    c
}

/// Every combination of present/absent fields across confidence tiers
fn grid() -> Vec<ToolCandidate> {
    let mut out = Vec::new();
    for name in ["", "saw", "Hammer Drill"] {
        for brand in [None, Some("Bosch")] {
            for category in [None, Some("power tool")] {
                for description in [None, Some("short"), Some("Heavy duty rotary hammer")] {
                    for confidence in [0.0, 0.59, 0.6, 0.79, 0.8, 1.0] {
                        out.push(candidate(name, brand, category, description, confidence));
                    }
                }
            }
        }
    }
    out
}

#[test]
fn test_reference_candidate_scores_080_and_passes() {
    let c = candidate(
        "Angle Grin",
        None,
        Some("power tool"),
        Some("4in disc"),
        0.9,
    );
    let eval = QualityGate::default().evaluate(&c);
    assert_eq!(eval.score, 0.8);
    assert!(eval.passed);
}

#[test]
fn test_reference_candidate_scores_045_and_fails() {
    let c = candidate("Angle Grin", None, None, Some("4in disc"), 0.5);
    let eval = QualityGate::default().evaluate(&c);
    assert_eq!(eval.score, 0.45);
    assert!(!eval.passed);
}

#[test]
fn test_score_bounds_and_pass_rule() {
    for threshold in [0.0, 0.45, 0.7, 1.0] {
        for c in grid() {
            let eval = evaluate(&c, threshold);
            assert!((0.0..=1.0).contains(&eval.score));
            assert_eq!(eval.passed, eval.score >= threshold);
            assert_eq!(eval.threshold, threshold);
        }
    }
}

#[test]
fn test_score_is_deterministic() {
    for c in grid() {
        let first = evaluate(&c, 0.7);
        let second = evaluate(&c.clone(), 0.7);
        assert_eq!(first, second);
        assert_eq!(first.score.to_bits(), second.score.to_bits());
    }
}

#[test]
fn test_adding_fields_never_lowers_score() {
    for c in grid() {
        let base = evaluate(&c, 0.7).score;

        let mut with_brand = c.clone();
        with_brand.brand = Some("Makita".to_string());
        assert!(evaluate(&with_brand, 0.7).score >= base);

        let mut with_category = c.clone();
        with_category.category = Some("hand tool".to_string());
        assert!(evaluate(&with_category, 0.7).score >= base);

        let mut with_description = c.clone();
        with_description.description = Some("Long enough description".to_string());
        assert!(evaluate(&with_description, 0.7).score >= base);

        let more_confident = c.clone().with_confidence(1.0);
        assert!(evaluate(&more_confident, 0.7).score >= base);
    }
}

#[test]
fn test_score_has_two_decimal_resolution() {
    for c in grid() {
        let score = evaluate(&c, 0.7).score;
        let hundredths = score * 100.0;
        assert!((hundredths - hundredths.round()).abs() < 1e-4);
    }
}
