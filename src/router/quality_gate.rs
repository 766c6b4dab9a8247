// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Quality gate for primary-stage candidates
//!
//! Scores a candidate on a weighted checklist and decides whether it is good
//! enough to return without paying for the fallback stage.
//!
//! Weights are held in integer hundredths and summed as integers, so the
//! score for a given candidate is identical on every call.

use std::collections::BTreeMap;

use super::types::{Criterion, CriterionOutcome, QualityEvaluation, ToolCandidate};

/// Default pass threshold
pub const DEFAULT_QUALITY_THRESHOLD: f32 = 0.7;

const NAME_WEIGHT: u32 = 30;
const BRAND_WEIGHT: u32 = 20;
const CATEGORY_WEIGHT: u32 = 20;
const DESCRIPTION_WEIGHT: u32 = 15;
const CONFIDENCE_HIGH_WEIGHT: u32 = 15;
const CONFIDENCE_MID_WEIGHT: u32 = 10;

const NAME_MIN_CHARS: usize = 3;
const DESCRIPTION_MIN_CHARS: usize = 5;
const CONFIDENCE_HIGH: f32 = 0.80;
const CONFIDENCE_MID: f32 = 0.60;

/// Weighted-checklist scorer with a fixed pass threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityGate {
    threshold: f32,
}

impl Default for QualityGate {
    fn default() -> Self {
        Self::new(DEFAULT_QUALITY_THRESHOLD)
    }
}

impl QualityGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Score a candidate against this gate's threshold
    pub fn evaluate(&self, candidate: &ToolCandidate) -> QualityEvaluation {
        evaluate(candidate, self.threshold)
    }
}

/// Score a candidate against `threshold`
///
/// | criterion                          | weight |
/// |------------------------------------|--------|
/// | name longer than 3 chars           | 0.30   |
/// | brand present                      | 0.20   |
/// | category present                   | 0.20   |
/// | description longer than 5 chars    | 0.15   |
/// | confidence >= 0.80 (>= 0.60: 0.10) | 0.15   |
pub fn evaluate(candidate: &ToolCandidate, threshold: f32) -> QualityEvaluation {
    let mut breakdown = BTreeMap::new();
    let mut hundredths = 0u32;

    for criterion in Criterion::ALL {
        let (points, outcome) = score_criterion(criterion, candidate);
        hundredths += points;
        breakdown.insert(criterion, outcome);
    }

    let score = hundredths as f32 / 100.0;

    QualityEvaluation {
        score,
        threshold,
        passed: score >= threshold,
        breakdown,
    }
}

fn score_criterion(criterion: Criterion, candidate: &ToolCandidate) -> (u32, CriterionOutcome) {
    match criterion {
        Criterion::Name => binary(
            char_len(Some(candidate.name.as_str())) > NAME_MIN_CHARS,
            NAME_WEIGHT,
        ),
        Criterion::Brand => binary(candidate.brand.is_some(), BRAND_WEIGHT),
        Criterion::Category => binary(candidate.category.is_some(), CATEGORY_WEIGHT),
        Criterion::Description => binary(
            char_len(candidate.description.as_deref()) > DESCRIPTION_MIN_CHARS,
            DESCRIPTION_WEIGHT,
        ),
        Criterion::Confidence => {
            let confidence = candidate.confidence;
            if confidence >= CONFIDENCE_HIGH {
                (CONFIDENCE_HIGH_WEIGHT, CriterionOutcome::Satisfied)
            } else if confidence >= CONFIDENCE_MID {
                (CONFIDENCE_MID_WEIGHT, CriterionOutcome::Partial)
            } else {
                (0, CriterionOutcome::Failed)
            }
        }
    }
}

fn binary(satisfied: bool, weight: u32) -> (u32, CriterionOutcome) {
    if satisfied {
        (weight, CriterionOutcome::Satisfied)
    } else {
        (0, CriterionOutcome::Failed)
    }
}

fn char_len(value: Option<&str>) -> usize {
    value.map(|s| s.chars().count()).unwrap_or(0)
}
