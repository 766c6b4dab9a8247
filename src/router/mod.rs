// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Two-stage tool recognition
//!
//! A fast local detector answers first. Its best detection is scored by the
//! quality gate, and anything below the threshold (or an empty detection set)
//! is escalated to the remote enricher, which parses structured JSON out of a
//! free-form vision completion.

pub mod detector;
pub mod enricher;
pub mod extract;
pub mod pipeline;
pub mod quality_gate;
pub mod types;

pub use detector::{tool_category, PrimaryDetector, YoloToolDetector, GENERIC_CATEGORY};
pub use enricher::{build_prompt, FallbackEnricher, GeminiEnricher};
pub use extract::{extract_candidate, extract_json_object};
pub use pipeline::{candidate_from_detection, AiRouter, PipelineStage};
pub use quality_gate::{evaluate, QualityGate, DEFAULT_QUALITY_THRESHOLD};
pub use types::{
    Criterion, CriterionOutcome, Detection, DetectionError, DetectionSet, EnrichError,
    PipelineResult, Provider, QualityEvaluation, RouterError, ToolCandidate,
};
