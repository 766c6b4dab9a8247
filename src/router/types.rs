// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Core types shared by the routing pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Default condition reported when the provider did not estimate one
pub const DEFAULT_CONDITION: &str = "good condition";

/// Default daily rental price (KRW)
pub const DEFAULT_RENTAL_PRICE: u32 = 15000;

/// A single labeled object found by the primary detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    /// Class index in the detector's label table
    pub class_id: usize,
    /// Human-readable class label (e.g., "scissors")
    pub class_label: String,
    /// Detection confidence (0.0-1.0)
    pub confidence: f32,
    /// Bounding box in source image pixels: [x1, y1, x2, y2]
    pub bbox: [f32; 4],
}

impl Detection {
    pub fn area(&self) -> f32 {
        let [x1, y1, x2, y2] = self.bbox;
        (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
    }
}

/// Ordered detections from one image
///
/// An empty set is a valid outcome and means "no object found".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionSet {
    detections: Vec<Detection>,
}

impl DetectionSet {
    pub fn new(detections: Vec<Detection>) -> Self {
        Self { detections }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Detection> {
        self.detections.iter()
    }

    /// The highest-confidence detection; the earliest one wins a tie
    pub fn primary(&self) -> Option<&Detection> {
        self.detections.iter().fold(None, |best, d| match best {
            Some(b) if b.confidence >= d.confidence => Some(b),
            _ => Some(d),
        })
    }
}

impl From<Vec<Detection>> for DetectionSet {
    fn from(detections: Vec<Detection>) -> Self {
        Self::new(detections)
    }
}

/// Which pipeline stage produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Primary,
    Fallback,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Primary => "primary",
            Provider::Fallback => "fallback",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized analysis result, regardless of which stage produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCandidate {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub condition: String,
    pub rental_price: u32,
    /// Always within [0, 1]; use [`ToolCandidate::with_confidence`] to set it
    pub confidence: f32,
    pub provider: Provider,
}

impl ToolCandidate {
    /// Create a candidate with defaults for every optional field
    pub fn new(name: impl Into<String>, provider: Provider) -> Self {
        Self {
            name: name.into(),
            brand: None,
            category: None,
            description: None,
            tool_type: None,
            color: None,
            condition: DEFAULT_CONDITION.to_string(),
            rental_price: DEFAULT_RENTAL_PRICE,
            confidence: 0.0,
            provider,
        }
    }

    pub fn with_brand(mut self, brand: impl Into<String>) -> Self {
        self.brand = Some(brand.into());
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tool_type(mut self, tool_type: impl Into<String>) -> Self {
        self.tool_type = Some(tool_type.into());
        self
    }

    /// Set confidence, clamped to [0, 1]. NaN becomes 0.
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_confidence(confidence);
        self
    }
}

pub(crate) fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

/// Individual quality-gate checks
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    Name,
    Brand,
    Category,
    Description,
    Confidence,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::Name,
        Criterion::Brand,
        Criterion::Category,
        Criterion::Description,
        Criterion::Confidence,
    ];
}

/// Outcome of a single criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CriterionOutcome {
    Satisfied,
    Partial,
    Failed,
}

/// Result of scoring one candidate against a threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityEvaluation {
    /// Rounded to two decimal places, within [0, 1]
    pub score: f32,
    pub threshold: f32,
    pub passed: bool,
    pub breakdown: BTreeMap<Criterion, CriterionOutcome>,
}

/// The only artifact returned across the pipeline boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub candidate: Option<ToolCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
    /// "primary" or "fallback": the stage that produced the candidate, or that failed
    pub provider: String,
    /// Quality score of the primary candidate, when it was returned directly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f32>,
}

impl PipelineResult {
    pub fn success(candidate: ToolCandidate) -> Self {
        Self {
            success: true,
            provider: candidate.provider.to_string(),
            candidate: Some(candidate),
            error: None,
            processing_time_ms: 0,
            quality_score: None,
        }
    }

    pub fn failure(provider: Provider, error: impl Into<String>) -> Self {
        Self {
            success: false,
            candidate: None,
            error: Some(error.into()),
            processing_time_ms: 0,
            provider: provider.to_string(),
            quality_score: None,
        }
    }

    pub fn with_quality_score(mut self, score: f32) -> Self {
        self.quality_score = Some(score);
        self
    }

    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }
}

/// Primary stage failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DetectionError {
    #[error("image fetch failed: {0}")]
    Fetch(String),

    #[error("image decode failed: {0}")]
    Decode(String),

    #[error("detector inference failed: {0}")]
    Inference(String),

    #[error("detector timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("detector unavailable: {0}")]
    Unavailable(String),
}

/// Fallback stage failure
#[derive(Debug, Clone, Error, PartialEq)]
pub enum EnrichError {
    #[error("image fetch failed: {0}")]
    Fetch(String),

    #[error("remote completion failed: {0}")]
    Remote(String),

    /// No well-formed structured block, or required fields missing
    #[error("malformed_response")]
    MalformedResponse,

    #[error("enricher timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

impl EnrichError {
    pub fn reason(&self) -> String {
        self.to_string()
    }
}

/// Setup failure; the router cannot serve any request
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("infrastructure setup failed: {0}")]
    Infrastructure(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}
