// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze response types

use serde::{Deserialize, Serialize};

use crate::router::{PipelineResult, ToolCandidate, GENERIC_CATEGORY};

/// Name reported when a candidate arrives without one
const DEFAULT_TOOL_NAME: &str = "tool";

/// One recognized tool, ready for the listing form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResponse {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub condition: String,
    pub rental_price: u32,
    pub confidence: f32,
    /// "primary" or "fallback"
    pub provider: String,
}

impl From<ToolCandidate> for CandidateResponse {
    fn from(candidate: ToolCandidate) -> Self {
        let name = if candidate.name.trim().is_empty() {
            DEFAULT_TOOL_NAME.to_string()
        } else {
            candidate.name
        };
        Self {
            name,
            brand: candidate.brand,
            category: candidate
                .category
                .unwrap_or_else(|| GENERIC_CATEGORY.to_string()),
            description: candidate.description,
            tool_type: candidate.tool_type,
            color: candidate.color,
            condition: candidate.condition,
            rental_price: candidate.rental_price,
            confidence: candidate.confidence,
            provider: candidate.provider.to_string(),
        }
    }
}

/// Response from POST /analyze
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    /// Zero or one candidate
    pub candidates: Vec<CandidateResponse>,
    pub processing_time_ms: u64,
    /// Stage that produced the candidate, or that failed
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<PipelineResult> for AnalyzeResponse {
    fn from(result: PipelineResult) -> Self {
        Self {
            success: result.success,
            candidates: result
                .candidate
                .map(CandidateResponse::from)
                .into_iter()
                .collect(),
            processing_time_ms: result.processing_time_ms,
            provider: result.provider,
            quality_score: result.quality_score,
            error: result.error,
        }
    }
}
