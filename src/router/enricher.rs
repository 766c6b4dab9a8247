// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fallback enricher contract and the Gemini-backed implementation

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::extract::extract_candidate;
use super::types::{EnrichError, ToolCandidate};
use crate::vision::{GeminiClient, ImageFetcher, ImageRef};

/// Slower, remote analysis used when the primary result is not good enough
///
/// `hint` carries the primary detector's label when it found something; it
/// is `None` when the detector came back empty.
#[async_trait]
pub trait FallbackEnricher: Send + Sync {
    async fn enrich(
        &self,
        image: &ImageRef,
        hint: Option<&str>,
    ) -> Result<ToolCandidate, EnrichError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Whether the enricher finished setup and can take requests
    fn is_available(&self) -> bool {
        true
    }
}

const BASE_PROMPT: &str = r#"You are an expert at identifying tools listed for rental.
Analyze the photo and return the tool's details as JSON:

{
  "name": "specific tool name (e.g. cordless drill, circular saw)",
  "brand": "brand name, or null if unclear",
  "category": "one of: power tool, hand tool, measuring tool, cutting tool",
  "description": "short description of the tool",
  "color": "main color",
  "tool_type": "detailed tool type",
  "condition": "estimated condition",
  "rental_price": "suggested daily rental price in KRW, between 5000 and 30000"
}

Return only JSON."#;

/// Build the enrichment prompt, optionally seeded with a detector label
pub fn build_prompt(hint: Option<&str>) -> String {
    match hint {
        Some(label) => format!(
            "{}\n\nObject detector hint: '{}' (may be inaccurate, verify against the photo).",
            BASE_PROMPT, label
        ),
        None => BASE_PROMPT.to_string(),
    }
}

/// [`FallbackEnricher`] backed by Gemini vision completions
pub struct GeminiEnricher {
    client: GeminiClient,
    fetcher: Arc<dyn ImageFetcher>,
}

impl GeminiEnricher {
    pub fn new(client: GeminiClient, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { client, fetcher }
    }
}

#[async_trait]
impl FallbackEnricher for GeminiEnricher {
    async fn enrich(
        &self,
        image: &ImageRef,
        hint: Option<&str>,
    ) -> Result<ToolCandidate, EnrichError> {
        let loaded = self
            .fetcher
            .fetch(image)
            .await
            .map_err(|e| EnrichError::Fetch(e.to_string()))?;

        let prompt = build_prompt(hint);
        let completion = self
            .client
            .complete_with_image(&prompt, &loaded.to_base64(), loaded.mime_type())
            .await
            .map_err(|e| EnrichError::Remote(format!("{:#}", e)))?;

        info!(
            "Gemini ({}) answered in {}ms, {} tokens",
            completion.model, completion.processing_time_ms, completion.tokens_used
        );
        debug!("Gemini raw response: {}", completion.text);

        extract_candidate(&completion.text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}
