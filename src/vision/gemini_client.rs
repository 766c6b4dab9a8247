// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Gemini client for vision completions via the `generateContent` REST API

use anyhow::Result;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Public Gemini API endpoint
pub const DEFAULT_GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com";

/// Default multimodal model
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Output budget per completion; 2.5-series thinking tokens count against it
const MAX_OUTPUT_TOKENS: u32 = 4096;

/// Thinking cap, valid for both flash and pro, so the JSON answer always has room
const THINKING_BUDGET: u32 = 1024;

// --- generateContent serde structs ---

#[derive(serde::Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(serde::Serialize)]
struct Content {
    role: String,
    parts: Vec<serde_json::Value>,
}

#[derive(serde::Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
    #[serde(rename = "thinkingConfig")]
    thinking_config: ThinkingConfig,
}

#[derive(serde::Serialize)]
struct ThinkingConfig {
    #[serde(rename = "thinkingBudget")]
    thinking_budget: u32,
}

#[derive(serde::Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(serde::Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(serde::Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(serde::Deserialize)]
struct UsageMetadata {
    #[serde(rename = "totalTokenCount", default)]
    total_token_count: u32,
}

// --- Result types ---

/// Raw text returned by one vision completion
#[derive(Debug, Clone)]
pub struct GeminiCompletion {
    pub text: String,
    pub model: String,
    pub processing_time_ms: u64,
    pub tokens_used: u32,
}

/// Client for the Gemini `generateContent` endpoint
pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model_name: String,
    api_key: String,
}

impl GeminiClient {
    /// Create a new Gemini client
    pub fn new(endpoint: &str, model_name: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            anyhow::bail!("Gemini API key is empty");
        }

        let client = Client::builder().timeout(timeout).build()?;

        let endpoint = endpoint.trim_end_matches('/').to_string();
        info!(
            "Gemini client configured: endpoint={}, model={}",
            endpoint, model_name
        );

        Ok(Self {
            client,
            endpoint,
            model_name: model_name.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.endpoint, self.model_name
        )
    }

    /// Send a prompt plus one inline image and return the concatenated text
    pub async fn complete_with_image(
        &self,
        prompt: &str,
        base64_image: &str,
        mime_type: &str,
    ) -> Result<GeminiCompletion> {
        let start = std::time::Instant::now();

        let request = build_request(prompt, base64_image, mime_type);

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error: {} - {}", status.as_u16(), truncate(&body, 200));
        }

        let generated: GenerateResponse = response.json().await?;
        let tokens_used = generated
            .usage_metadata
            .as_ref()
            .map(|u| u.total_token_count)
            .unwrap_or(0);
        let text = first_candidate_text(generated)
            .ok_or_else(|| anyhow::anyhow!("Gemini returned no text candidates"))?;

        debug!("Gemini completion: {} chars, {} tokens", text.len(), tokens_used);

        Ok(GeminiCompletion {
            text,
            model: self.model_name.clone(),
            processing_time_ms: start.elapsed().as_millis() as u64,
            tokens_used,
        })
    }
}

fn build_request(prompt: &str, base64_image: &str, mime_type: &str) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            role: "user".to_string(),
            parts: vec![
                serde_json::json!({ "text": prompt }),
                serde_json::json!({
                    "inline_data": { "mime_type": mime_type, "data": base64_image }
                }),
            ],
        }],
        generation_config: GenerationConfig {
            temperature: 0.2,
            max_output_tokens: MAX_OUTPUT_TOKENS,
            thinking_config: ThinkingConfig {
                thinking_budget: THINKING_BUDGET,
            },
        },
    }
}

fn first_candidate_text(response: GenerateResponse) -> Option<String> {
    let content = response.candidates.into_iter().next()?.content?;
    let text: String = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
