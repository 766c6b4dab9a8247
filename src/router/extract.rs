// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Structured-block extraction from free-form model output
//!
//! Vision models usually answer with a fenced ```json block, sometimes with
//! bare JSON surrounded by prose, and occasionally with prose only. The
//! scanners here locate the first object-shaped block and map it onto a
//! [`ToolCandidate`] tagged as a fallback result.

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::debug;

use super::types::{
    clamp_confidence, EnrichError, Provider, ToolCandidate, DEFAULT_CONDITION,
    DEFAULT_RENTAL_PRICE,
};

/// Lowest daily rental price accepted from the model (KRW)
pub const MIN_RENTAL_PRICE: u32 = 5_000;

/// Highest daily rental price accepted from the model (KRW)
pub const MAX_RENTAL_PRICE: u32 = 30_000;

/// Confidence assigned when the model omits one
pub const DEFAULT_FALLBACK_CONFIDENCE: f32 = 0.8;

/// Parse a model response into a fallback candidate
///
/// Fails with [`EnrichError::MalformedResponse`] when no JSON object can be
/// found or when `name` or `category` is missing.
pub fn extract_candidate(text: &str) -> Result<ToolCandidate, EnrichError> {
    let object = extract_json_object(text).ok_or_else(|| {
        debug!("No JSON object found in {} chars of model output", text.len());
        EnrichError::MalformedResponse
    })?;

    let payload: CandidatePayload =
        serde_json::from_value(Value::Object(object)).map_err(|e| {
            debug!("Model JSON did not match the candidate shape: {}", e);
            EnrichError::MalformedResponse
        })?;

    payload.into_candidate()
}

/// Locate the first JSON object in `text`
///
/// Fenced blocks are tried first; otherwise the first balanced `{...}` span
/// that parses as an object is used.
pub fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    if let Some(body) = fenced_block(text) {
        if let Some(object) = parse_object(body.trim()) {
            return Some(object);
        }
        // a fence may wrap prose plus an object
        if let Some(object) = first_balanced_object(body) {
            return Some(object);
        }
    }
    first_balanced_object(text)
}

fn parse_object(s: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(s) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Body of the first ``` fence, without its language tag
///
/// An unclosed fence runs to the end of the text.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // the language tag runs to the end of the opening line
    let body_start = match after.find('\n') {
        Some(nl) if !after[..nl].contains('{') => nl + 1,
        _ => 0,
    };
    let body = &after[body_start..];
    match body.find("```") {
        Some(end) => Some(&body[..end]),
        None => Some(body),
    }
}

/// Opening braces tried before giving up on brace-heavy text
const MAX_OBJECT_STARTS: usize = 32;

fn first_balanced_object(text: &str) -> Option<Map<String, Value>> {
    let mut search_from = 0;
    let mut attempts = 0;
    while let Some(offset) = text[search_from..].find('{') {
        attempts += 1;
        if attempts > MAX_OBJECT_STARTS {
            return None;
        }
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            if let Some(object) = parse_object(&text[start..start + end]) {
                return Some(object);
            }
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced span opening at `s[0] == '{'`
///
/// Braces inside string literals and escaped quotes are ignored.
fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

#[derive(Debug, Deserialize)]
struct CandidatePayload {
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    category: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    color: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    tool_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    condition: Option<String>,
    #[serde(default, deserialize_with = "lenient_price")]
    rental_price: Option<u32>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    confidence: Option<f32>,
}

impl CandidatePayload {
    fn into_candidate(self) -> Result<ToolCandidate, EnrichError> {
        let (name, category) = match (self.name, self.category) {
            (Some(name), Some(category)) => (name, category),
            _ => return Err(EnrichError::MalformedResponse),
        };

        let mut candidate = ToolCandidate::new(name, Provider::Fallback)
            .with_category(category)
            .with_confidence(self.confidence.unwrap_or(DEFAULT_FALLBACK_CONFIDENCE));
        candidate.brand = self.brand;
        candidate.description = self.description;
        candidate.color = self.color;
        candidate.tool_type = self.tool_type;
        candidate.condition = self
            .condition
            .unwrap_or_else(|| DEFAULT_CONDITION.to_string());
        candidate.rental_price = self
            .rental_price
            .unwrap_or(DEFAULT_RENTAL_PRICE)
            .clamp(MIN_RENTAL_PRICE, MAX_RENTAL_PRICE);

        Ok(candidate)
    }
}

fn is_placeholder(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "" | "null" | "none" | "unknown" | "n/a"
    )
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            if is_placeholder(trimmed) {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

fn lenient_price<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().map(saturate_price),
        Some(Value::String(s)) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse::<u64>().ok().map(|p| p.min(u32::MAX as u64) as u32)
        }
        _ => None,
    })
}

fn saturate_price(p: f64) -> u32 {
    if p.is_nan() || p <= 0.0 {
        0
    } else if p >= u32::MAX as f64 {
        u32::MAX
    } else {
        p.round() as u32
    }
}

fn lenient_confidence<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().map(|c| clamp_confidence(c as f32)),
        Some(Value::String(s)) => s.trim().parse::<f32>().ok().map(clamp_confidence),
        _ => None,
    })
}
