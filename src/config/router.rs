// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Configuration for the routing pipeline and its HTTP surface

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::router::quality_gate::DEFAULT_QUALITY_THRESHOLD;
use crate::vision::fetch::DEFAULT_FETCH_TIMEOUT_MS;
use crate::vision::gemini_client::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::vision::Device;

/// Default per-adapter call timeout
pub const DEFAULT_ADAPTER_TIMEOUT_MS: u64 = 30_000;

/// Default HTTP port
pub const DEFAULT_API_PORT: u16 = 8000;

/// Default location of the YOLOv8 ONNX export
pub const DEFAULT_YOLO_MODEL_PATH: &str = "./models/yolov8n.onnx";

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Requested inference device; CUDA falls back to CPU when unavailable
    pub device: Device,
    /// Path to the YOLOv8 ONNX model
    pub yolo_model_path: PathBuf,
    /// Minimum quality score for a primary candidate to be returned directly
    pub quality_threshold: f32,
    /// Timeout applied to each adapter call, in milliseconds
    pub adapter_timeout_ms: u64,
    /// Gemini API key
    pub gemini_api_key: Option<String>,
    /// Gemini model name
    pub gemini_model: String,
    /// Gemini API base URL
    pub gemini_endpoint: String,
    /// Image download timeout in milliseconds
    pub image_fetch_timeout_ms: u64,
    /// HTTP listen port
    pub api_port: u16,
}

impl RouterConfig {
    /// Load configuration from environment variables
    ///
    /// Missing or malformed values fall back to their defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            device: parse_env("DEVICE").unwrap_or(defaults.device),
            yolo_model_path: env::var("YOLO_MODEL")
                .map(PathBuf::from)
                .unwrap_or(defaults.yolo_model_path),
            quality_threshold: parse_env("QUALITY_THRESHOLD")
                .unwrap_or(defaults.quality_threshold),
            adapter_timeout_ms: parse_env("ADAPTER_TIMEOUT_MS")
                .unwrap_or(defaults.adapter_timeout_ms),
            gemini_api_key: env::var("GEMINI_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            gemini_model: env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_endpoint: env::var("GEMINI_ENDPOINT").unwrap_or(defaults.gemini_endpoint),
            image_fetch_timeout_ms: parse_env("IMAGE_FETCH_TIMEOUT_MS")
                .unwrap_or(defaults.image_fetch_timeout_ms),
            api_port: parse_env("API_PORT").unwrap_or(defaults.api_port),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.quality_threshold) {
            return Err(format!(
                "Quality threshold must be within [0, 1], got {}",
                self.quality_threshold
            ));
        }
        if self.adapter_timeout_ms == 0 {
            return Err("Adapter timeout must be greater than 0".to_string());
        }
        if self.image_fetch_timeout_ms == 0 {
            return Err("Image fetch timeout must be greater than 0".to_string());
        }
        if self.gemini_api_key.is_none() {
            return Err("GEMINI_API_KEY is not set".to_string());
        }
        Ok(())
    }

    pub fn adapter_timeout(&self) -> Duration {
        Duration::from_millis(self.adapter_timeout_ms)
    }

    pub fn image_fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.image_fetch_timeout_ms)
    }
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            device: Device::Cuda,
            yolo_model_path: PathBuf::from(DEFAULT_YOLO_MODEL_PATH),
            quality_threshold: DEFAULT_QUALITY_THRESHOLD,
            adapter_timeout_ms: DEFAULT_ADAPTER_TIMEOUT_MS,
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_endpoint: DEFAULT_GEMINI_ENDPOINT.to_string(),
            image_fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            api_port: DEFAULT_API_PORT,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
