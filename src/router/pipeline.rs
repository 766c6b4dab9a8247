// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Cascade orchestration
//!
//! Runs the primary detector, scores its best detection, and escalates to the
//! fallback enricher when nothing was found or the score is below the gate.
//! Every request ends in a [`PipelineResult`]; no per-request error escapes.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::detector::{tool_category, PrimaryDetector, YoloToolDetector, GENERIC_CATEGORY};
use super::enricher::{FallbackEnricher, GeminiEnricher};
use super::quality_gate::QualityGate;
use super::types::{
    clamp_confidence, Detection, DetectionError, DetectionSet, EnrichError, PipelineResult,
    Provider, RouterError, ToolCandidate,
};
use crate::config::RouterConfig;
use crate::vision::{Device, GeminiClient, HttpImageFetcher, ImageFetcher, ImageRef, YoloModel};

/// Position in the cascade, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Start,
    PrimaryDetect,
    NoDetection,
    Score,
    Pass,
    Fail,
    Fallback,
    Done,
    Error,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Start => "start",
            PipelineStage::PrimaryDetect => "primary_detect",
            PipelineStage::NoDetection => "no_detection",
            PipelineStage::Score => "score",
            PipelineStage::Pass => "pass",
            PipelineStage::Fail => "fail",
            PipelineStage::Fallback => "fallback",
            PipelineStage::Done => "done",
            PipelineStage::Error => "error",
        };
        f.write_str(name)
    }
}

/// Two-stage tool recognition router
///
/// Built once at startup and shared behind an `Arc`; safe for concurrent
/// requests.
pub struct AiRouter {
    detector: Arc<dyn PrimaryDetector>,
    enricher: Arc<dyn FallbackEnricher>,
    quality_gate: QualityGate,
    adapter_timeout: Duration,
    device: Option<Device>,
}

impl AiRouter {
    pub fn new(
        detector: Arc<dyn PrimaryDetector>,
        enricher: Arc<dyn FallbackEnricher>,
        quality_gate: QualityGate,
        adapter_timeout: Duration,
    ) -> Self {
        Self {
            detector,
            enricher,
            quality_gate,
            adapter_timeout,
            device: None,
        }
    }

    /// Build the YOLO + Gemini router from configuration
    pub async fn from_config(config: &RouterConfig) -> Result<Self, RouterError> {
        config.validate().map_err(RouterError::Config)?;

        info!("🚀 Initializing AI router...");

        let fetcher: Arc<dyn ImageFetcher> = Arc::new(
            HttpImageFetcher::new(config.image_fetch_timeout())
                .map_err(|e| RouterError::Infrastructure(format!("{:#}", e)))?,
        );

        let model = YoloModel::new(&config.yolo_model_path, config.device)
            .await
            .map_err(|e| RouterError::Infrastructure(format!("{:#}", e)))?;
        let device = model.device();
        info!("✅ Primary detector (YOLO) ready on {}", device);

        let api_key = config.gemini_api_key.as_deref().unwrap_or_default();
        let client = GeminiClient::new(
            &config.gemini_endpoint,
            &config.gemini_model,
            api_key,
            config.adapter_timeout(),
        )
        .map_err(|e| RouterError::Infrastructure(format!("{:#}", e)))?;
        info!("✅ Fallback enricher (Gemini {}) ready", client.model_name());

        let router = Self::new(
            Arc::new(YoloToolDetector::new(model, fetcher.clone())),
            Arc::new(GeminiEnricher::new(client, fetcher)),
            QualityGate::new(config.quality_threshold),
            config.adapter_timeout(),
        );

        info!(
            "✅ AI router initialized (threshold: {}, timeout: {}ms)",
            config.quality_threshold, config.adapter_timeout_ms
        );

        Ok(Self {
            device: Some(device),
            ..router
        })
    }

    /// True once both adapters can take requests
    pub fn is_ready(&self) -> bool {
        self.detector.is_available() && self.enricher.is_available()
    }

    pub fn quality_gate(&self) -> &QualityGate {
        &self.quality_gate
    }

    /// Device the detector actually runs on, when known
    pub fn device(&self) -> Option<Device> {
        self.device
    }

    /// Analyze one photo
    pub async fn analyze(&self, image: &ImageRef) -> PipelineResult {
        let request_id = Uuid::new_v4();
        let span = info_span!("analyze", request_id = %request_id);

        async {
            let start = Instant::now();
            let result = self.run(image).await;
            let elapsed_ms = start.elapsed().as_millis() as u64;

            info!(
                "🏁 {} (success: {}, provider: {}, {}ms)",
                if result.success { PipelineStage::Done } else { PipelineStage::Error },
                result.success,
                result.provider,
                elapsed_ms
            );

            result.with_processing_time(elapsed_ms)
        }
        .instrument(span)
        .await
    }

    async fn run(&self, image: &ImageRef) -> PipelineResult {
        debug!("{}: {}", PipelineStage::Start, image);

        info!("🔍 {} via {}", PipelineStage::PrimaryDetect, self.detector.name());
        let detections = match self.detect(image).await {
            Ok(detections) => detections,
            Err(e) => {
                error!("❌ Primary detector failed: {}", e);
                return PipelineResult::failure(Provider::Primary, e.to_string());
            }
        };

        let primary = match detections.primary() {
            Some(detection) => detection,
            None => {
                info!(
                    "{}: escalating to {} without hint",
                    PipelineStage::NoDetection,
                    self.enricher.name()
                );
                return self.fallback(image, None).await;
            }
        };

        debug!(
            "{}: {} detections, best '{}' at {:.2}",
            PipelineStage::Score,
            detections.len(),
            primary.class_label,
            primary.confidence
        );

        let candidate = candidate_from_detection(primary);
        let evaluation = self.quality_gate.evaluate(&candidate);

        if evaluation.passed {
            info!(
                "✅ {}: quality {:.2} >= {:.2}, returning primary candidate '{}'",
                PipelineStage::Pass,
                evaluation.score,
                evaluation.threshold,
                candidate.name
            );
            return PipelineResult::success(candidate).with_quality_score(evaluation.score);
        }

        info!(
            "⚠️ {}: quality {:.2} < {:.2}, escalating with hint '{}'",
            PipelineStage::Fail,
            evaluation.score,
            evaluation.threshold,
            primary.class_label
        );
        self.fallback(image, Some(&primary.class_label)).await
    }

    async fn detect(&self, image: &ImageRef) -> Result<DetectionSet, DetectionError> {
        let timeout_ms = self.adapter_timeout.as_millis() as u64;
        guarded(self.detector.detect(image), self.adapter_timeout)
            .await
            .unwrap_or_else(|failure| {
                Err(match failure {
                    Guard::TimedOut => DetectionError::Timeout { timeout_ms },
                    Guard::Panicked(msg) => {
                        DetectionError::Inference(format!("detector panicked: {}", msg))
                    }
                })
            })
    }

    async fn fallback(&self, image: &ImageRef, hint: Option<&str>) -> PipelineResult {
        info!("🌐 {} via {}", PipelineStage::Fallback, self.enricher.name());

        let timeout_ms = self.adapter_timeout.as_millis() as u64;
        let outcome = guarded(self.enricher.enrich(image, hint), self.adapter_timeout)
            .await
            .unwrap_or_else(|failure| {
                Err(match failure {
                    Guard::TimedOut => EnrichError::Timeout { timeout_ms },
                    Guard::Panicked(msg) => {
                        EnrichError::Remote(format!("enricher panicked: {}", msg))
                    }
                })
            });

        match outcome {
            Ok(candidate) => {
                let candidate = normalize_fallback(candidate);
                info!("✅ Fallback candidate '{}'", candidate.name);
                PipelineResult::success(candidate)
            }
            Err(e) => {
                warn!("❌ Fallback enricher failed: {}", e);
                PipelineResult::failure(Provider::Fallback, e.reason())
            }
        }
    }
}

/// Why a guarded adapter call produced no output
enum Guard {
    TimedOut,
    Panicked(String),
}

/// Run an adapter future with a deadline, catching panics
async fn guarded<F, T>(future: F, timeout: Duration) -> Result<T, Guard>
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(timeout, AssertUnwindSafe(future).catch_unwind()).await {
        Err(_) => Err(Guard::TimedOut),
        Ok(Err(panic)) => Err(Guard::Panicked(panic_message(panic.as_ref()))),
        Ok(Ok(output)) => Ok(output),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Candidate assembled from the detector's best detection
pub fn candidate_from_detection(detection: &Detection) -> ToolCandidate {
    let label = detection.class_label.as_str();
    ToolCandidate::new(label, Provider::Primary)
        .with_category(tool_category(label))
        .with_description(format!("{} tool", label))
        .with_tool_type(label)
        .with_confidence(detection.confidence)
}

fn normalize_fallback(mut candidate: ToolCandidate) -> ToolCandidate {
    candidate.provider = Provider::Fallback;
    candidate.confidence = clamp_confidence(candidate.confidence);
    if candidate.category.is_none() {
        candidate.category = Some(GENERIC_CATEGORY.to_string());
    }
    candidate
}
