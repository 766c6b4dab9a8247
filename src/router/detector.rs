// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Primary detector contract and the YOLO-backed implementation

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::types::{DetectionError, DetectionSet};
use crate::vision::{ImageError, ImageFetcher, ImageRef, YoloModel};

/// Category used for labels missing from the lookup table
pub const GENERIC_CATEGORY: &str = "power tool";

/// Fast, local object detection run on every request
///
/// Implementations resolve the image themselves and return every detection
/// they found; an empty set is a valid answer.
#[async_trait]
pub trait PrimaryDetector: Send + Sync {
    async fn detect(&self, image: &ImageRef) -> Result<DetectionSet, DetectionError>;

    /// Provider name for logging
    fn name(&self) -> &'static str;

    /// Whether the detector finished setup and can take requests
    fn is_available(&self) -> bool {
        true
    }
}

/// Map a detector label onto a rental-catalog category
///
/// The stock COCO model only knows a handful of tool-like classes; anything
/// else is assumed to be a power tool until a tool-specific model ships.
pub fn tool_category(label: &str) -> &'static str {
    match label {
        "scissors" => "hand tool",
        "knife" => "cutting tool",
        "bottle" | "cup" => "other",
        _ => GENERIC_CATEGORY,
    }
}

/// [`PrimaryDetector`] backed by a YOLOv8 ONNX session
pub struct YoloToolDetector {
    model: YoloModel,
    fetcher: Arc<dyn ImageFetcher>,
}

impl YoloToolDetector {
    pub fn new(model: YoloModel, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { model, fetcher }
    }
}

#[async_trait]
impl PrimaryDetector for YoloToolDetector {
    async fn detect(&self, image: &ImageRef) -> Result<DetectionSet, DetectionError> {
        let loaded = self.fetcher.fetch(image).await.map_err(detection_error)?;

        debug!(
            "Running YOLO on {}x{} image ({})",
            loaded.width(),
            loaded.height(),
            loaded.mime_type()
        );

        // The orchestrator drops this future on timeout; the guard then tells
        // the blocking task to skip inference if it has not started yet
        let cancel = CancelOnDrop::new();
        let cancelled = cancel.flag();

        let model = self.model.clone();
        let detections =
            tokio::task::spawn_blocking(move || model.detect_unless(&loaded.image, &cancelled))
                .await
                .map_err(|e| DetectionError::Inference(format!("detector task failed: {}", e)))?
                .map_err(|e| DetectionError::Inference(format!("{:#}", e)))?;

        Ok(DetectionSet::new(detections))
    }

    fn name(&self) -> &'static str {
        "yolo"
    }
}

/// Raises a shared flag when dropped
struct CancelOnDrop(Arc<AtomicBool>);

impl CancelOnDrop {
    fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    fn flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.0)
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn detection_error(err: ImageError) -> DetectionError {
    if err.is_fetch_error() {
        DetectionError::Fetch(err.to_string())
    } else {
        DetectionError::Decode(err.to_string())
    }
}
