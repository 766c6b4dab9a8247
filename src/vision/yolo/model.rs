// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 object detection model (ONNX Runtime)

use anyhow::{Context, Result};
use image::DynamicImage;
use ort::execution_providers::{CPUExecutionProvider, CUDAExecutionProvider};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::postprocessing::{decode_predictions, YoloParams};
use super::preprocessing::preprocess_for_yolo;
use crate::router::types::Detection;
use crate::vision::accelerator::{AcceleratorContext, Device};

/// YOLOv8 detector bound to one inference device
///
/// The session lives inside an [`AcceleratorContext`], so concurrent
/// requests take turns on the device and each turn is released even when
/// inference fails.
#[derive(Clone)]
pub struct YoloModel {
    context: Arc<AcceleratorContext<Session>>,
    input_name: String,
    params: YoloParams,
}

impl std::fmt::Debug for YoloModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloModel")
            .field("device", &self.context.device())
            .field("input_name", &self.input_name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

impl YoloModel {
    /// Load a YOLOv8 ONNX export
    ///
    /// With `Device::Cuda` the CUDA execution provider is required to
    /// register; if it cannot (no driver, no GPU), the model is loaded on CPU
    /// instead and a warning is logged.
    pub async fn new<P: AsRef<Path>>(model_path: P, device: Device) -> Result<Self> {
        let model_path = model_path.as_ref();

        if !model_path.exists() {
            anyhow::bail!("YOLO model not found: {}", model_path.display());
        }

        info!(
            "Loading YOLO model from {} (requested device: {})",
            model_path.display(),
            device
        );

        let (session, device) = match device {
            Device::Cuda => match build_session(model_path, Device::Cuda) {
                Ok(session) => (session, Device::Cuda),
                Err(e) => {
                    warn!("⚠️ CUDA initialization failed, falling back to CPU: {:#}", e);
                    (build_session(model_path, Device::Cpu)?, Device::Cpu)
                }
            },
            Device::Cpu => (build_session(model_path, Device::Cpu)?, Device::Cpu),
        };

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        debug!("YOLO model input: {}", input_name);
        info!("✅ YOLO model ready (device: {})", device);

        Ok(Self {
            context: Arc::new(AcceleratorContext::new(session, device)),
            input_name,
            params: YoloParams::default(),
        })
    }

    pub fn with_params(mut self, params: YoloParams) -> Self {
        self.params = params;
        self
    }

    pub fn device(&self) -> Device {
        self.context.device()
    }

    pub fn params(&self) -> &YoloParams {
        &self.params
    }

    /// Run detection on a decoded photo
    ///
    /// Blocking; call from `spawn_blocking` inside async code.
    pub fn detect(&self, image: &DynamicImage) -> Result<Vec<Detection>> {
        self.detect_unless(image, &AtomicBool::new(false))
    }

    /// Run detection unless `cancelled` is raised before the device is free
    ///
    /// Used when the caller may time out: a request that has already been
    /// answered must not keep later requests queued behind its inference.
    pub fn detect_unless(
        &self,
        image: &DynamicImage,
        cancelled: &AtomicBool,
    ) -> Result<Vec<Detection>> {
        let (tensor, letterbox) = preprocess_for_yolo(image);

        let input_value = Value::from_array(tensor).context("Failed to create input tensor")?;

        let output = {
            let mut session = match self.context.lease_unless(cancelled) {
                Some(session) => session,
                None => anyhow::bail!("YOLO inference cancelled before it started"),
            };
            let outputs = session
                .run(ort::inputs![&self.input_name => input_value])
                .context("YOLO inference failed")?;
            // owned copy so nothing borrows the session past the lease
            let predictions = outputs[0]
                .try_extract_array::<f32>()
                .context("Failed to extract output tensor")?
                .to_owned();
            predictions
        };

        let detections = decode_predictions(output.view(), &letterbox, &self.params)?;
        debug!("YOLO produced {} detections", detections.len());

        Ok(detections)
    }
}

fn build_session(model_path: &Path, device: Device) -> Result<Session> {
    let builder = Session::builder().context("Failed to create session builder")?;

    let builder = match device {
        Device::Cuda => builder
            .with_execution_providers([CUDAExecutionProvider::default().build().error_on_failure()])
            .context("Failed to register CUDA execution provider")?,
        Device::Cpu => builder
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?,
    };

    builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .context("Failed to set optimization level")?
        .with_intra_threads(4)
        .context("Failed to set intra threads")?
        .commit_from_file(model_path)
        .context(format!(
            "Failed to load YOLO model from {}",
            model_path.display()
        ))
}
