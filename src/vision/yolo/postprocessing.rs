// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Decoding of raw YOLOv8 output into detections

use anyhow::Result;
use ndarray::{ArrayViewD, Axis, Ix2};
use serde::{Deserialize, Serialize};

use super::labels::{label_for, COCO_LABELS};
use super::preprocessing::Letterbox;
use crate::router::types::Detection;

/// Thresholds applied after inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoloParams {
    pub conf_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    /// Number of class-score channels after the four box channels
    pub num_classes: usize,
}

impl Default for YoloParams {
    fn default() -> Self {
        Self {
            conf_threshold: 0.25,
            iou_threshold: 0.45,
            max_detections: 100,
            num_classes: COCO_LABELS.len(),
        }
    }
}

/// Decode a `[1, 4 + C, N]` (or transposed `[1, N, 4 + C]`) prediction tensor
///
/// Rows 0..4 are `cx, cy, w, h` in model space; the remaining rows are
/// per-class scores. Boxes are returned in source-image pixels, highest
/// confidence first.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    letterbox: &Letterbox,
    params: &YoloParams,
) -> Result<Vec<Detection>> {
    let shape = output.shape().to_vec();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected YOLO output shape: {:?}", shape);
    }

    let channels = 4 + params.num_classes;
    let batch = output.index_axis(Axis(0), 0).into_dimensionality::<Ix2>()?;
    let predictions = if shape[1] == channels {
        batch
    } else if shape[2] == channels {
        batch.reversed_axes()
    } else {
        anyhow::bail!(
            "YOLO output {:?} does not carry {} channels",
            shape,
            channels
        );
    };

    let mut candidates = Vec::new();
    for anchor in predictions.axis_iter(Axis(1)) {
        let (class_id, score) = anchor
            .iter()
            .skip(4)
            .enumerate()
            .fold((0usize, f32::MIN), |best, (i, &s)| {
                if s > best.1 {
                    (i, s)
                } else {
                    best
                }
            });

        if score < params.conf_threshold {
            continue;
        }

        let (cx, cy, w, h) = (anchor[0], anchor[1], anchor[2], anchor[3]);
        let (x1, y1) = letterbox.unmap(cx - w / 2.0, cy - h / 2.0);
        let (x2, y2) = letterbox.unmap(cx + w / 2.0, cy + h / 2.0);

        candidates.push(Detection {
            class_id,
            class_label: label_for(class_id),
            confidence: score.clamp(0.0, 1.0),
            bbox: [x1, y1, x2, y2],
        });
    }

    Ok(non_max_suppression(candidates, params))
}

/// Class-aware greedy NMS
pub fn non_max_suppression(mut candidates: Vec<Detection>, params: &YoloParams) -> Vec<Detection> {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in candidates {
        if kept.len() >= params.max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > params.iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}

/// Intersection over union of two `[x1, y1, x2, y2]` boxes
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let ix1 = a[0].max(b[0]);
    let iy1 = a[1].max(b[1]);
    let ix2 = a[2].min(b[2]);
    let iy2 = a[3].min(b[3]);

    let inter = (ix2 - ix1).max(0.0) * (iy2 - iy1).max(0.0);
    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter;

    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
