// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! YOLOv8 output decoding on synthetic prediction tensors

use gonggu_ai_router::vision::yolo::postprocessing::decode_predictions;
use gonggu_ai_router::vision::yolo::{Letterbox, YoloParams, YOLO_INPUT_SIZE};
use ndarray::Array3;

const SCISSORS: usize = 76;
const KNIFE: usize = 43;

/// Build a `[1, 84, N]` tensor from (cx, cy, w, h, class, score) anchors
fn tensor(anchors: &[(f32, f32, f32, f32, usize, f32)]) -> Array3<f32> {
    let mut out = Array3::<f32>::zeros((1, 84, anchors.len()));
    for (i, &(cx, cy, w, h, class, score)) in anchors.iter().enumerate() {
        out[[0, 0, i]] = cx;
        out[[0, 1, i]] = cy;
        out[[0, 2, i]] = w;
        out[[0, 3, i]] = h;
        out[[0, 4 + class, i]] = score;
    }
    out
}

fn square() -> Letterbox {
    Letterbox::fit(YOLO_INPUT_SIZE, YOLO_INPUT_SIZE, YOLO_INPUT_SIZE)
}

#[test]
fn test_decode_suppresses_overlaps_and_low_scores() {
    let output = tensor(&[
        (320.0, 320.0, 100.0, 100.0, SCISSORS, 0.9),
        (322.0, 318.0, 100.0, 100.0, SCISSORS, 0.6),
        (100.0, 100.0, 40.0, 40.0, KNIFE, 0.1),
    ]);

    let detections =
        decode_predictions(output.into_dyn().view(), &square(), &YoloParams::default()).unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_label, "scissors");
    assert_eq!(detections[0].class_id, SCISSORS);
    assert!((detections[0].confidence - 0.9).abs() < 1e-6);
    let [x1, y1, x2, y2] = detections[0].bbox;
    assert!((x1 - 270.0).abs() < 1e-3 && (y1 - 270.0).abs() < 1e-3);
    assert!((x2 - 370.0).abs() < 1e-3 && (y2 - 370.0).abs() < 1e-3);
}

#[test]
fn test_decode_keeps_overlapping_boxes_of_different_classes() {
    let output = tensor(&[
        (320.0, 320.0, 100.0, 100.0, SCISSORS, 0.8),
        (320.0, 320.0, 100.0, 100.0, KNIFE, 0.7),
    ]);

    let detections =
        decode_predictions(output.into_dyn().view(), &square(), &YoloParams::default()).unwrap();

    assert_eq!(detections.len(), 2);
    assert_eq!(detections[0].class_label, "scissors");
    assert_eq!(detections[1].class_label, "knife");
}

#[test]
fn test_decode_maps_back_through_letterbox() {
    // 1280x640 source: scale 0.5, 160px of vertical padding
    let letterbox = Letterbox::fit(1280, 640, YOLO_INPUT_SIZE);
    let output = tensor(&[(320.0, 320.0, 100.0, 50.0, KNIFE, 0.75)]);

    let detections =
        decode_predictions(output.into_dyn().view(), &letterbox, &YoloParams::default()).unwrap();

    let [x1, y1, x2, y2] = detections[0].bbox;
    assert!((x1 - 540.0).abs() < 1e-2);
    assert!((y1 - 270.0).abs() < 1e-2);
    assert!((x2 - 740.0).abs() < 1e-2);
    assert!((y2 - 370.0).abs() < 1e-2);
}

#[test]
fn test_decode_accepts_transposed_layout() {
    let output = tensor(&[(320.0, 320.0, 100.0, 100.0, SCISSORS, 0.9)]);
    let transposed = output.permuted_axes([0, 2, 1]);

    let detections =
        decode_predictions(transposed.into_dyn().view(), &square(), &YoloParams::default())
            .unwrap();

    assert_eq!(detections.len(), 1);
    assert_eq!(detections[0].class_label, "scissors");
}

#[test]
fn test_decode_empty_when_nothing_confident() {
    let output = tensor(&[(320.0, 320.0, 100.0, 100.0, SCISSORS, 0.2)]);

    let detections =
        decode_predictions(output.into_dyn().view(), &square(), &YoloParams::default()).unwrap();

    assert!(detections.is_empty());
}

#[test]
fn test_decode_rejects_unexpected_shape() {
    let output = Array3::<f32>::zeros((1, 10, 10));
    let result = decode_predictions(output.into_dyn().view(), &square(), &YoloParams::default());
    assert!(result.is_err());
}
