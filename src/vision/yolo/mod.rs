// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 object detection for tool photos
//!
//! Components:
//! - `preprocessing` - Letterbox resize and NCHW tensor layout
//! - `postprocessing` - Box decoding and non-maximum suppression
//! - `labels` - COCO class names
//! - `model` - ONNX Runtime session wrapper

pub mod labels;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;

pub use model::YoloModel;
pub use postprocessing::YoloParams;
pub use preprocessing::{Letterbox, YOLO_INPUT_SIZE};
