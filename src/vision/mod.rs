// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision backends used by the routing pipeline
//!
//! This module provides:
//! - Image fetching and decoding
//! - Local object detection via YOLOv8 (ONNX Runtime)
//! - Remote vision completions via Gemini
//!
//! The detector's device session is guarded by an accelerator lease so one
//! request at a time holds the scarce device memory.

pub mod accelerator;
pub mod fetch;
pub mod gemini_client;
pub mod image_utils;
pub mod yolo;

pub use accelerator::{AcceleratorContext, AcceleratorLease, Device};
pub use fetch::{HttpImageFetcher, ImageFetcher, ImageRef};
pub use gemini_client::{GeminiClient, GeminiCompletion};
pub use image_utils::{decode_image_bytes, detect_format, ImageError, LoadedImage};
pub use yolo::{YoloModel, YoloParams};
