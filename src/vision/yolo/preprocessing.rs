// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Image preprocessing for YOLOv8

use image::{imageops::FilterType, DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array4;

/// Square input size of the stock YOLOv8 export
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Ultralytics letterbox fill value
const PAD_VALUE: u8 = 114;

/// Geometry needed to map model-space boxes back onto the source photo
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub source_width: u32,
    pub source_height: u32,
}

impl Letterbox {
    /// Compute the letterbox for a source of `width` x `height`
    pub fn fit(width: u32, height: u32, target: u32) -> Self {
        if width == 0 || height == 0 {
            return Self {
                scale: 1.0,
                pad_x: 0.0,
                pad_y: 0.0,
                source_width: width,
                source_height: height,
            };
        }

        let scale = (target as f32 / width as f32).min(target as f32 / height as f32);
        let new_w = ((width as f32 * scale).round() as u32).max(1);
        let new_h = ((height as f32 * scale).round() as u32).max(1);

        Self {
            scale,
            pad_x: ((target - new_w.min(target)) / 2) as f32,
            pad_y: ((target - new_h.min(target)) / 2) as f32,
            source_width: width,
            source_height: height,
        }
    }

    /// Map a model-space point back to source pixels, clamped to the image
    pub fn unmap(&self, x: f32, y: f32) -> (f32, f32) {
        let sx = ((x - self.pad_x) / self.scale).clamp(0.0, self.source_width as f32);
        let sy = ((y - self.pad_y) / self.scale).clamp(0.0, self.source_height as f32);
        (sx, sy)
    }
}

/// Letterbox to `YOLO_INPUT_SIZE`, scale to [0, 1], and lay out as NCHW
pub fn preprocess_for_yolo(image: &DynamicImage) -> (Array4<f32>, Letterbox) {
    let (width, height) = image.dimensions();
    let letterbox = Letterbox::fit(width, height, YOLO_INPUT_SIZE);
    let padded = letterbox_image(image, &letterbox, YOLO_INPUT_SIZE);

    let size = YOLO_INPUT_SIZE as usize;
    let mut tensor = Array4::zeros((1, 3, size, size));

    for (x, y, pixel) in padded.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (tensor, letterbox)
}

fn letterbox_image(image: &DynamicImage, letterbox: &Letterbox, target: u32) -> RgbImage {
    let mut output = RgbImage::from_pixel(target, target, Rgb([PAD_VALUE; 3]));

    if letterbox.source_width == 0 || letterbox.source_height == 0 {
        return output;
    }

    let new_w = ((letterbox.source_width as f32 * letterbox.scale).round() as u32).clamp(1, target);
    let new_h = ((letterbox.source_height as f32 * letterbox.scale).round() as u32).clamp(1, target);
    let resized = image.resize_exact(new_w, new_h, FilterType::Triangle).to_rgb8();

    let offset_x = letterbox.pad_x as u32;
    let offset_y = letterbox.pad_y as u32;
    for (x, y, pixel) in resized.enumerate_pixels() {
        output.put_pixel(x + offset_x, y + offset_y, *pixel);
    }

    output
}
