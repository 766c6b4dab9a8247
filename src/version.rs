// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Version information for the Gonggu AI router

/// Full version string with feature description
pub const VERSION: &str = "v1.0.0-yolo-gemini-router-2025-10-19";

/// Semantic version number
pub const VERSION_NUMBER: &str = "1.0.0";

/// Build date
pub const BUILD_DATE: &str = "2025-10-19";

/// Supported features in this version
pub const FEATURES: &[&str] = &[
    "yolo-primary-detection",
    "gemini-fallback-enrichment",
    "quality-gate",
    "detector-hints",
    "cuda-cpu-fallback",
    "structured-json-extraction",
];

/// Get formatted version string for logging
pub fn get_version_string() -> String {
    format!("Gonggu AI Router {} ({})", VERSION_NUMBER, BUILD_DATE)
}

/// Get full version info for API responses
pub fn get_version_info() -> serde_json::Value {
    serde_json::json!({
        "version": VERSION_NUMBER,
        "build": VERSION,
        "date": BUILD_DATE,
        "features": FEATURES,
    })
}
