// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod config;
pub mod router;
pub mod version;
pub mod vision;

// Re-export main types
pub use config::RouterConfig;
pub use router::{
    AiRouter, DetectionSet, FallbackEnricher, PipelineResult, PrimaryDetector, Provider,
    QualityGate, ToolCandidate,
};
pub use vision::{Device, ImageRef};
