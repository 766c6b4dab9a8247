// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze endpoint handler

use axum::{extract::State, Json};
use tracing::info;

use super::request::AnalyzeRequest;
use super::response::AnalyzeResponse;
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::ImageRef;

/// POST /analyze - Recognize a rental tool from a photo URL
///
/// Pipeline failures are reported in the body with `success: false`; only
/// request validation and readiness produce error status codes.
pub async fn analyze_handler(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    request.validate()?;

    let router = state
        .router
        .read()
        .await
        .clone()
        .ok_or_else(|| ApiError::ServiceUnavailable("AI router not initialized".to_string()))?;

    info!("📸 Analyze request: {}", request.image_url);

    let image = ImageRef::url(request.image_url.trim());
    let result = router.analyze(&image).await;

    Ok(Json(AnalyzeResponse::from(result)))
}
