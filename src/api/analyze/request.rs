// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Analyze request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::vision::fetch::validate_image_url;

/// Request to analyze one tool photo
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    /// Publicly reachable http(s) URL of the photo
    #[serde(default, alias = "image_url")]
    pub image_url: String,
}

impl AnalyzeRequest {
    /// Validate the analyze request
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.image_url.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: "imageUrl".to_string(),
                message: "imageUrl is required".to_string(),
            });
        }

        validate_image_url(self.image_url.trim()).map_err(|e| ApiError::ValidationError {
            field: "imageUrl".to_string(),
            message: e.to_string(),
        })?;

        Ok(())
    }
}
