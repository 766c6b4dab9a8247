// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /analyze request validation, readiness, and response shape

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
};
use gonggu_ai_router::{
    api::{create_app, AppState},
    router::{
        AiRouter, Detection, DetectionError, DetectionSet, EnrichError, FallbackEnricher,
        PrimaryDetector, Provider, QualityGate, ToolCandidate,
    },
    vision::{Device, ImageRef},
};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot`

struct FixedDetector(Vec<Detection>);

#[async_trait]
impl PrimaryDetector for FixedDetector {
    async fn detect(&self, _image: &ImageRef) -> Result<DetectionSet, DetectionError> {
        Ok(DetectionSet::new(self.0.clone()))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

struct FixedEnricher;

#[async_trait]
impl FallbackEnricher for FixedEnricher {
    async fn enrich(
        &self,
        _image: &ImageRef,
        _hint: Option<&str>,
    ) -> Result<ToolCandidate, EnrichError> {
        Ok(ToolCandidate::new("Orbital Sander", Provider::Fallback)
            .with_brand("Ryobi")
            .with_category("power tool")
            .with_description("Random orbit sander, 125mm pad")
            .with_confidence(0.8))
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

/// Helper: AppState whose router always escalates to the fixed enricher
fn setup_ready_state() -> AppState {
    let router = AiRouter::new(
        Arc::new(FixedDetector(vec![])),
        Arc::new(FixedEnricher),
        QualityGate::default(),
        Duration::from_secs(2),
    );
    AppState::with_router(Arc::new(router), Device::Cpu)
}

fn analyze_request(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/analyze")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_analyze_returns_fallback_candidate() {
    let app = create_app(setup_ready_state());

    let response = app
        .oneshot(analyze_request(
            r#"{"imageUrl": "https://cdn.example.com/tools/sander.jpg"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["provider"], "fallback");
    assert_eq!(body["candidates"][0]["name"], "Orbital Sander");
    assert_eq!(body["candidates"][0]["brand"], "Ryobi");
    assert_eq!(body["candidates"][0]["rentalPrice"], 15000);
    assert!(body["processingTimeMs"].is_u64());
}

#[tokio::test]
async fn test_analyze_before_router_ready_is_503() {
    let app = create_app(AppState::new(Device::Cuda));

    let response = app
        .oneshot(analyze_request(
            r#"{"imageUrl": "https://cdn.example.com/tools/sander.jpg"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = json_body(response).await;
    assert_eq!(body["error_type"], "service_unavailable");
}

#[tokio::test]
async fn test_analyze_empty_url_is_400() {
    let app = create_app(setup_ready_state());

    let response = app
        .oneshot(analyze_request(r#"{"imageUrl": ""}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["error_type"], "validation_error");
    assert_eq!(body["details"]["field"], "imageUrl");
}

#[tokio::test]
async fn test_analyze_non_http_url_is_400() {
    let app = create_app(setup_ready_state());

    let response = app
        .oneshot(analyze_request(r#"{"imageUrl": "ftp://files.example.com/a.jpg"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analyze_rejects_get() {
    let app = create_app(setup_ready_state());

    let request = Request::builder()
        .method(Method::GET)
        .uri("/analyze")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
