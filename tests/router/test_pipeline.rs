// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Cascade behavior of AiRouter::analyze against recorded adapter doubles

use super::mocks::*;
use gonggu_ai_router::router::{
    AiRouter, DetectionError, EnrichError, Provider, QualityGate, ToolCandidate,
};
use std::sync::Arc;
use std::time::Duration;

fn router(detector: Arc<MockDetector>, enricher: Arc<MockEnricher>) -> AiRouter {
    AiRouter::new(
        detector,
        enricher,
        QualityGate::default(),
        Duration::from_secs(2),
    )
}

#[tokio::test]
async fn test_confident_detection_skips_fallback() {
    // name 10 chars, category, description > 5, confidence 0.9 -> 0.80
    let detector = Arc::new(MockDetector::returning(vec![detection("toothbrush", 0.9)]));
    let enricher = Arc::new(MockEnricher::returning_drill());

    let result = router(detector.clone(), enricher.clone())
        .analyze(&photo())
        .await;

    assert!(result.success);
    assert_eq!(result.provider, "primary");
    assert_eq!(result.quality_score, Some(0.8));
    let candidate = result.candidate.unwrap();
    assert_eq!(candidate.name, "toothbrush");
    assert_eq!(candidate.provider, Provider::Primary);
    assert!(candidate.brand.is_none());
    assert_eq!(detector.calls(), 1);
    assert_eq!(enricher.calls(), 0);
}

#[tokio::test]
async fn test_weak_detection_escalates_with_label_hint() {
    let detector = Arc::new(MockDetector::returning(vec![detection("scissors", 0.5)]));
    let enricher = Arc::new(MockEnricher::returning_drill());

    let result = router(detector, enricher.clone()).analyze(&photo()).await;

    assert!(result.success);
    assert_eq!(result.provider, "fallback");
    assert!(result.quality_score.is_none());
    assert_eq!(result.candidate.unwrap().name, "Cordless Drill");
    assert_eq!(enricher.hints(), vec![Some("scissors".to_string())]);
}

#[tokio::test]
async fn test_hint_is_highest_confidence_label() {
    let detector = Arc::new(MockDetector::returning(vec![
        detection("cup", 0.3),
        detection("knife", 0.55),
        detection("bottle", 0.41),
    ]));
    let enricher = Arc::new(MockEnricher::returning_drill());

    router(detector, enricher.clone()).analyze(&photo()).await;

    assert_eq!(enricher.hints(), vec![Some("knife".to_string())]);
}

#[tokio::test]
async fn test_empty_detection_escalates_without_hint() {
    let detector = Arc::new(MockDetector::returning(vec![]));
    let enricher = Arc::new(MockEnricher::returning_drill());

    let result = router(detector, enricher.clone()).analyze(&photo()).await;

    assert!(result.success);
    assert_eq!(result.provider, "fallback");
    assert!(result.quality_score.is_none());
    assert_eq!(enricher.hints(), vec![None]);
}

#[tokio::test]
async fn test_primary_failure_never_calls_fallback() {
    let detector = Arc::new(MockDetector::new(DetectorBehavior::Fails(
        DetectionError::Fetch("404 Not Found".to_string()),
    )));
    let enricher = Arc::new(MockEnricher::returning_drill());

    let result = router(detector, enricher.clone()).analyze(&photo()).await;

    assert!(!result.success);
    assert_eq!(result.provider, "primary");
    assert!(result.candidate.is_none());
    assert!(result.error.unwrap().contains("404"));
    assert_eq!(enricher.calls(), 0);
}

#[tokio::test]
async fn test_prose_only_fallback_is_malformed() {
    let detector = Arc::new(MockDetector::returning(vec![]));
    let enricher = Arc::new(MockEnricher::new(EnricherBehavior::Responds(
        "It looks like a cordless drill, probably from Bosch.".to_string(),
    )));

    let result = router(detector, enricher).analyze(&photo()).await;

    assert!(!result.success);
    assert_eq!(result.provider, "fallback");
    assert_eq!(result.error.as_deref(), Some("malformed_response"));
    assert!(result.candidate.is_none());
}

#[tokio::test]
async fn test_fenced_and_bare_payloads_route_identically() {
    let payload = r#"{"name": "Circular Saw", "brand": "DeWalt", "category": "power tool", "description": "7-1/4 inch saw", "rental_price": 18000}"#;
    let fenced = format!("Sure! Here is the result:\n```json\n{}\n```", payload);

    let mut candidates = Vec::new();
    for text in [payload.to_string(), fenced] {
        let detector = Arc::new(MockDetector::returning(vec![]));
        let enricher = Arc::new(MockEnricher::new(EnricherBehavior::Responds(text)));
        let result = router(detector, enricher).analyze(&photo()).await;
        assert!(result.success);
        candidates.push(result.candidate.unwrap());
    }

    assert_eq!(candidates[0], candidates[1]);
    assert_eq!(candidates[0].rental_price, 18000);
}

#[tokio::test]
async fn test_fallback_error_reason_surfaces() {
    let detector = Arc::new(MockDetector::returning(vec![detection("cup", 0.2)]));
    let enricher = Arc::new(MockEnricher::new(EnricherBehavior::Fails(
        EnrichError::Remote("Gemini API error: 429".to_string()),
    )));

    let result = router(detector, enricher).analyze(&photo()).await;

    assert!(!result.success);
    assert_eq!(result.provider, "fallback");
    assert!(result.error.unwrap().contains("429"));
}

#[tokio::test]
async fn test_fallback_candidate_is_normalized() {
    let mut odd = ToolCandidate::new("Pipe Wrench", Provider::Primary);
    odd.confidence = 7.0;
    let detector = Arc::new(MockDetector::returning(vec![]));
    let enricher = Arc::new(MockEnricher::new(EnricherBehavior::Returns(odd)));

    let result = router(detector, enricher).analyze(&photo()).await;

    let candidate = result.candidate.unwrap();
    assert_eq!(result.provider, "fallback");
    assert_eq!(candidate.provider, Provider::Fallback);
    assert_eq!(candidate.confidence, 1.0);
    assert_eq!(candidate.category.as_deref(), Some("power tool"));
}

#[tokio::test]
async fn test_hanging_detector_times_out() {
    let detector = Arc::new(MockDetector::new(DetectorBehavior::Hangs));
    let enricher = Arc::new(MockEnricher::returning_drill());
    let router = AiRouter::new(
        detector,
        enricher.clone(),
        QualityGate::default(),
        Duration::from_millis(50),
    );

    let result = router.analyze(&photo()).await;

    assert!(!result.success);
    assert_eq!(result.provider, "primary");
    assert!(result.error.unwrap().contains("timed out"));
    assert_eq!(enricher.calls(), 0);
}

#[tokio::test]
async fn test_hanging_enricher_times_out() {
    let detector = Arc::new(MockDetector::returning(vec![]));
    let enricher = Arc::new(MockEnricher::new(EnricherBehavior::Hangs));
    let router = AiRouter::new(
        detector,
        enricher,
        QualityGate::default(),
        Duration::from_millis(50),
    );

    let result = router.analyze(&photo()).await;

    assert!(!result.success);
    assert_eq!(result.provider, "fallback");
    assert_eq!(result.error.as_deref(), Some("enricher timed out after 50ms"));
}

#[tokio::test]
async fn test_detector_panic_becomes_primary_failure() {
    let detector = Arc::new(MockDetector::new(DetectorBehavior::Panics));
    let enricher = Arc::new(MockEnricher::returning_drill());

    let result = router(detector, enricher.clone()).analyze(&photo()).await;

    assert!(!result.success);
    assert_eq!(result.provider, "primary");
    assert!(result.error.unwrap().contains("onnx session poisoned"));
    assert_eq!(enricher.calls(), 0);
}

#[tokio::test]
async fn test_custom_threshold_changes_routing() {
    // 0.65 passes a 0.6 gate but not the default 0.7 gate
    let detector = Arc::new(MockDetector::returning(vec![detection("scissors", 0.5)]));
    let enricher = Arc::new(MockEnricher::returning_drill());
    let lenient = AiRouter::new(
        detector,
        enricher.clone(),
        QualityGate::new(0.6),
        Duration::from_secs(2),
    );

    let result = lenient.analyze(&photo()).await;

    assert_eq!(result.provider, "primary");
    assert_eq!(result.quality_score, Some(0.65));
    assert_eq!(enricher.calls(), 0);
}

#[tokio::test]
async fn test_concurrent_requests_share_router() {
    let detector = Arc::new(MockDetector::returning(vec![detection("toothbrush", 0.95)]));
    let enricher = Arc::new(MockEnricher::returning_drill());
    let router = Arc::new(router(detector.clone(), enricher));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let router = router.clone();
            tokio::spawn(async move { router.analyze(&photo()).await })
        })
        .collect();

    for handle in handles {
        assert!(handle.await.unwrap().success);
    }
    assert_eq!(detector.calls(), 8);
}

#[tokio::test]
async fn test_router_ready_with_available_adapters() {
    let router = router(
        Arc::new(MockDetector::returning(vec![])),
        Arc::new(MockEnricher::returning_drill()),
    );
    assert!(router.is_ready());
    assert!(router.device().is_none());
    assert_eq!(router.quality_gate().threshold(), 0.7);
}
