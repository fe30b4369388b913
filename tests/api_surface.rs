//! API Surface Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the /api/v1/* analysis endpoints and /health using
//! `tower::ServiceExt::oneshot()`. No binary spawn, no network port, no
//! broker — the ingest path is represented by a hand-set state handle.

use gridsense::api::{create_app, ApiState};
use gridsense::engine::AnalyticsEngine;
use gridsense::ingest::IngestorState;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

fn create_test_state(ingestor: IngestorState) -> ApiState {
    ApiState {
        engine: AnalyticsEngine::new(),
        ingestor: Arc::new(RwLock::new(ingestor)),
    }
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// A reading JSON object with the given consumption figures, timestamped
/// hourly so forecast calendar features vary.
fn reading(hour: u32, energy: f64, power: f64) -> serde_json::Value {
    serde_json::json!({
        "deviceId": "dev-1",
        "recordedAt": format!("2026-08-{:02}T{:02}:00:00Z", 1 + hour / 24, hour % 24),
        "energyUsed": energy,
        "powerConsumption": power,
        "temperature": 24.0 + (hour % 5) as f64,
        "voltage": 220.0,
        "current": 2.0,
        "powerFactor": 0.9
    })
}

fn history(n: u32) -> Vec<serde_json::Value> {
    (0..n)
        .map(|i| reading(i, 100.0 + (i % 7) as f64 * 3.0, 500.0))
        .collect()
}

async fn body_json(resp: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// /health is always 200 and reports the ingestor state verbatim.
#[tokio::test]
async fn health_reports_degraded_ingestor_without_failing() {
    let app = create_app(create_test_state(IngestorState::Degraded));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["ingestor"], "degraded");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn health_reports_subscribed_ingestor() {
    let app = create_app(create_test_state(IngestorState::Subscribed));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let json = body_json(resp).await;
    assert_eq!(json["ingestor"], "subscribed");
}

/// A realistic forecast request returns a fitted result: confidence inside
/// [0.1, 0.9] and a ±20 % prediction band.
#[tokio::test]
async fn forecast_returns_bounded_confidence_and_band() {
    let app = create_app(create_test_state(IngestorState::Degraded));

    let body = serde_json::json!({
        "historicalData": history(48),
        "daysAhead": 7
    });
    let resp = app
        .oneshot(post_json("/api/v1/forecast", body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let confidence = json["confidenceLevel"].as_f64().unwrap();
    assert!((0.1..=0.9).contains(&confidence), "confidence {confidence}");

    let predicted = json["predictedEnergyConsumption"].as_f64().unwrap();
    let min = json["minPrediction"].as_f64().unwrap();
    let max = json["maxPrediction"].as_f64().unwrap();
    assert!((min - predicted * 0.8).abs() < 1e-9);
    assert!((max - predicted * 1.2).abs() < 1e-9);
}

/// Single-sample anomaly detection takes the threshold path: a clean reading
/// yields no anomalies, a breached one yields exactly the matching rules.
#[tokio::test]
async fn single_reading_anomalies_use_threshold_rules() {
    let app = create_app(create_test_state(IngestorState::Degraded));

    let clean = serde_json::json!({ "sensorData": [reading(0, 100.0, 500.0)] });
    let resp = app
        .clone()
        .oneshot(post_json("/api/v1/anomalies", clean.to_string()))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await, serde_json::json!([]));

    // Energy above the 300 kWh rule limit, everything else nominal.
    let breached = serde_json::json!({ "sensorData": [{
        "deviceId": "dev-1",
        "recordedAt": "2026-08-01T10:00:00Z",
        "energyUsed": 350.0,
        "powerConsumption": 30.0,
        "temperature": 30.0,
        "voltage": 220.0,
        "current": 2.0,
        "powerFactor": 0.9
    }]});
    let resp = app
        .oneshot(post_json("/api/v1/anomalies", breached.to_string()))
        .await
        .unwrap();
    let json = body_json(resp).await;
    let anomalies = json.as_array().unwrap();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0]["anomalyType"], "HighConsumption");
    assert_eq!(anomalies[0]["severity"], 0.7);
    assert_eq!(anomalies[0]["actualValue"], 350.0);
}

/// Identical anomaly requests produce identical responses (seeded model).
#[tokio::test]
async fn batch_anomaly_detection_is_deterministic() {
    let body = serde_json::json!({ "sensorData": history(40) }).to_string();

    let first = body_json(
        create_app(create_test_state(IngestorState::Degraded))
            .oneshot(post_json("/api/v1/anomalies", body.clone()))
            .await
            .unwrap(),
    )
    .await;
    let second = body_json(
        create_app(create_test_state(IngestorState::Degraded))
            .oneshot(post_json("/api/v1/anomalies", body))
            .await
            .unwrap(),
    )
    .await;

    assert_eq!(first, second);
}

/// Optimization over a device drawing half its nameplate emits the
/// efficiency action with its fixed constants.
#[tokio::test]
async fn optimize_returns_plan_with_aggregates() {
    let app = create_app(create_test_state(IngestorState::Degraded));

    let body = serde_json::json!({
        "device": {
            "deviceId": "dev-1",
            "maxPowerConsumption": 1000.0,
            "installationDate": "2024-01-01T00:00:00Z"
        },
        "historicalData": history(24)
    });
    let resp = app
        .oneshot(post_json("/api/v1/optimize", body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    let actions = json["actions"].as_array().unwrap();
    assert!(!actions.is_empty());
    let total: f64 = actions
        .iter()
        .map(|a| a["potentialSavings"].as_f64().unwrap())
        .sum();
    assert_eq!(json["potentialSavings"].as_f64().unwrap(), total);
    let reduction = json["energyReduction"].as_f64().unwrap();
    assert!((json["carbonReduction"].as_f64().unwrap() - reduction * 0.4).abs() < 1e-9);
}

/// Efficiency scoring over a flat nominal batch lands in the Excellent band.
#[tokio::test]
async fn efficiency_scores_flat_nominal_batch_as_excellent() {
    let app = create_app(create_test_state(IngestorState::Degraded));

    let body = serde_json::json!({
        "device": {
            "deviceId": "dev-1",
            "maxPowerConsumption": 1000.0,
            "installationDate": "2024-01-01T00:00:00Z"
        },
        "historicalData": (0..24).map(|i| serde_json::json!({
            "deviceId": "dev-1",
            "recordedAt": format!("2026-08-01T{i:02}:00:00Z"),
            "energyUsed": 100.0,
            "powerConsumption": 900.0,
            "temperature": 24.0,
            "voltage": 220.0,
            "current": 2.0,
            "powerFactor": 0.95
        })).collect::<Vec<_>>()
    });
    let resp = app
        .oneshot(post_json("/api/v1/efficiency", body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["efficiencyLevel"], "Excellent");
    assert_eq!(json["metrics"].as_array().unwrap().len(), 4);
    let overall = json["overallScore"].as_f64().unwrap();
    assert!((json["benchmarkComparison"].as_f64().unwrap() - (overall - 85.0)).abs() < 1e-9);
}

/// Maintenance prediction for a device 400 days past maintenance maxes out.
#[tokio::test]
async fn maintenance_flags_overdue_device_as_critical() {
    let app = create_app(create_test_state(IngestorState::Degraded));

    let body = serde_json::json!({
        "device": {
            "deviceId": "dev-1",
            "maxPowerConsumption": 1000.0,
            "installationDate": "2020-01-01T00:00:00Z",
            "lastMaintenanceDate": "2025-07-19T00:00:00Z"
        },
        "historicalData": history(40)
    });
    let resp = app
        .oneshot(post_json("/api/v1/maintenance", body.to_string()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp).await;
    assert_eq!(json["urgencyScore"].as_f64().unwrap(), 1.0);
    assert_eq!(json["maintenanceType"], "Urgent Maintenance");
    assert_eq!(json["riskLevel"], "Critical");
}

/// Malformed JSON is rejected at the framework boundary, not a 500.
#[tokio::test]
async fn malformed_body_is_a_client_error() {
    let app = create_app(create_test_state(IngestorState::Degraded));

    let resp = app
        .oneshot(post_json("/api/v1/forecast", "{not json".to_string()))
        .await
        .unwrap();

    assert!(resp.status().is_client_error());
}
