//! API route definitions
//!
//! Synchronous analysis endpoints:
//! - POST /api/v1/forecast - energy consumption forecast
//! - POST /api/v1/anomalies - anomaly detection over a batch
//! - POST /api/v1/optimize - optimization plan for a device
//! - POST /api/v1/maintenance - maintenance prediction for a device
//! - POST /api/v1/efficiency - full efficiency score for a device
//! - GET /health - service status incl. ingestor state (root level)

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers::{self, ApiState};

/// Create all analysis routes, nested under `/api/v1` by the app builder.
pub fn api_routes(state: ApiState) -> Router {
    Router::new()
        .route("/forecast", post(handlers::forecast))
        .route("/anomalies", post(handlers::anomalies))
        .route("/optimize", post(handlers::optimize))
        .route("/maintenance", post(handlers::maintenance))
        .route("/efficiency", post(handlers::efficiency))
        .with_state(state)
}

/// Root-level health endpoint.
pub fn health_routes(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AnalyticsEngine;
    use crate::ingest::IngestorState;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::ServiceExt;

    fn create_test_state() -> ApiState {
        ApiState {
            engine: AnalyticsEngine::new(),
            ingestor: Arc::new(RwLock::new(IngestorState::Degraded)),
        }
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_reports_ingestor_state() {
        let app = health_routes(create_test_state());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["ingestor"], "degraded");
    }

    #[tokio::test]
    async fn anomalies_on_empty_batch_returns_empty_list() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(post_json("/anomalies", r#"{"sensorData":[]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!([]));
    }

    #[tokio::test]
    async fn forecast_on_empty_history_returns_zero_confidence_fallback() {
        let app = api_routes(create_test_state());

        let response = app
            .oneshot(post_json("/forecast", r#"{"historicalData":[]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["confidenceLevel"], 0.0);
        assert_eq!(json["predictedEnergyConsumption"], 0.0);
    }

    #[tokio::test]
    async fn efficiency_requires_a_device_profile() {
        let app = api_routes(create_test_state());

        // Missing required `device` field rejects at decode time.
        let response = app
            .oneshot(post_json("/efficiency", r#"{"historicalData":[]}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn maintenance_returns_prediction_for_valid_request() {
        let app = api_routes(create_test_state());

        let body = r#"{
            "device": {
                "deviceId": "dev-1",
                "maxPowerConsumption": 1000.0,
                "installationDate": "2024-01-01T00:00:00Z"
            },
            "historicalData": [
                {"deviceId": "dev-1", "recordedAt": "2026-08-01T10:00:00Z",
                 "energyUsed": 100.0, "powerConsumption": 500.0,
                 "temperature": 24.0, "voltage": 220.0,
                 "current": 2.0, "powerFactor": 0.9}
            ]
        }"#;
        let response = app
            .oneshot(post_json("/maintenance", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["urgencyScore"].as_f64().is_some());
        assert!(json["predictedMaintenanceDate"].is_string());
    }
}
