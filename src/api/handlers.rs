//! API route handlers
//!
//! Request handling for the synchronous analysis surface. Every analysis
//! handler decodes a historical-data array (plus operation parameters), runs
//! the shared [`AnalyticsEngine`], and returns the result inline. The engine's
//! fallback contract means these handlers never fail on degenerate input —
//! a structurally valid body always comes back.

use axum::{extract::State, Json};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::engine::AnalyticsEngine;
use crate::ingest::IngestorStatus;
use crate::types::{
    Anomaly, DeviceProfile, EfficiencyScore, ForecastResult, MaintenancePrediction,
    OptimizationPlan, SensorReading, TelemetrySample,
};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    /// The stateless analytics engine, shared with the ingest task.
    pub engine: AnalyticsEngine,
    /// Live view of the broker consumer's lifecycle state.
    pub ingestor: IngestorStatus,
}

// ============================================================================
// Request bodies
// ============================================================================

fn default_days_ahead() -> u32 {
    7
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastRequest {
    #[serde(default)]
    pub historical_data: Vec<SensorReading>,
    #[serde(default = "default_days_ahead")]
    pub days_ahead: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyRequest {
    #[serde(default)]
    pub sensor_data: Vec<SensorReading>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfiledRequest {
    pub device: DeviceProfile,
    #[serde(default)]
    pub historical_data: Vec<SensorReading>,
}

/// Decode wire readings into samples, receive time standing in for any
/// missing capture time.
fn into_samples(readings: Vec<SensorReading>) -> Vec<TelemetrySample> {
    let now = Utc::now();
    readings.into_iter().map(|r| r.into_sample(now)).collect()
}

// ============================================================================
// Analysis handlers
// ============================================================================

pub async fn forecast(
    State(state): State<ApiState>,
    Json(req): Json<ForecastRequest>,
) -> Json<ForecastResult> {
    let samples = into_samples(req.historical_data);
    Json(state.engine.forecast(&samples, req.days_ahead))
}

pub async fn anomalies(
    State(state): State<ApiState>,
    Json(req): Json<AnomalyRequest>,
) -> Json<Vec<Anomaly>> {
    let samples = into_samples(req.sensor_data);
    Json(state.engine.detect_anomalies(&samples))
}

pub async fn optimize(
    State(state): State<ApiState>,
    Json(req): Json<ProfiledRequest>,
) -> Json<OptimizationPlan> {
    let samples = into_samples(req.historical_data);
    Json(state.engine.optimize_energy(&req.device, &samples))
}

pub async fn maintenance(
    State(state): State<ApiState>,
    Json(req): Json<ProfiledRequest>,
) -> Json<MaintenancePrediction> {
    let samples = into_samples(req.historical_data);
    Json(state.engine.predict_maintenance(&req.device, &samples))
}

pub async fn efficiency(
    State(state): State<ApiState>,
    Json(req): Json<ProfiledRequest>,
) -> Json<EfficiencyScore> {
    let samples = into_samples(req.historical_data);
    Json(state.engine.efficiency_score(&req.device, &samples))
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Broker consumer state: connecting, subscribed, or degraded.
    pub ingestor: &'static str,
}

/// Service health. Always 200 — a degraded ingestor is reported, not fatal,
/// since the synchronous surface keeps serving without the broker.
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    let ingestor = state.ingestor.read().await.as_str();
    Json(HealthResponse {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        ingestor,
    })
}
