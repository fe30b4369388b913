//! Stateless analytics engine over telemetry batches.
//!
//! Five operations: forecasting, anomaly detection, optimization planning,
//! maintenance prediction, and efficiency scoring — plus a reduced streaming
//! score for the per-message ingest path. Every operation is pure over the
//! batch it is handed: estimators are fit fresh per call, no model state
//! survives between invocations, and concurrent calls with independent inputs
//! are safe by construction.
//!
//! Operations never fail. Each decides at its top between the computed value
//! and its documented fallback; the fallback paths are part of the contract,
//! not error handling.

mod anomaly;
mod efficiency;
mod forecast;
mod isolation;
mod maintenance;
mod optimize;
pub mod stats;

pub use isolation::{detect_outliers, IsolationForest, Outlier};

use crate::types::{
    Anomaly, DeviceProfile, EfficiencyScore, ForecastResult, MaintenancePrediction,
    OptimizationPlan, TelemetrySample,
};

/// Internal failure modes deciding when an operation takes its fallback path.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("telemetry batch is empty")]
    EmptyBatch,
    #[error("forecast horizon must be at least one day")]
    ZeroHorizon,
    #[error("device profile has no usable max power rating")]
    InvalidProfile,
    #[error("batch mean consumption is zero; confidence is undefined")]
    ZeroMeanConsumption,
    #[error(transparent)]
    Stats(#[from] stats::StatsError),
}

/// The analytics engine. Carries no state — cheap to copy and share between
/// the ingest task and the request-serving path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalyticsEngine;

impl AnalyticsEngine {
    pub fn new() -> Self {
        Self
    }

    /// Forecast energy consumption `days_ahead` days out.
    /// Falls back to a zero-confidence result on degenerate input.
    pub fn forecast(&self, samples: &[TelemetrySample], days_ahead: u32) -> ForecastResult {
        forecast::forecast(samples, days_ahead)
    }

    /// Detect anomalies: threshold rules for batches smaller than two,
    /// isolation forest otherwise. Falls back to an empty list.
    pub fn detect_anomalies(&self, samples: &[TelemetrySample]) -> Vec<Anomaly> {
        anomaly::detect(samples)
    }

    /// Build an optimization plan. Falls back to an all-zero plan.
    pub fn optimize_energy(
        &self,
        profile: &DeviceProfile,
        samples: &[TelemetrySample],
    ) -> OptimizationPlan {
        optimize::optimize(profile, samples)
    }

    /// Predict the next maintenance window. Falls back to a fixed
    /// medium-risk, 30-day prediction.
    pub fn predict_maintenance(
        &self,
        profile: &DeviceProfile,
        samples: &[TelemetrySample],
    ) -> MaintenancePrediction {
        maintenance::predict(profile, samples)
    }

    /// Compute the full four-metric efficiency score. Falls back to a
    /// zero/Poor score with one "insufficient data" note.
    pub fn efficiency_score(
        &self,
        profile: &DeviceProfile,
        samples: &[TelemetrySample],
    ) -> EfficiencyScore {
        efficiency::score(profile, samples)
    }

    /// Reduced three-metric score for high-frequency single-sample scoring
    /// on the ingest path.
    pub fn streaming_efficiency(&self, samples: &[TelemetrySample]) -> EfficiencyScore {
        efficiency::streaming_score(samples)
    }
}
