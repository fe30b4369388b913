//! GridSense: Smart Energy Telemetry Intelligence
//!
//! Streaming analytics for fleet energy telemetry.
//!
//! ## Architecture
//!
//! - **Engine**: stateless analytics (forecasting, anomaly detection,
//!   optimization, maintenance prediction, efficiency scoring)
//! - **Ingest**: AMQP consumer running the per-message analysis pair
//! - **Dispatch**: dual-sink result delivery (HTTP callback + results queue)
//! - **API**: synchronous analysis endpoints over the same engine

pub mod api;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod ingest;
pub mod types;

// Re-export the handles the binary and integration tests wire together
pub use api::{create_app, ApiState};
pub use config::ServiceConfig;
pub use dispatch::ResultDispatcher;
pub use engine::AnalyticsEngine;
pub use ingest::{IngestorState, TelemetryIngestor};

// Re-export commonly used types
pub use types::{
    AnalysisResult, Anomaly, AnomalyType, DeviceProfile, EfficiencyScore, ForecastResult,
    MaintenancePrediction, OptimizationPlan, ResultEnvelope, SensorReading, TelemetrySample,
};
