//! Shared data structures for the energy telemetry intelligence pipeline
//!
//! This module defines the core types flowing through the service:
//! - Inbound: SensorReading (broker/API wire schema), TelemetrySample, DeviceProfile
//! - Analysis: ForecastResult, Anomaly, OptimizationPlan, MaintenancePrediction,
//!   EfficiencyScore and the AnalysisResult union over them
//! - Outbound: ResultEnvelope (transport wrapper for both dispatch sinks)

mod analysis;
mod telemetry;
pub mod thresholds;

pub use analysis::*;
pub use telemetry::*;
