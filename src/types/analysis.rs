//! Analysis result types produced by the analytics engine.
//!
//! Results are values: constructed once by an engine operation, then carried
//! unchanged to the API response or wrapped in a [`ResultEnvelope`] for the
//! dispatch sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Forecast
// ============================================================================

/// One explanatory factor attached to a forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastFactor {
    pub factor_name: String,
    pub impact: f64,
    pub description: String,
}

/// Short-term energy consumption forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastResult {
    pub prediction_date: DateTime<Utc>,
    pub predicted_energy_consumption: f64,
    /// Always within [0.1, 0.9] for a fitted model; 0 for the fallback result.
    pub confidence_level: f64,
    pub min_prediction: f64,
    pub max_prediction: f64,
    pub factors: Vec<ForecastFactor>,
}

// ============================================================================
// Anomalies
// ============================================================================

/// Classified anomaly categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnomalyType {
    /// Power draw far above the energy the device reports consuming.
    HighConsumption,
    /// Single-sample temperature rule breach.
    TemperatureAnomaly,
    /// Batch-path temperature outlier above 50 °C.
    TemperatureSpike,
    /// Voltage outside the 200–250 V operating band.
    VoltageAnomaly,
    /// Power factor below 0.7.
    LowPowerFactor,
    /// Isolated by the outlier model but matching no specific pattern.
    GeneralAnomaly,
}

impl AnomalyType {
    /// Operator-facing recommendation for this anomaly category.
    pub fn recommendation(self) -> &'static str {
        match self {
            Self::HighConsumption => "Check the device for overdue maintenance",
            Self::TemperatureAnomaly | Self::TemperatureSpike => "Inspect the cooling system",
            Self::VoltageAnomaly => "Inspect the electrical supply",
            Self::LowPowerFactor => "Power factor correction required",
            Self::GeneralAnomaly => "Run a general system check",
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::HighConsumption => "HighConsumption",
            Self::TemperatureAnomaly => "TemperatureAnomaly",
            Self::TemperatureSpike => "TemperatureSpike",
            Self::VoltageAnomaly => "VoltageAnomaly",
            Self::LowPowerFactor => "LowPowerFactor",
            Self::GeneralAnomaly => "GeneralAnomaly",
        };
        write!(f, "{name}")
    }
}

/// A single detected anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub detected_at: DateTime<Utc>,
    pub anomaly_type: AnomalyType,
    pub description: String,
    /// Severity in [0, 1]: fixed per rule on the threshold path, |decision
    /// score| on the outlier-isolation path.
    pub severity: f64,
    pub normal_value: f64,
    pub actual_value: f64,
    pub recommendation: String,
}

// ============================================================================
// Optimization
// ============================================================================

/// Action priority tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// A single recommended optimization action with fixed cost/savings constants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationAction {
    pub action_name: String,
    pub description: String,
    pub category: String,
    /// Monthly savings estimate (currency units).
    pub potential_savings: f64,
    /// Monthly energy reduction estimate (kWh).
    pub energy_reduction: f64,
    pub implementation_cost: f64,
    /// Payback period (months).
    pub payback_period: u32,
    pub priority: Priority,
    pub steps: Vec<String>,
}

/// Aggregate optimization plan over all emitted actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationPlan {
    pub actions: Vec<OptimizationAction>,
    pub potential_savings: f64,
    pub energy_reduction: f64,
    /// Energy reduction × 0.4 (kg CO₂ per kWh grid factor).
    pub carbon_reduction: f64,
    pub implementation_cost: f64,
    /// Worst payback period across actions (months); 0 when no actions.
    pub payback_period: u32,
    /// Annualized savings over cost, in percent; 0 when cost is 0.
    pub roi: f64,
}

// ============================================================================
// Maintenance
// ============================================================================

/// Maintenance risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Critical,
    High,
    Medium,
    Low,
}

/// Predictive maintenance assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenancePrediction {
    pub predicted_maintenance_date: DateTime<Utc>,
    /// Urgency in [0, 1], clamped.
    pub urgency_score: f64,
    pub maintenance_type: String,
    pub recommended_actions: Vec<String>,
    pub estimated_cost: f64,
    pub risk_level: RiskLevel,
}

// ============================================================================
// Efficiency
// ============================================================================

/// Efficiency level bands over the overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EfficiencyLevel {
    Excellent,
    Good,
    Average,
    #[serde(rename = "Below Average")]
    BelowAverage,
    Poor,
}

impl EfficiencyLevel {
    /// Map an overall score onto its fixed band.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 80.0 {
            Self::Good
        } else if score >= 70.0 {
            Self::Average
        } else if score >= 60.0 {
            Self::BelowAverage
        } else {
            Self::Poor
        }
    }
}

/// One scored efficiency metric with its benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyMetric {
    pub metric_name: String,
    pub value: f64,
    pub benchmark: f64,
    pub score: f64,
    pub unit: String,
}

/// A sub-score that fell below its threshold, with a concrete target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImprovementArea {
    pub area: String,
    pub current_value: f64,
    pub target: f64,
    pub priority: Priority,
}

/// Weighted efficiency score over four sub-metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EfficiencyScore {
    /// Weighted sum of the four clamped sub-scores; lands in [0, 100].
    pub overall_score: f64,
    pub efficiency_level: EfficiencyLevel,
    pub metrics: Vec<EfficiencyMetric>,
    pub improvement_areas: Vec<ImprovementArea>,
    /// Overall score minus the 85-point fleet benchmark.
    pub benchmark_comparison: f64,
}

// ============================================================================
// Result union + transport envelope
// ============================================================================

/// Tagged union over the five analysis outputs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResult {
    Forecast(ForecastResult),
    Anomalies(Vec<Anomaly>),
    Optimization(OptimizationPlan),
    Maintenance(MaintenancePrediction),
    Efficiency(EfficiencyScore),
}

impl AnalysisResult {
    /// The wire tag corresponding to this result variant.
    pub fn result_type(&self) -> ResultType {
        match self {
            Self::Forecast(_) => ResultType::Forecast,
            Self::Anomalies(_) => ResultType::AnomalyDetection,
            Self::Optimization(_) => ResultType::Optimization,
            Self::Maintenance(_) => ResultType::Maintenance,
            Self::Efficiency(_) => ResultType::EfficiencyScore,
        }
    }
}

/// Wire tag identifying the kind of result carried by an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultType {
    AnomalyDetection,
    EfficiencyScore,
    Forecast,
    Optimization,
    Maintenance,
    Custom,
}

impl std::fmt::Display for ResultType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            Self::AnomalyDetection => "anomaly_detection",
            Self::EfficiencyScore => "efficiency_score",
            Self::Forecast => "forecast",
            Self::Optimization => "optimization",
            Self::Maintenance => "maintenance",
            Self::Custom => "custom",
        };
        write!(f, "{tag}")
    }
}

/// Transport wrapper delivered to both dispatch sinks.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultEnvelope {
    pub device_id: String,
    pub result_type: ResultType,
    pub result_data: AnalysisResult,
    pub processed_at: DateTime<Utc>,
    pub service_version: String,
}

impl ResultEnvelope {
    /// Wrap a result for transport, stamping the current time and version.
    pub fn new(device_id: impl Into<String>, result: AnalysisResult) -> Self {
        Self {
            device_id: device_id.into(),
            result_type: result.result_type(),
            result_data: result,
            processed_at: Utc::now(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_type_tags_match_wire_format() {
        assert_eq!(
            serde_json::to_string(&ResultType::AnomalyDetection).unwrap(),
            "\"anomaly_detection\""
        );
        assert_eq!(
            serde_json::to_string(&ResultType::EfficiencyScore).unwrap(),
            "\"efficiency_score\""
        );
        assert_eq!(ResultType::Forecast.to_string(), "forecast");
    }

    #[test]
    fn efficiency_level_bands() {
        assert_eq!(EfficiencyLevel::from_score(95.0), EfficiencyLevel::Excellent);
        assert_eq!(EfficiencyLevel::from_score(90.0), EfficiencyLevel::Excellent);
        assert_eq!(EfficiencyLevel::from_score(85.0), EfficiencyLevel::Good);
        assert_eq!(EfficiencyLevel::from_score(70.0), EfficiencyLevel::Average);
        assert_eq!(EfficiencyLevel::from_score(65.0), EfficiencyLevel::BelowAverage);
        assert_eq!(EfficiencyLevel::from_score(10.0), EfficiencyLevel::Poor);
    }

    #[test]
    fn envelope_carries_camel_case_fields() {
        let envelope = ResultEnvelope::new(
            "dev-7",
            AnalysisResult::Anomalies(Vec::new()),
        );
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["deviceId"], "dev-7");
        assert_eq!(json["resultType"], "anomaly_detection");
        assert!(json["processedAt"].is_string());
        assert_eq!(json["serviceVersion"], env!("CARGO_PKG_VERSION"));
    }
}
