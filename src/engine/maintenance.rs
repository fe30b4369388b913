//! Predictive maintenance scoring.
//!
//! Urgency is driven by time since the last maintenance (annual cycle
//! assumption), bumped by unstable or declining power draw over the most
//! recent window, then mapped onto four fixed tiers.

use chrono::{Duration, Utc};
use tracing::debug;

use crate::engine::stats;
use crate::engine::EngineError;
use crate::types::thresholds::{
    DECLINING_TREND, MAINTENANCE_CYCLE_DAYS, RECENT_WINDOW, VARIANCE_BUMP_RATIO,
};
use crate::types::{DeviceProfile, MaintenancePrediction, RiskLevel, TelemetrySample};

/// Predict the next maintenance. On failure returns the documented fixed
/// medium-risk, 30-day fallback.
pub fn predict(profile: &DeviceProfile, samples: &[TelemetrySample]) -> MaintenancePrediction {
    match try_predict(profile, samples) {
        Ok(prediction) => prediction,
        Err(e) => {
            debug!(error = %e, device = %profile.device_id, "maintenance prediction degraded to fallback");
            fallback()
        }
    }
}

fn fallback() -> MaintenancePrediction {
    MaintenancePrediction {
        predicted_maintenance_date: Utc::now() + Duration::days(30),
        urgency_score: 0.5,
        maintenance_type: "Routine Maintenance".to_string(),
        recommended_actions: vec!["General inspection".to_string()],
        estimated_cost: 500.0,
        risk_level: RiskLevel::Medium,
    }
}

fn try_predict(
    profile: &DeviceProfile,
    samples: &[TelemetrySample],
) -> Result<MaintenancePrediction, EngineError> {
    if samples.is_empty() {
        return Err(EngineError::EmptyBatch);
    }

    let now = Utc::now();
    let device_age_days = (now - profile.installation_date).num_days();
    let days_since_maintenance = profile
        .last_maintenance_date
        .map_or(device_age_days, |last| (now - last).num_days());

    let power: Vec<f64> = samples.iter().map(|s| s.power_consumption).collect();
    let recent = &power[power.len().saturating_sub(RECENT_WINDOW)..];

    let baseline_variance = stats::variance(&power);
    let recent_variance = stats::variance(recent);
    let recent_trend = stats::mean_fractional_change(recent);

    let mut urgency = (days_since_maintenance as f64 / MAINTENANCE_CYCLE_DAYS as f64).min(1.0);
    if recent_variance > baseline_variance * VARIANCE_BUMP_RATIO {
        urgency += 0.2;
    }
    if recent_trend < DECLINING_TREND {
        urgency += 0.3;
    }
    let urgency = urgency.clamp(0.0, 1.0);

    let (maintenance_type, risk_level) = if urgency > 0.8 {
        ("Urgent Maintenance", RiskLevel::Critical)
    } else if urgency > 0.6 {
        ("Planned Maintenance", RiskLevel::High)
    } else if urgency > 0.4 {
        ("Routine Maintenance", RiskLevel::Medium)
    } else {
        ("Preventive Maintenance", RiskLevel::Low)
    };

    Ok(MaintenancePrediction {
        predicted_maintenance_date: now
            + Duration::days(MAINTENANCE_CYCLE_DAYS - days_since_maintenance),
        urgency_score: urgency,
        maintenance_type: maintenance_type.to_string(),
        recommended_actions: vec![
            "General cleaning and inspection".to_string(),
            "Component replacement may be required".to_string(),
            "Calibration check".to_string(),
            "Performance test".to_string(),
        ],
        estimated_cost: 500.0 + urgency * 1000.0,
        risk_level,
    })
}
