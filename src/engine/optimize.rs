//! Energy optimization planning.
//!
//! Inspects a telemetry batch against the device's nameplate rating and emits
//! up to three fixed-cost actions: efficiency improvement, schedule
//! optimization, and temperature control. Aggregates carry the plan totals,
//! carbon estimate, and annualized ROI.

use tracing::debug;

use crate::engine::stats;
use crate::engine::EngineError;
use crate::types::thresholds::{
    CARBON_FACTOR, LOW_EFFICIENCY_PCT, RISING_TREND, TEMP_CORRELATION_LIMIT,
};
use crate::types::{DeviceProfile, OptimizationAction, OptimizationPlan, Priority, TelemetrySample};

/// Build an optimization plan. On failure returns the documented all-zero
/// plan with no actions.
pub fn optimize(profile: &DeviceProfile, samples: &[TelemetrySample]) -> OptimizationPlan {
    match try_optimize(profile, samples) {
        Ok(plan) => plan,
        Err(e) => {
            debug!(error = %e, device = %profile.device_id, "optimization degraded to empty plan");
            fallback()
        }
    }
}

fn fallback() -> OptimizationPlan {
    OptimizationPlan {
        actions: Vec::new(),
        potential_savings: 0.0,
        energy_reduction: 0.0,
        carbon_reduction: 0.0,
        implementation_cost: 0.0,
        payback_period: 0,
        roi: 0.0,
    }
}

fn try_optimize(
    profile: &DeviceProfile,
    samples: &[TelemetrySample],
) -> Result<OptimizationPlan, EngineError> {
    if samples.is_empty() {
        return Err(EngineError::EmptyBatch);
    }
    if profile.max_power_consumption <= 0.0 {
        return Err(EngineError::InvalidProfile);
    }

    let power: Vec<f64> = samples.iter().map(|s| s.power_consumption).collect();
    let energy: Vec<f64> = samples.iter().map(|s| s.energy_consumption).collect();
    let temperature: Vec<f64> = samples.iter().map(|s| s.temperature).collect();

    let efficiency = stats::mean(&power) / profile.max_power_consumption * 100.0;
    let power_trend = stats::mean_fractional_change(&power);
    let temp_correlation = stats::pearson(&temperature, &energy);

    let mut actions = Vec::new();

    if efficiency < LOW_EFFICIENCY_PCT {
        actions.push(OptimizationAction {
            action_name: "Efficiency Improvement".to_string(),
            description: "Device energy efficiency is low. Maintenance and tuning required."
                .to_string(),
            category: "Efficiency".to_string(),
            potential_savings: 200.0,
            energy_reduction: 50.0,
            implementation_cost: 1000.0,
            payback_period: 5,
            priority: Priority::High,
            steps: vec![
                "Perform periodic device maintenance".to_string(),
                "Replace worn components".to_string(),
                "Optimize operating hours".to_string(),
            ],
        });
    }

    if power_trend > RISING_TREND {
        actions.push(OptimizationAction {
            action_name: "Schedule Optimization".to_string(),
            description: "Power draw is trending upward. Shift usage away from peak hours."
                .to_string(),
            category: "Schedule".to_string(),
            potential_savings: 150.0,
            energy_reduction: 30.0,
            implementation_cost: 500.0,
            payback_period: 3,
            priority: Priority::Medium,
            steps: vec![
                "Reduce usage during peak hours".to_string(),
                "Schedule heavy loads overnight".to_string(),
                "Spread workloads over the weekend".to_string(),
            ],
        });
    }

    if temp_correlation > TEMP_CORRELATION_LIMIT {
        actions.push(OptimizationAction {
            action_name: "Temperature Control".to_string(),
            description: "High temperature is driving energy consumption up.".to_string(),
            category: "Temperature".to_string(),
            potential_savings: 100.0,
            energy_reduction: 20.0,
            implementation_cost: 2000.0,
            payback_period: 20,
            priority: Priority::Medium,
            steps: vec![
                "Inspect the cooling system".to_string(),
                "Improve ventilation".to_string(),
                "Add shading around the enclosure".to_string(),
            ],
        });
    }

    let potential_savings: f64 = actions.iter().map(|a| a.potential_savings).sum();
    let energy_reduction: f64 = actions.iter().map(|a| a.energy_reduction).sum();
    let implementation_cost: f64 = actions.iter().map(|a| a.implementation_cost).sum();
    let payback_period = actions.iter().map(|a| a.payback_period).max().unwrap_or(0);
    let roi = if implementation_cost > 0.0 {
        potential_savings * 12.0 / implementation_cost * 100.0
    } else {
        0.0
    };

    Ok(OptimizationPlan {
        actions,
        potential_savings,
        energy_reduction,
        carbon_reduction: energy_reduction * CARBON_FACTOR,
        implementation_cost,
        payback_period,
        roi,
    })
}
