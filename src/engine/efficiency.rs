//! Device efficiency scoring.
//!
//! Full score: four clamped sub-scores (power efficiency, power factor,
//! temperature stability, voltage stability) weighted 0.4/0.3/0.15/0.15,
//! mapped onto five level bands, with a structured improvement-area list.
//!
//! Streaming score: a reduced three-metric variant needing no device profile,
//! cheap enough to run per message on the ingest path.

use tracing::debug;

use crate::engine::stats;
use crate::engine::EngineError;
use crate::types::thresholds::{
    EFFICIENCY_BENCHMARK, EFFICIENCY_WEIGHTS, IMPROVEMENT_THRESHOLDS, STREAMING_WEIGHTS,
};
use crate::types::{
    DeviceProfile, EfficiencyLevel, EfficiencyMetric, EfficiencyScore, ImprovementArea, Priority,
    TelemetrySample,
};

/// Compute the full efficiency score. On failure returns the documented
/// zero/Poor fallback with a single "insufficient data" note.
pub fn score(profile: &DeviceProfile, samples: &[TelemetrySample]) -> EfficiencyScore {
    match try_score(profile, samples) {
        Ok(result) => result,
        Err(e) => {
            debug!(error = %e, device = %profile.device_id, "efficiency score degraded to fallback");
            fallback()
        }
    }
}

fn fallback() -> EfficiencyScore {
    EfficiencyScore {
        overall_score: 0.0,
        efficiency_level: EfficiencyLevel::Poor,
        metrics: Vec::new(),
        improvement_areas: vec![ImprovementArea {
            area: "Insufficient data for efficiency analysis".to_string(),
            current_value: 0.0,
            target: 0.0,
            priority: Priority::Low,
        }],
        benchmark_comparison: 0.0,
    }
}

fn try_score(
    profile: &DeviceProfile,
    samples: &[TelemetrySample],
) -> Result<EfficiencyScore, EngineError> {
    if samples.is_empty() {
        return Err(EngineError::EmptyBatch);
    }
    if profile.max_power_consumption <= 0.0 {
        return Err(EngineError::InvalidProfile);
    }

    let power: Vec<f64> = samples.iter().map(|s| s.power_consumption).collect();
    let power_factor: Vec<f64> = samples.iter().map(|s| s.power_factor).collect();
    let temperature: Vec<f64> = samples.iter().map(|s| s.temperature).collect();
    let voltage: Vec<f64> = samples.iter().map(|s| s.voltage).collect();

    let power_efficiency =
        (stats::mean(&power) / profile.max_power_consumption * 100.0).clamp(0.0, 100.0);
    let mean_power_factor = stats::mean(&power_factor);
    let power_factor_score = (mean_power_factor * 100.0).clamp(0.0, 100.0);
    let temp_stability = (100.0 - 2.0 * stats::std_dev(&temperature)).max(0.0);
    let voltage_stability = (100.0 - 5.0 * stats::std_dev(&voltage)).max(0.0);

    let [w_power, w_pf, w_temp, w_volt] = EFFICIENCY_WEIGHTS;
    let overall_score = power_efficiency * w_power
        + power_factor_score * w_pf
        + temp_stability * w_temp
        + voltage_stability * w_volt;

    let metrics = vec![
        EfficiencyMetric {
            metric_name: "Power Efficiency".to_string(),
            value: power_efficiency,
            benchmark: 85.0,
            score: power_efficiency,
            unit: "%".to_string(),
        },
        EfficiencyMetric {
            metric_name: "Power Factor".to_string(),
            value: mean_power_factor,
            benchmark: 0.9,
            score: power_factor_score,
            unit: String::new(),
        },
        EfficiencyMetric {
            metric_name: "Temperature Stability".to_string(),
            value: temp_stability,
            benchmark: 90.0,
            score: temp_stability,
            unit: "%".to_string(),
        },
        EfficiencyMetric {
            metric_name: "Voltage Stability".to_string(),
            value: voltage_stability,
            benchmark: 90.0,
            score: voltage_stability,
            unit: "%".to_string(),
        },
    ];

    let [t_power, t_pf, t_temp, t_volt] = IMPROVEMENT_THRESHOLDS;
    let mut improvement_areas = Vec::new();
    if power_efficiency < t_power {
        improvement_areas.push(ImprovementArea {
            area: "Power Efficiency".to_string(),
            current_value: power_efficiency,
            target: t_power,
            priority: Priority::High,
        });
    }
    if mean_power_factor < t_pf {
        improvement_areas.push(ImprovementArea {
            area: "Power Factor".to_string(),
            current_value: mean_power_factor,
            target: t_pf,
            priority: Priority::High,
        });
    }
    if temp_stability < t_temp {
        improvement_areas.push(ImprovementArea {
            area: "Temperature Stability".to_string(),
            current_value: temp_stability,
            target: t_temp,
            priority: Priority::Medium,
        });
    }
    if voltage_stability < t_volt {
        improvement_areas.push(ImprovementArea {
            area: "Voltage Stability".to_string(),
            current_value: voltage_stability,
            target: t_volt,
            priority: Priority::Medium,
        });
    }

    Ok(EfficiencyScore {
        overall_score,
        efficiency_level: EfficiencyLevel::from_score(overall_score),
        metrics,
        improvement_areas,
        benchmark_comparison: overall_score - EFFICIENCY_BENCHMARK,
    })
}

/// Reduced per-message score for the streaming path: power factor, voltage
/// stability, and temperature stability weighted 0.5/0.25/0.25. Needs no
/// device profile, so it runs on every broker message.
///
/// For a single sample the two stability terms are trivially 100; the score
/// is then driven entirely by the power factor.
pub fn streaming_score(samples: &[TelemetrySample]) -> EfficiencyScore {
    let power_factor: Vec<f64> = samples.iter().map(|s| s.power_factor).collect();
    let temperature: Vec<f64> = samples.iter().map(|s| s.temperature).collect();
    let voltage: Vec<f64> = samples.iter().map(|s| s.voltage).collect();

    let power_factor_score = (stats::mean(&power_factor) * 100.0).clamp(0.0, 100.0);
    let temp_stability = (100.0 - 2.0 * stats::std_dev(&temperature)).max(0.0);
    let voltage_stability = (100.0 - 5.0 * stats::std_dev(&voltage)).max(0.0);

    let [w_pf, w_volt, w_temp] = STREAMING_WEIGHTS;
    let overall_score =
        power_factor_score * w_pf + voltage_stability * w_volt + temp_stability * w_temp;

    EfficiencyScore {
        overall_score,
        efficiency_level: EfficiencyLevel::from_score(overall_score),
        metrics: vec![
            EfficiencyMetric {
                metric_name: "Power Factor".to_string(),
                value: stats::mean(&power_factor),
                benchmark: 0.9,
                score: power_factor_score,
                unit: String::new(),
            },
            EfficiencyMetric {
                metric_name: "Voltage Stability".to_string(),
                value: voltage_stability,
                benchmark: 90.0,
                score: voltage_stability,
                unit: "%".to_string(),
            },
            EfficiencyMetric {
                metric_name: "Temperature Stability".to_string(),
                value: temp_stability,
                benchmark: 90.0,
                score: temp_stability,
                unit: "%".to_string(),
            },
        ],
        improvement_areas: Vec::new(),
        benchmark_comparison: overall_score - EFFICIENCY_BENCHMARK,
    }
}
