//! Anomaly detection over telemetry batches.
//!
//! Two regimes, chosen by batch size:
//! - fewer than two samples: unsupervised estimation is undefined, so four
//!   independent threshold rules run against the lone sample;
//! - two or more samples: a seeded isolation forest over the six raw features,
//!   fit fresh per call, with flagged points classified by simple physics.

use chrono::{DateTime, Utc};

use crate::engine::isolation;
use crate::engine::stats;
use crate::types::thresholds::*;
use crate::types::{Anomaly, AnomalyType, TelemetrySample};

/// Detect anomalies in a batch. Never fails: degenerate input degrades to the
/// threshold-rule path or an empty list.
pub fn detect(samples: &[TelemetrySample]) -> Vec<Anomaly> {
    match samples {
        [] => Vec::new(),
        [single] => threshold_rules(single),
        batch => isolate(batch),
    }
}

// ============================================================================
// Singleton path: fixed threshold rules
// ============================================================================

/// Apply the four independent rules to one sample. A sample may trip several.
fn threshold_rules(sample: &TelemetrySample) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();

    if sample.energy_consumption > SINGLE_ENERGY_LIMIT {
        anomalies.push(rule_anomaly(
            sample.recorded_at,
            AnomalyType::HighConsumption,
            0.7,
            NOMINAL_ENERGY,
            sample.energy_consumption,
        ));
    }

    if sample.temperature > SINGLE_TEMP_LIMIT {
        let severity = if sample.temperature > SINGLE_TEMP_SEVERE {
            0.9
        } else {
            0.7
        };
        anomalies.push(rule_anomaly(
            sample.recorded_at,
            AnomalyType::TemperatureAnomaly,
            severity,
            NOMINAL_TEMP,
            sample.temperature,
        ));
    }

    let v = sample.voltage;
    if v > 0.0 && (v < VOLTAGE_BAND.0 || v > VOLTAGE_BAND.1) {
        let severity = if v < VOLTAGE_BAND_SEVERE.0 || v > VOLTAGE_BAND_SEVERE.1 {
            0.9
        } else {
            0.6
        };
        anomalies.push(rule_anomaly(
            sample.recorded_at,
            AnomalyType::VoltageAnomaly,
            severity,
            NOMINAL_VOLTAGE,
            v,
        ));
    }

    let pf = sample.power_factor;
    if pf > 0.0 && pf < SINGLE_PF_LIMIT {
        let severity = if pf < SINGLE_PF_SEVERE { 0.8 } else { 0.6 };
        anomalies.push(rule_anomaly(
            sample.recorded_at,
            AnomalyType::LowPowerFactor,
            severity,
            NOMINAL_PF,
            pf,
        ));
    }

    anomalies
}

fn rule_anomaly(
    detected_at: DateTime<Utc>,
    anomaly_type: AnomalyType,
    severity: f64,
    normal_value: f64,
    actual_value: f64,
) -> Anomaly {
    Anomaly {
        detected_at,
        anomaly_type,
        description: format!("{anomaly_type} threshold exceeded"),
        severity,
        normal_value,
        actual_value,
        recommendation: anomaly_type.recommendation().to_string(),
    }
}

// ============================================================================
// Batch path: isolation forest
// ============================================================================

fn isolate(samples: &[TelemetrySample]) -> Vec<Anomaly> {
    let features: Vec<Vec<f64>> = samples
        .iter()
        .map(|s| {
            vec![
                s.energy_consumption,
                s.power_consumption,
                s.temperature,
                s.voltage,
                s.current,
                s.power_factor,
            ]
        })
        .collect();

    let energies: Vec<f64> = samples.iter().map(|s| s.energy_consumption).collect();
    let mean_energy = stats::mean(&energies);

    isolation::detect_outliers(
        &features,
        CONTAMINATION,
        ISOLATION_TREES,
        ISOLATION_SUBSAMPLE,
        ISOLATION_SEED,
    )
    .into_iter()
    .map(|outlier| {
        let sample = &samples[outlier.index];
        let anomaly_type = classify(sample);
        Anomaly {
            detected_at: sample.recorded_at,
            anomaly_type,
            description: format!("{anomaly_type} anomaly detected"),
            severity: outlier.decision.abs(),
            normal_value: mean_energy,
            actual_value: sample.energy_consumption,
            recommendation: anomaly_type.recommendation().to_string(),
        }
    })
    .collect()
}

/// Classify an isolated sample. First matching pattern wins.
fn classify(sample: &TelemetrySample) -> AnomalyType {
    if sample.power_consumption > sample.energy_consumption * 2.0 {
        AnomalyType::HighConsumption
    } else if sample.temperature > BATCH_TEMP_SPIKE {
        AnomalyType::TemperatureSpike
    } else if sample.voltage < VOLTAGE_BAND.0 || sample.voltage > VOLTAGE_BAND.1 {
        AnomalyType::VoltageAnomaly
    } else {
        AnomalyType::GeneralAnomaly
    }
}
