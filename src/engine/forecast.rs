//! Short-term energy consumption forecasting.
//!
//! Fits a linear model of energy consumption against the raw electrical
//! features plus calendar features, then chains predictions forward day by
//! day, feeding each day's estimate back in as the next day's consumption
//! feature. Fails soft: any degenerate input produces the documented
//! zero-confidence result instead of an error.

use chrono::{Datelike, Duration, Timelike, Utc};
use tracing::debug;

use crate::engine::stats;
use crate::engine::EngineError;
use crate::types::thresholds::{
    CONFIDENCE_CEIL, CONFIDENCE_FLOOR, PREDICTION_BAND, TREND_WINDOW,
};
use crate::types::{ForecastFactor, ForecastResult, TelemetrySample};

// Feature layout: energy, power, temperature, voltage, current, power factor,
// day-of-week, hour, month.
const FEAT_ENERGY: usize = 0;
const FEAT_DOW: usize = 6;
const FEAT_HOUR: usize = 7;
const FEAT_MONTH: usize = 8;

/// Forecast consumption `days_ahead` days out.
///
/// On any failure (empty batch, zero horizon, degenerate fit) returns the
/// zero-confidence fallback rather than propagating.
pub fn forecast(samples: &[TelemetrySample], days_ahead: u32) -> ForecastResult {
    match try_forecast(samples, days_ahead) {
        Ok(result) => result,
        Err(e) => {
            debug!(error = %e, days_ahead, "forecast degraded to zero-confidence result");
            fallback(days_ahead)
        }
    }
}

/// The documented zero-confidence result.
fn fallback(days_ahead: u32) -> ForecastResult {
    ForecastResult {
        prediction_date: Utc::now() + Duration::days(i64::from(days_ahead)),
        predicted_energy_consumption: 0.0,
        confidence_level: 0.0,
        min_prediction: 0.0,
        max_prediction: 0.0,
        factors: Vec::new(),
    }
}

fn try_forecast(samples: &[TelemetrySample], days_ahead: u32) -> Result<ForecastResult, EngineError> {
    if samples.is_empty() {
        return Err(EngineError::EmptyBatch);
    }
    if days_ahead == 0 {
        return Err(EngineError::ZeroHorizon);
    }

    let mut sorted: Vec<&TelemetrySample> = samples.iter().collect();
    sorted.sort_by_key(|s| s.recorded_at);

    let energy: Vec<f64> = sorted.iter().map(|s| s.energy_consumption).collect();
    let power: Vec<f64> = sorted.iter().map(|s| s.power_consumption).collect();
    let temperature: Vec<f64> = sorted.iter().map(|s| s.temperature).collect();

    let mean_energy = stats::mean(&energy);
    if mean_energy == 0.0 {
        return Err(EngineError::ZeroMeanConsumption);
    }

    // Smoothed trend columns with the leading gap back-filled; surfaced as
    // diagnostics alongside the fit.
    let energy_trend = stats::trailing_mean_filled(&energy, TREND_WINDOW);
    let power_trend = stats::trailing_mean_filled(&power, TREND_WINDOW);
    debug!(
        energy_trend = energy_trend.last().copied().unwrap_or_default(),
        power_trend = power_trend.last().copied().unwrap_or_default(),
        samples = sorted.len(),
        "trailing consumption trend"
    );

    let rows: Vec<Vec<f64>> = sorted.iter().map(|s| feature_row(s)).collect();
    let model = stats::least_squares(&rows, &energy)?;

    // In-sample error drives the confidence estimate.
    let mae = stats::mean(
        &rows
            .iter()
            .zip(energy.iter())
            .map(|(row, &actual)| (stats::predict(&model, row) - actual).abs())
            .collect::<Vec<f64>>(),
    );
    let confidence = (1.0 - mae / mean_energy).clamp(CONFIDENCE_FLOOR, CONFIDENCE_CEIL);

    // Autoregressive chaining: each day's prediction becomes the next day's
    // consumption feature; hour is pinned to midday.
    let last_date = sorted[sorted.len() - 1].recorded_at;
    let mut current = rows[rows.len() - 1].clone();
    let mut predictions = Vec::with_capacity(days_ahead as usize);

    for day in 1..=i64::from(days_ahead) {
        let future = last_date + Duration::days(day);
        current[FEAT_DOW] = f64::from(future.weekday().num_days_from_monday());
        current[FEAT_HOUR] = 12.0;
        current[FEAT_MONTH] = f64::from(future.month());

        let predicted = stats::predict(&model, &current);
        predictions.push(predicted);
        current[FEAT_ENERGY] = predicted;
    }

    let point = predictions[predictions.len() - 1];
    let trend_slope = if predictions.len() < 2 {
        0.0
    } else {
        let deltas: Vec<f64> = predictions.windows(2).map(|w| w[1] - w[0]).collect();
        stats::mean(&deltas)
    };

    Ok(ForecastResult {
        prediction_date: Utc::now() + Duration::days(i64::from(days_ahead)),
        predicted_energy_consumption: point,
        confidence_level: confidence,
        min_prediction: point * (1.0 - PREDICTION_BAND),
        max_prediction: point * (1.0 + PREDICTION_BAND),
        factors: vec![
            ForecastFactor {
                factor_name: "Historical Trend".to_string(),
                impact: trend_slope,
                description: "Mean day-over-day change across the chained predictions".to_string(),
            },
            ForecastFactor {
                factor_name: "Temperature Impact".to_string(),
                impact: stats::pearson(&temperature, &energy),
                description: "Correlation between temperature and energy consumption".to_string(),
            },
        ],
    })
}

fn feature_row(sample: &TelemetrySample) -> Vec<f64> {
    vec![
        sample.energy_consumption,
        sample.power_consumption,
        sample.temperature,
        sample.voltage,
        sample.current,
        sample.power_factor,
        f64::from(sample.recorded_at.weekday().num_days_from_monday()),
        f64::from(sample.recorded_at.hour()),
        f64::from(sample.recorded_at.month()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn make_history(days: usize) -> Vec<TelemetrySample> {
        (0..days)
            .map(|i| {
                let ts = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap()
                    + Duration::days(i as i64);
                TelemetrySample {
                    recorded_at: ts,
                    device_id: "dev-1".to_string(),
                    energy_consumption: 100.0 + i as f64 * 2.0,
                    power_consumption: 450.0 + i as f64,
                    temperature: 22.0 + (i % 5) as f64,
                    voltage: 220.0 + (i % 3) as f64,
                    current: 4.5 + (i % 2) as f64 * 0.2,
                    power_factor: 0.9,
                }
            })
            .collect()
    }

    #[test]
    fn confidence_is_always_within_bounds() {
        let history = make_history(14);
        let result = forecast(&history, 7);
        assert!(result.confidence_level >= CONFIDENCE_FLOOR);
        assert!(result.confidence_level <= CONFIDENCE_CEIL);
    }

    #[test]
    fn bounds_are_twenty_percent_of_point_estimate() {
        let history = make_history(14);
        let result = forecast(&history, 3);
        let point = result.predicted_energy_consumption;
        assert!((result.min_prediction - point * 0.8).abs() < 1e-9);
        assert!((result.max_prediction - point * 1.2).abs() < 1e-9);
    }

    #[test]
    fn carries_two_explanatory_factors() {
        let history = make_history(14);
        let result = forecast(&history, 5);
        assert_eq!(result.factors.len(), 2);
        assert_eq!(result.factors[0].factor_name, "Historical Trend");
        assert_eq!(result.factors[1].factor_name, "Temperature Impact");
        assert!(result.factors[0].impact.is_finite());
        // Correlation factor is a Pearson coefficient.
        assert!(result.factors[1].impact.abs() <= 1.0 + 1e-9);
    }

    #[test]
    fn empty_batch_falls_back_to_zero_confidence() {
        let result = forecast(&[], 7);
        assert_eq!(result.confidence_level, 0.0);
        assert_eq!(result.predicted_energy_consumption, 0.0);
        assert!(result.factors.is_empty());
    }

    #[test]
    fn zero_horizon_falls_back() {
        let history = make_history(10);
        let result = forecast(&history, 0);
        assert_eq!(result.confidence_level, 0.0);
    }

    #[test]
    fn repeated_calls_are_identical() {
        let history = make_history(14);
        let a = forecast(&history, 7);
        let b = forecast(&history, 7);
        assert_eq!(
            a.predicted_energy_consumption,
            b.predicted_energy_consumption
        );
        assert_eq!(a.confidence_level, b.confidence_level);
    }

    #[test]
    fn unsorted_input_is_sorted_before_fitting() {
        let mut history = make_history(14);
        history.reverse();
        let sorted_result = forecast(&make_history(14), 7);
        let reversed_result = forecast(&history, 7);
        assert_eq!(
            sorted_result.predicted_energy_consumption,
            reversed_result.predicted_energy_consumption
        );
    }
}
