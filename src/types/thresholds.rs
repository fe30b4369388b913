//! Fixed analytic thresholds and scoring constants.
//!
//! Centralises the magic numbers used by the analytics engine. Grouped by
//! operation for easy discovery.

// ============================================================================
// Single-sample anomaly rules
// ============================================================================

/// Energy consumption above this (kWh) flags HighConsumption on a singleton.
pub const SINGLE_ENERGY_LIMIT: f64 = 300.0;

/// Temperature above this (°C) flags TemperatureAnomaly on a singleton.
pub const SINGLE_TEMP_LIMIT: f64 = 40.0;

/// Temperature above this (°C) escalates the singleton rule to severity 0.9.
pub const SINGLE_TEMP_SEVERE: f64 = 50.0;

/// Normal operating voltage band (V). Outside it flags VoltageAnomaly.
pub const VOLTAGE_BAND: (f64, f64) = (200.0, 250.0);

/// Hard voltage band (V). Outside it escalates to severity 0.9.
pub const VOLTAGE_BAND_SEVERE: (f64, f64) = (180.0, 260.0);

/// Power factor below this flags LowPowerFactor on a singleton.
pub const SINGLE_PF_LIMIT: f64 = 0.7;

/// Power factor below this escalates the singleton rule to severity 0.8.
pub const SINGLE_PF_SEVERE: f64 = 0.5;

/// Nominal values reported as `normal_value` by the singleton rules.
pub const NOMINAL_ENERGY: f64 = 300.0;
pub const NOMINAL_TEMP: f64 = 40.0;
pub const NOMINAL_VOLTAGE: f64 = 230.0;
pub const NOMINAL_PF: f64 = 0.9;

// ============================================================================
// Outlier isolation (batch path)
// ============================================================================

/// Assumed prior fraction of anomalous samples per batch.
pub const CONTAMINATION: f64 = 0.1;

/// Fixed RNG seed — every fit is reproducible by construction.
pub const ISOLATION_SEED: u64 = 42;

/// Number of isolation trees per fit.
pub const ISOLATION_TREES: usize = 100;

/// Maximum subsample size per tree.
pub const ISOLATION_SUBSAMPLE: usize = 256;

/// Batch-path classification: temperature above this (°C) is a spike.
pub const BATCH_TEMP_SPIKE: f64 = 50.0;

// ============================================================================
// Optimization
// ============================================================================

/// Efficiency (% of nameplate) below which the efficiency action fires.
pub const LOW_EFFICIENCY_PCT: f64 = 70.0;

/// Mean fractional power growth above which the schedule action fires.
pub const RISING_TREND: f64 = 0.10;

/// Temperature/energy correlation above which the temperature action fires.
pub const TEMP_CORRELATION_LIMIT: f64 = 0.5;

/// kg CO₂ avoided per kWh of reduction.
pub const CARBON_FACTOR: f64 = 0.4;

// ============================================================================
// Maintenance
// ============================================================================

/// Annual maintenance assumption (days) — urgency base denominator.
pub const MAINTENANCE_CYCLE_DAYS: i64 = 365;

/// Window of most recent samples used for variance/trend checks.
pub const RECENT_WINDOW: usize = 30;

/// Recent variance must exceed baseline × this to add the variance bump.
pub const VARIANCE_BUMP_RATIO: f64 = 1.5;

/// Mean fractional power change below this adds the declining-trend bump.
pub const DECLINING_TREND: f64 = -0.05;

// ============================================================================
// Efficiency scoring
// ============================================================================

/// Sub-score weights: power efficiency, power factor, temperature stability,
/// voltage stability.
pub const EFFICIENCY_WEIGHTS: [f64; 4] = [0.4, 0.3, 0.15, 0.15];

/// Fleet benchmark the overall score is compared against.
pub const EFFICIENCY_BENCHMARK: f64 = 85.0;

/// Improvement-area thresholds: power efficiency %, mean power factor,
/// temperature stability, voltage stability.
pub const IMPROVEMENT_THRESHOLDS: [f64; 4] = [80.0, 0.8, 80.0, 80.0];

/// Reduced streaming score weights: power factor, voltage stability,
/// temperature stability.
pub const STREAMING_WEIGHTS: [f64; 3] = [0.5, 0.25, 0.25];

// ============================================================================
// Forecast
// ============================================================================

/// Trailing window for the smoothed energy/power trend columns.
pub const TREND_WINDOW: usize = 7;

/// Confidence clamp bounds for a fitted forecast.
pub const CONFIDENCE_FLOOR: f64 = 0.1;
pub const CONFIDENCE_CEIL: f64 = 0.9;

/// Prediction interval half-width as a fraction of the point estimate.
pub const PREDICTION_BAND: f64 = 0.2;
