//! Inbound telemetry types: wire schema, decoded samples, device metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw sensor message as it arrives from the broker or the synchronous API.
///
/// Both paths share this schema. Every numeric field is optional on the wire
/// and defaults to 0 at decode time — a malformed reading is degraded, never
/// rejected (the engine copes with zeros, not with absent records).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorReading {
    #[serde(default)]
    pub device_id: String,
    /// Device-side capture time. Absent on some firmware revisions.
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub energy_used: f64,
    #[serde(default)]
    pub power_consumption: f64,
    #[serde(default)]
    pub temperature: f64,
    #[serde(default)]
    pub voltage: f64,
    #[serde(default)]
    pub current: f64,
    #[serde(default)]
    pub power_factor: f64,
}

impl SensorReading {
    /// Convert into an immutable [`TelemetrySample`].
    ///
    /// `fallback_ts` is used when the reading carries no capture time
    /// (typically the receive time).
    pub fn into_sample(self, fallback_ts: DateTime<Utc>) -> TelemetrySample {
        TelemetrySample {
            recorded_at: self.recorded_at.unwrap_or(fallback_ts),
            device_id: self.device_id,
            energy_consumption: self.energy_used,
            power_consumption: self.power_consumption,
            temperature: self.temperature,
            voltage: self.voltage,
            current: self.current,
            power_factor: self.power_factor,
        }
    }

    /// Age of the reading relative to `now`, if it carries a capture time.
    pub fn age_secs(&self, now: DateTime<Utc>) -> Option<i64> {
        self.recorded_at.map(|ts| (now - ts).num_seconds())
    }
}

/// One decoded telemetry sample. Immutable once constructed.
///
/// All six numeric fields are always present (zero-defaulted at decode time),
/// so the analytics engine never fails on missing data — it only degrades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySample {
    pub recorded_at: DateTime<Utc>,
    pub device_id: String,
    /// Cumulative energy consumption (kWh).
    pub energy_consumption: f64,
    /// Instantaneous power draw (W).
    pub power_consumption: f64,
    /// Ambient/enclosure temperature (°C).
    pub temperature: f64,
    /// Line voltage (V).
    pub voltage: f64,
    /// Line current (A).
    pub current: f64,
    /// Power factor, 0–1.
    pub power_factor: f64,
}

/// Device metadata supplied by the caller per request. Not persisted here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceProfile {
    pub device_id: String,
    /// Nameplate maximum power draw (W).
    pub max_power_consumption: f64,
    pub installation_date: DateTime<Utc>,
    #[serde(default)]
    pub last_maintenance_date: Option<DateTime<Utc>>,
}
