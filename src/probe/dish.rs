//! Satellite dish stats client
//!
//! The dish exposes a local stats endpoint inside the uplink's namespace;
//! the daemon's service wiring routes it through the uplink veth. Polled
//! at a slow cadence; a failed poll keeps the previous telemetry and
//! never marks the uplink unreachable on its own.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{Result, SteerError};
use crate::uplink::SatelliteInfo;

/// How often dish stats are polled per satellite uplink (ms)
pub const DISH_POLL_INTERVAL_MS: i64 = 1000;

/// Obstruction fraction above which the dish counts as obstructed
pub const OBSTRUCTED_FRACTION: f64 = 0.10;

/// Raw stats payload from the dish endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct DishReading {
    #[serde(default)]
    pub latency_ms: f64,

    /// Fraction of time obstructed, 0.0-1.0
    #[serde(default)]
    pub obstruction: f64,

    #[serde(default)]
    pub snr_ok: bool,

    #[serde(default)]
    pub downlink_bps: f64,

    #[serde(default)]
    pub uplink_bps: f64,

    /// Seconds until the next predicted obstruction, -1 if unknown
    #[serde(default = "default_eta")]
    pub eta_s: i32,

    #[serde(default)]
    pub drop_rate: f64,

    #[serde(default)]
    pub thermal_throttle: bool,

    #[serde(default)]
    pub motors_stuck: bool,
}

fn default_eta() -> i32 {
    -1
}

/// Dish stats seam; tests provide scripted readings.
#[async_trait]
pub trait DishSource: Send + Sync {
    async fn stats(&self, endpoint: &str) -> Result<DishReading>;
}

/// Production HTTP client (persistent, short timeout).
pub struct DishClient {
    http: reqwest::Client,
}

impl DishClient {
    pub fn new() -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .map_err(|e| SteerError::Dish(format!("http client: {}", e)))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl DishSource for DishClient {
    async fn stats(&self, endpoint: &str) -> Result<DishReading> {
        let response = self
            .http
            .get(endpoint)
            .send()
            .await
            .map_err(|e| SteerError::Dish(format!("{}: {}", endpoint, e)))?;
        response
            .json::<DishReading>()
            .await
            .map_err(|e| SteerError::Dish(format!("{}: {}", endpoint, e)))
    }
}

/// Fold a dish reading into the uplink's satellite telemetry.
pub fn apply(reading: &DishReading, sat: &mut SatelliteInfo) {
    sat.connected = true;
    sat.online = reading.snr_ok;
    sat.state = if reading.snr_ok {
        "CONNECTED".to_string()
    } else {
        "SEARCHING".to_string()
    };
    sat.latency_ms = reading.latency_ms;
    sat.drop_rate = reading.drop_rate;
    sat.downlink_mbps = reading.downlink_bps / 1_000_000.0;
    sat.uplink_mbps = reading.uplink_bps / 1_000_000.0;
    sat.obstructed = reading.obstruction > OBSTRUCTED_FRACTION;
    sat.obstruction_pct = reading.obstruction * 100.0;
    sat.obstruction_eta_s = reading.eta_s;
    sat.thermal_throttle = reading.thermal_throttle;
    sat.motors_stuck = reading.motors_stuck;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_defaults() {
        let reading: DishReading = serde_json::from_str("{}").unwrap();
        assert_eq!(reading.eta_s, -1);
        assert!(!reading.snr_ok);
        assert_eq!(reading.obstruction, 0.0);
    }

    #[test]
    fn test_apply_connected() {
        let reading: DishReading = serde_json::from_str(
            r#"{"latency_ms": 38.0, "obstruction": 0.02, "snr_ok": true,
                "downlink_bps": 150000000.0, "uplink_bps": 12000000.0, "eta_s": 45}"#,
        )
        .unwrap();
        let mut sat = SatelliteInfo::default();
        apply(&reading, &mut sat);

        assert!(sat.connected);
        assert!(sat.online);
        assert_eq!(sat.state, "CONNECTED");
        assert!(!sat.obstructed);
        assert!((sat.obstruction_pct - 2.0).abs() < 1e-9);
        assert!((sat.downlink_mbps - 150.0).abs() < 1e-9);
        assert_eq!(sat.obstruction_eta_s, 45);
    }

    #[test]
    fn test_apply_obstructed_threshold() {
        let mut sat = SatelliteInfo::default();
        let mut reading: DishReading = serde_json::from_str("{}").unwrap();

        reading.obstruction = 0.10;
        apply(&reading, &mut sat);
        assert!(!sat.obstructed);

        reading.obstruction = 0.11;
        apply(&reading, &mut sat);
        assert!(sat.obstructed);
        assert_eq!(sat.state, "SEARCHING");
    }
}
