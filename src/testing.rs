/*!
 * Test support: scripted implementations of the probe, modem, and dish
 * seams. Always compiled so integration tests can drive the engine; the
 * production binary never references them.
 */

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::error::{Result, SteerError};
use crate::probe::dish::{DishReading, DishSource};
use crate::probe::modem::{CellularReading, SignalSource};
use crate::probe::{ProbeSpec, Prober};

/// A prober that replays scripted outcomes per uplink name.
///
/// One-shot queued outcomes (via [`push`](Self::push)) take precedence;
/// otherwise the per-uplink default applies; otherwise the probe is lost.
#[derive(Default)]
pub struct ScriptedProber {
    queues: Mutex<HashMap<String, VecDeque<Option<f64>>>>,
    defaults: Mutex<HashMap<String, Option<f64>>>,
}

impl ScriptedProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// A prober that always answers `outcome` for `uplink`.
    pub fn constant(uplink: &str, outcome: Option<f64>) -> Self {
        let prober = Self::new();
        prober.set_default(uplink, outcome);
        prober
    }

    /// Set the steady-state outcome for an uplink.
    pub fn set_default(&self, uplink: &str, outcome: Option<f64>) {
        self.defaults
            .lock()
            .unwrap()
            .insert(uplink.to_string(), outcome);
    }

    /// Queue a one-shot outcome, consumed before the default.
    pub fn push(&self, uplink: &str, outcome: Option<f64>) {
        self.queues
            .lock()
            .unwrap()
            .entry(uplink.to_string())
            .or_default()
            .push_back(outcome);
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    async fn probe(&self, spec: &ProbeSpec) -> Option<f64> {
        if let Some(queue) = self.queues.lock().unwrap().get_mut(&spec.uplink) {
            if let Some(outcome) = queue.pop_front() {
                return outcome;
            }
        }
        self.defaults
            .lock()
            .unwrap()
            .get(&spec.uplink)
            .copied()
            .flatten()
    }
}

/// A modem channel serving static readings per modem id.
#[derive(Default)]
pub struct StaticSignals {
    readings: Mutex<HashMap<String, CellularReading>>,
}

impl StaticSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, modem_id: &str, reading: CellularReading) {
        self.readings
            .lock()
            .unwrap()
            .insert(modem_id.to_string(), reading);
    }
}

#[async_trait]
impl SignalSource for StaticSignals {
    async fn query(&self, modem_id: &str) -> Result<CellularReading> {
        self.readings
            .lock()
            .unwrap()
            .get(modem_id)
            .cloned()
            .ok_or_else(|| SteerError::Modem(format!("no reading for modem {}", modem_id)))
    }
}

/// A dish endpoint serving scripted readings per endpoint URL.
#[derive(Default)]
pub struct ScriptedDish {
    readings: Mutex<HashMap<String, DishReading>>,
}

impl ScriptedDish {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, endpoint: &str, reading: DishReading) {
        self.readings
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), reading);
    }

    /// Convenience: a reading with the given obstruction fraction and ETA.
    pub fn set_obstruction(&self, endpoint: &str, fraction: f64, eta_s: i32) {
        let reading: DishReading = serde_json::from_value(serde_json::json!({
            "latency_ms": 38.0,
            "obstruction": fraction,
            "snr_ok": true,
            "eta_s": eta_s,
        }))
        .expect("static dish reading");
        self.set(endpoint, reading);
    }
}

#[async_trait]
impl DishSource for ScriptedDish {
    async fn stats(&self, endpoint: &str) -> Result<DishReading> {
        self.readings
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| SteerError::Dish(format!("no reading for {}", endpoint)))
    }
}
