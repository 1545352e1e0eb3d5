/*!
 * Uplink model: identity, live metrics, kind-specific telemetry, and the
 * probe history ring
 */

use serde::{Deserialize, Serialize};

use crate::config::UplinkConfig;

/// Probe history ring capacity
pub const HISTORY_SIZE: usize = 100;

/// Physical flavor of an uplink. Each kind has its own probe path and its
/// own degradation signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UplinkKind {
    /// Cellular modem: RF metrics (RSRP/SINR) from the modem channel
    Lte,

    /// Satellite dish: obstruction state from the dish stats endpoint
    Sat,

    /// Wired fiber: RTT monitoring only
    Fiber,
}

impl UplinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            UplinkKind::Lte => "lte",
            UplinkKind::Sat => "sat",
            UplinkKind::Fiber => "fiber",
        }
    }
}

/// A single reachability measurement
#[derive(Debug, Clone, Copy)]
pub struct ProbeSample {
    /// Perturbed round-trip time in milliseconds (0 when the probe failed)
    pub rtt_ms: f64,

    /// Did the probe succeed?
    pub success: bool,

    /// Engine time of the measurement (ms since engine start)
    pub at_ms: i64,
}

/// Fixed-capacity ring of the most recent probe results.
///
/// Append-only within its window; cleared on process restart (a fresh ring
/// is built per run, never persisted).
#[derive(Debug, Default)]
pub struct HistoryRing {
    slots: Vec<ProbeSample>,
    next: usize,
    total: u64,
}

impl HistoryRing {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(HISTORY_SIZE),
            next: 0,
            total: 0,
        }
    }

    pub fn push(&mut self, sample: ProbeSample) {
        if self.slots.len() < HISTORY_SIZE {
            self.slots.push(sample);
        } else {
            self.slots[self.next] = sample;
        }
        self.next = (self.next + 1) % HISTORY_SIZE;
        self.total += 1;
    }

    /// Number of samples currently held (≤ HISTORY_SIZE)
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Total samples ever recorded this run
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Iterate the newest `n` samples, newest first
    pub fn recent(&self, n: usize) -> impl Iterator<Item = ProbeSample> + '_ {
        let held = self.slots.len();
        (0..n.min(held)).map(move |i| {
            let idx = (self.next + held - 1 - i) % held;
            self.slots[idx]
        })
    }
}

/// Cellular signal metrics from the modem channel
#[derive(Debug, Clone, Default, Serialize)]
pub struct CellularInfo {
    /// Reference Signal Received Power (dBm), -140 to -44
    pub rsrp_dbm: f64,

    /// Reference Signal Received Quality (dB)
    pub rsrq_db: f64,

    /// Signal to Interference+Noise (dB)
    pub sinr_db: f64,

    /// Received Signal Strength Indicator (dBm)
    pub rssi_dbm: f64,

    pub carrier: String,
    pub cell_id: String,
    pub band: String,
    pub tac: String,
    pub connected: bool,
}

/// Satellite dish telemetry from the stats endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SatelliteInfo {
    /// Can we reach the dish at all?
    pub connected: bool,

    /// Is the dish online and tracking satellites?
    pub online: bool,

    /// "CONNECTED", "SEARCHING", ...
    pub state: String,

    pub latency_ms: f64,
    pub drop_rate: f64,
    pub downlink_mbps: f64,
    pub uplink_mbps: f64,

    pub obstructed: bool,
    /// Percent of time obstructed, 0-100
    pub obstruction_pct: f64,
    /// Seconds until the next predicted obstruction, -1 if unknown
    pub obstruction_eta_s: i32,

    pub thermal_throttle: bool,
    pub motors_stuck: bool,
}

impl Default for SatelliteInfo {
    fn default() -> Self {
        Self {
            connected: false,
            online: false,
            state: String::new(),
            latency_ms: 0.0,
            drop_rate: 0.0,
            downlink_mbps: 0.0,
            uplink_mbps: 0.0,
            obstructed: false,
            obstruction_pct: 0.0,
            obstruction_eta_s: -1,
            thermal_throttle: false,
            motors_stuck: false,
        }
    }
}

/// Additive fault injection, refreshed once per probe cycle from the chaos
/// file. The tripwire sees the perturbed values.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ChaosOffsets {
    /// Added to the probed RTT (ms)
    #[serde(default)]
    pub rtt: f64,

    /// Jitter amplitude (ms); applied as a uniform draw in [-jitter, +jitter]
    #[serde(default)]
    pub jitter: f64,

    /// Added to the computed loss percentage
    #[serde(default)]
    pub loss: f64,
}

/// Complete live state for one uplink path
#[derive(Debug)]
pub struct Uplink {
    pub cfg: UplinkConfig,

    /// Is this uplink participating? (operator toggle)
    pub enabled: bool,

    /// Is the path currently usable?
    pub reachable: bool,

    /// Operator forced fail; sticky until released, implies not reachable
    pub force_failed: bool,

    /// Is this the primary uplink carrying service traffic?
    pub active: bool,

    /// Current RTT (last successful probe, perturbed) in ms
    pub rtt_ms: f64,

    /// Slow EMA baseline over successful probes
    pub rtt_baseline: f64,

    /// Mean absolute RTT delta between recent successful probes
    pub jitter_ms: f64,

    /// Loss percentage over the recent probe window
    pub loss_pct: f64,

    pub consec_fail: u32,

    /// Current risk estimate in [0, 1]
    pub risk_now: f64,

    pub cellular: CellularInfo,
    pub satellite: SatelliteInfo,
    pub chaos: ChaosOffsets,

    pub history: HistoryRing,
}

impl Uplink {
    pub fn new(cfg: UplinkConfig) -> Self {
        let enabled = cfg.enabled;
        Self {
            cfg,
            enabled,
            reachable: true,
            force_failed: false,
            active: false,
            rtt_ms: 0.0,
            rtt_baseline: 0.0,
            jitter_ms: 0.0,
            loss_pct: 0.0,
            consec_fail: 0,
            risk_now: 0.0,
            cellular: CellularInfo::default(),
            satellite: SatelliteInfo::default(),
            chaos: ChaosOffsets::default(),
            history: HistoryRing::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.cfg.name
    }

    pub fn kind(&self) -> UplinkKind {
        self.cfg.kind
    }
}
