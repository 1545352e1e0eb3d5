/*!
 * Tripwire: fast-path degradation detection on the active uplink
 *
 * Evaluated every loop iteration. Any firing condition immediately moves
 * the engine into protection; arbitration of where to switch happens on
 * the slow path afterwards.
 */

use crate::config::EngineConfig;
use crate::uplink::{Uplink, UplinkKind};

/// LTE signal power below this floor fires the tripwire (dBm)
pub const RSRP_FLOOR_DBM: f64 = -120.0;

/// Predicted satellite obstruction closer than this fires the tripwire (s)
pub const OBSTRUCTION_ETA_HORIZON_S: i32 = 5;

/// RTT step is evaluated over the mean of this many recent successes
const RTT_STEP_SAMPLES: usize = 3;

/// RTT step needs at least this much history before it can fire
const MIN_RING_SAMPLES: usize = 5;

/// What caused the tripwire to fire
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// RTT jumped significantly over baseline
    RttStep,
    /// Lost consecutive probes
    ProbeMiss,
    /// Active uplink is not usable at all
    LinkDown,
    /// LTE signal power fell below the floor
    RsrpDrop,
    /// LTE signal quality degraded (reserved)
    SinrDrop,
    /// Satellite dish obstructed, or obstruction imminent
    SatObstruction,
    /// Prediction engine warned us (reserved for the PREPARE path)
    Predicted,
    /// Operator forced via command
    Manual,
}

impl Trigger {
    /// Wire name, as logged and published in the status snapshot
    pub fn as_str(&self) -> &'static str {
        match self {
            Trigger::RttStep => "rtt_step",
            Trigger::ProbeMiss => "probe_miss",
            Trigger::LinkDown => "link_down",
            Trigger::RsrpDrop => "rsrp_drop",
            Trigger::SinrDrop => "sinr_drop",
            Trigger::SatObstruction => "starlink_obstruction",
            Trigger::Predicted => "predicted",
            Trigger::Manual => "manual",
        }
    }
}

/// Thresholds the tripwire works against, extracted from the config once
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    pub rtt_step_ms: f64,
    pub probe_miss_count: u32,
}

impl From<&EngineConfig> for Thresholds {
    fn from(cfg: &EngineConfig) -> Self {
        Self {
            rtt_step_ms: cfg.rtt_step_threshold_ms,
            probe_miss_count: cfg.probe_miss_count,
        }
    }
}

/// Evaluate the tripwire against the active uplink. Returns the first
/// matching trigger, or `None` when the path looks healthy.
pub fn check(active: &Uplink, thresholds: &Thresholds) -> Option<Trigger> {
    if !active.enabled || !active.reachable {
        return Some(Trigger::LinkDown);
    }

    // RTT step: mean of the recent successes minus the slow baseline
    if active.history.len() >= MIN_RING_SAMPLES && active.rtt_baseline > 0.0 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for s in active.history.recent(RTT_STEP_SAMPLES) {
            if s.success {
                sum += s.rtt_ms;
                count += 1;
            }
        }
        if count > 0 {
            let step = sum / count as f64 - active.rtt_baseline;
            if step >= thresholds.rtt_step_ms {
                return Some(Trigger::RttStep);
            }
        }
    }

    if active.consec_fail >= thresholds.probe_miss_count {
        return Some(Trigger::ProbeMiss);
    }

    if active.kind() == UplinkKind::Lte && active.cellular.rsrp_dbm < RSRP_FLOOR_DBM {
        return Some(Trigger::RsrpDrop);
    }

    if active.kind() == UplinkKind::Sat {
        if active.satellite.obstructed {
            return Some(Trigger::SatObstruction);
        }
        let eta = active.satellite.obstruction_eta_s;
        if eta > 0 && eta < OBSTRUCTION_ETA_HORIZON_S {
            return Some(Trigger::SatObstruction);
        }
    }

    None
}
