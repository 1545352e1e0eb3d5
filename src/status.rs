/*!
 * Status publisher: the atomic JSON snapshot consumed by the Web UI
 *
 * Written at 10 Hz via write-tmp → fsync → rename, so readers see either
 * the previous or the new snapshot, never a partial one.
 */

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::command::CommandAck;
use crate::error::{Result, SteerError};
use crate::gps::GpsSnapshot;
use crate::uplink::{Uplink, UplinkKind};

/// How often the snapshot is written (ms)
pub const STATUS_INTERVAL_MS: i64 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct GpsStatus {
    pub valid: bool,
    pub lat: f64,
    pub lon: f64,
    pub speed_mph: f64,
    pub heading: f64,
}

impl From<&GpsSnapshot> for GpsStatus {
    fn from(gps: &GpsSnapshot) -> Self {
        Self {
            valid: gps.fix,
            lat: gps.lat,
            lon: gps.lon,
            speed_mph: gps.speed_mph,
            heading: gps.heading,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CellularStatus {
    pub rsrp: f64,
    pub sinr: f64,
    pub carrier: String,
    pub cell_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SatelliteStatus {
    pub state: String,
    pub latency: f64,
    pub obstructed: bool,
    pub obstruction_pct: f64,
    pub eta: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct UplinkStatus {
    pub name: String,
    pub kind: UplinkKind,
    pub enabled: bool,
    pub reachable: bool,
    pub active: bool,
    pub rtt_ms: f64,
    pub rtt_baseline: f64,
    pub loss_pct: f64,
    pub jitter_ms: f64,
    pub risk_now: f64,
    pub consec_fail: u32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cellular: Option<CellularStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub starlink: Option<SatelliteStatus>,
}

impl From<&Uplink> for UplinkStatus {
    fn from(u: &Uplink) -> Self {
        let cellular = (u.kind() == UplinkKind::Lte).then(|| CellularStatus {
            rsrp: u.cellular.rsrp_dbm,
            sinr: u.cellular.sinr_db,
            carrier: u.cellular.carrier.clone(),
            cell_id: u.cellular.cell_id.clone(),
        });
        let starlink = (u.kind() == UplinkKind::Sat).then(|| SatelliteStatus {
            state: u.satellite.state.clone(),
            latency: u.satellite.latency_ms,
            obstructed: u.satellite.obstructed,
            obstruction_pct: u.satellite.obstruction_pct,
            eta: u.satellite.obstruction_eta_s,
        });
        Self {
            name: u.name().to_string(),
            kind: u.kind(),
            enabled: u.enabled,
            reachable: u.reachable,
            active: u.active,
            rtt_ms: u.rtt_ms,
            rtt_baseline: u.rtt_baseline,
            loss_pct: u.loss_pct,
            jitter_ms: u.jitter_ms,
            risk_now: u.risk_now,
            consec_fail: u.consec_fail,
            cellular,
            starlink,
        }
    }
}

/// Complete snapshot of the engine, built copy-on-publish
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub mode: String,
    pub state: String,
    pub trigger: String,
    pub trigger_detail: String,
    pub active_uplink: String,
    pub active_controller: usize,
    pub dup_enabled: bool,
    pub hold_remaining: i64,
    pub clean_remaining: i64,
    pub switches_this_window: u32,
    pub flap_suppressed: bool,
    pub force_locked: bool,
    pub global_risk: f64,
    pub recommendation: String,
    pub run_id: String,
    pub last_cmd: CommandAck,
    pub gps: GpsStatus,
    pub uplinks: Vec<UplinkStatus>,
}

/// Writes snapshots atomically next to a `.tmp` sibling
pub struct StatusPublisher {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl StatusPublisher {
    pub fn new(run_dir: &Path) -> Self {
        Self {
            path: run_dir.join("status.json"),
            tmp_path: run_dir.join("status.json.tmp"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn publish(&self, snapshot: &StatusSnapshot) -> Result<()> {
        let data = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SteerError::Status(format!("serialize: {}", e)))?;

        let mut file = std::fs::File::create(&self.tmp_path)
            .map_err(|e| SteerError::Status(format!("create tmp: {}", e)))?;
        file.write_all(&data)
            .and_then(|_| file.sync_all())
            .map_err(|e| SteerError::Status(format!("write tmp: {}", e)))?;
        drop(file);

        std::fs::rename(&self.tmp_path, &self.path)
            .map_err(|e| SteerError::Status(format!("rename: {}", e)))?;
        Ok(())
    }
}
