/*!
 * Configuration types for the Edge engine
 *
 * The on-disk contract is JSON (`/etc/pathsteer/config.json`). Every field
 * has a default tuned for mobile/vehicle scenarios, so a minimal config
 * file is valid.
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, SteerError};
use crate::uplink::UplinkKind;

/// Per-uplink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UplinkConfig {
    /// Canonical uplink name ("cell_a", "sl_b", "fa", ...)
    pub name: String,

    /// Uplink kind: lte, sat, fiber
    pub kind: UplinkKind,

    /// Participates in steering
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Physical interface ("wwan0", "enp3s0", ...)
    #[serde(default)]
    pub interface: String,

    /// Network namespace owning this uplink ("ns_cell_a", ...)
    #[serde(default)]
    pub namespace: String,

    /// Egress veth into the uplink namespace
    #[serde(default)]
    pub veth: String,

    /// Service-gateway veth inside the service namespace ("vip_cell_a", ...)
    #[serde(default)]
    pub service_veth: String,

    /// Next-hop gateway for the service veth
    #[serde(default)]
    pub service_gateway: String,

    /// Kind-specific identifier: modem index for LTE, dish stats URL for SAT
    #[serde(default)]
    pub identifier: String,
}

impl UplinkConfig {
    /// Build a config with conventional names derived from the uplink name.
    /// Used for the default roster and in tests.
    pub fn named(name: &str, kind: UplinkKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            enabled: true,
            interface: String::new(),
            namespace: format!("ns_{}", name),
            veth: format!("veth_{}", name),
            service_veth: format!("vip_{}", name),
            service_gateway: String::new(),
            identifier: String::new(),
        }
    }
}

/// Main configuration for the steering engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Node identity, carried in the startup event
    #[serde(default = "default_node_id")]
    pub node_id: String,

    /// Runtime directory: status snapshot, command queue, gps/chaos files
    #[serde(default = "default_run_dir")]
    pub run_dir: PathBuf,

    /// Event log directory (JSONL, one file per run)
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,

    /// Reachability probe rate per uplink (Hz)
    #[serde(default = "default_sample_rate_hz")]
    pub sample_rate_hz: u32,

    /// RTT step over baseline that fires the tripwire (ms)
    #[serde(default = "default_rtt_step_threshold_ms")]
    pub rtt_step_threshold_ms: f64,

    /// Window the RTT step is evaluated over (ms)
    #[serde(default = "default_rtt_step_window_ms")]
    pub rtt_step_window_ms: u64,

    /// Consecutive probe misses that fire the tripwire
    #[serde(default = "default_probe_miss_count")]
    pub probe_miss_count: u32,

    /// Window the probe-miss count is evaluated over (ms)
    #[serde(default = "default_probe_miss_window_ms")]
    pub probe_miss_window_ms: u64,

    /// LTE RSRP drop threshold (dB)
    #[serde(default = "default_rsrp_drop_threshold_db")]
    pub rsrp_drop_threshold_db: f64,

    /// LTE SINR drop threshold (dB)
    #[serde(default = "default_sinr_drop_threshold_db")]
    pub sinr_drop_threshold_db: f64,

    /// Delay between tripwire fire and the first switch attempt (ms)
    #[serde(default = "default_preroll_ms")]
    pub preroll_ms: u64,

    /// Minimum delay between enabling duplication and a route swap (ms)
    #[serde(default = "default_dup_settle_ms")]
    pub dup_settle_ms: u64,

    /// Minimum time in protection before a clean exit (s)
    #[serde(default = "default_min_hold_sec")]
    pub min_hold_sec: u64,

    /// Continuous clean time required to exit protection (s)
    #[serde(default = "default_clean_exit_sec")]
    pub clean_exit_sec: u64,

    /// Read the GPS snapshot file at 1 Hz
    #[serde(default = "default_true")]
    pub gps_enabled: bool,

    /// Service prefix carried by the virtual service address
    #[serde(default = "default_service_prefix")]
    pub service_prefix: String,

    /// Network namespace holding the service VIP routing
    #[serde(default = "default_service_namespace")]
    pub service_namespace: String,

    /// Probe target for LTE uplinks (controller public address, probed on
    /// the raw physical interface to measure the radio leg)
    #[serde(default = "default_controller_probe_addr")]
    pub controller_probe_addr: String,

    /// Probe target for SAT/FIBER uplinks (well-known reachability address,
    /// probed inside the uplink namespace)
    #[serde(default = "default_resolver_probe_addr")]
    pub resolver_probe_addr: String,

    /// Unix socket of the persistent modem query channel
    #[serde(default = "default_modem_socket")]
    pub modem_socket: PathBuf,

    /// Uplink roster
    #[serde(default = "default_uplinks")]
    pub uplinks: Vec<UplinkConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            run_dir: default_run_dir(),
            log_dir: default_log_dir(),
            sample_rate_hz: default_sample_rate_hz(),
            rtt_step_threshold_ms: default_rtt_step_threshold_ms(),
            rtt_step_window_ms: default_rtt_step_window_ms(),
            probe_miss_count: default_probe_miss_count(),
            probe_miss_window_ms: default_probe_miss_window_ms(),
            rsrp_drop_threshold_db: default_rsrp_drop_threshold_db(),
            sinr_drop_threshold_db: default_sinr_drop_threshold_db(),
            preroll_ms: default_preroll_ms(),
            dup_settle_ms: default_dup_settle_ms(),
            min_hold_sec: default_min_hold_sec(),
            clean_exit_sec: default_clean_exit_sec(),
            gps_enabled: true,
            service_prefix: default_service_prefix(),
            service_namespace: default_service_namespace(),
            controller_probe_addr: default_controller_probe_addr(),
            resolver_probe_addr: default_resolver_probe_addr(),
            modem_socket: default_modem_socket(),
            uplinks: default_uplinks(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file. Any failure here is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SteerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: EngineConfig = serde_json::from_str(&contents).map_err(|e| {
            SteerError::Config(format!("cannot parse {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_rate_hz == 0 {
            return Err(SteerError::Config("sample_rate_hz must be > 0".into()));
        }
        if self.uplinks.is_empty() {
            return Err(SteerError::Config("at least one uplink required".into()));
        }
        if !self.uplinks.iter().any(|u| u.enabled) {
            return Err(SteerError::Config("at least one enabled uplink required".into()));
        }
        let mut names: Vec<&str> = self.uplinks.iter().map(|u| u.name.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        if names.len() != self.uplinks.len() {
            return Err(SteerError::Config("duplicate uplink names".into()));
        }
        Ok(())
    }

    /// Interval between probe cycles, derived from the sample rate
    pub fn probe_interval_ms(&self) -> i64 {
        (1000 / self.sample_rate_hz.max(1)) as i64
    }

    /// Path of the status snapshot file
    pub fn status_path(&self) -> PathBuf {
        self.run_dir.join("status.json")
    }

    pub fn gps_path(&self) -> PathBuf {
        self.run_dir.join("gps.json")
    }

    pub fn chaos_path(&self) -> PathBuf {
        self.run_dir.join("chaos.json")
    }
}

// Default value functions for serde

fn default_true() -> bool {
    true
}

fn default_node_id() -> String {
    "edge".to_string()
}

fn default_run_dir() -> PathBuf {
    PathBuf::from("/run/pathsteer")
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("/var/lib/pathsteer/logs")
}

fn default_sample_rate_hz() -> u32 {
    10
}

fn default_rtt_step_threshold_ms() -> f64 {
    80.0
}

fn default_rtt_step_window_ms() -> u64 {
    200
}

fn default_probe_miss_count() -> u32 {
    2
}

fn default_probe_miss_window_ms() -> u64 {
    300
}

fn default_rsrp_drop_threshold_db() -> f64 {
    8.0
}

fn default_sinr_drop_threshold_db() -> f64 {
    6.0
}

fn default_preroll_ms() -> u64 {
    500
}

fn default_dup_settle_ms() -> u64 {
    50
}

fn default_min_hold_sec() -> u64 {
    3
}

fn default_clean_exit_sec() -> u64 {
    2
}

fn default_service_prefix() -> String {
    "104.204.136.48/28".to_string()
}

fn default_service_namespace() -> String {
    "ns_vip".to_string()
}

fn default_controller_probe_addr() -> String {
    "104.204.136.13".to_string()
}

fn default_resolver_probe_addr() -> String {
    "8.8.8.8".to_string()
}

fn default_modem_socket() -> PathBuf {
    PathBuf::from("/run/pathsteer/modem.sock")
}

/// The conventional six-uplink roster. Interfaces and gateways follow the
/// fleet wiring; override any of it in the config file.
fn default_uplinks() -> Vec<UplinkConfig> {
    let rows: [(&str, UplinkKind, &str, &str, &str); 6] = [
        ("cell_a", UplinkKind::Lte, "wwan0", "10.201.10.18", "0"),
        ("cell_b", UplinkKind::Lte, "wwan1", "10.201.10.22", "1"),
        (
            "sl_a",
            UplinkKind::Sat,
            "enp3s0",
            "10.201.10.10",
            "http://192.168.100.1/status",
        ),
        (
            "sl_b",
            UplinkKind::Sat,
            "enp4s0",
            "10.201.10.14",
            "http://192.168.100.1/status",
        ),
        ("fa", UplinkKind::Fiber, "enp1s0", "10.201.10.2", ""),
        ("fb", UplinkKind::Fiber, "enp2s0", "10.201.10.6", ""),
    ];

    rows.iter()
        .map(|(name, kind, iface, gw, ident)| {
            let mut u = UplinkConfig::named(name, *kind);
            u.interface = iface.to_string();
            u.service_gateway = gw.to_string();
            u.identifier = ident.to_string();
            u
        })
        .collect()
}
