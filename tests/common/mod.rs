//! Shared harness for engine integration tests: a fully mocked engine
//! driven tick-by-tick over a synthetic timeline.
#![allow(dead_code)] // each test binary uses a different slice of the harness

use std::sync::Arc;

use pathsteer::actuator::mock::MockActuator;
use pathsteer::config::{EngineConfig, UplinkConfig};
use pathsteer::engine::{Engine, EngineParts};
use pathsteer::logging::EventLog;
use pathsteer::testing::{ScriptedDish, ScriptedProber, StaticSignals};
use pathsteer::uplink::UplinkKind;

pub const RUN_ID: &str = "20260101_120000";

pub fn fiber(name: &str, gw: &str) -> UplinkConfig {
    let mut u = UplinkConfig::named(name, UplinkKind::Fiber);
    u.service_gateway = gw.to_string();
    u
}

pub fn lte(name: &str, gw: &str, modem: &str) -> UplinkConfig {
    let mut u = UplinkConfig::named(name, UplinkKind::Lte);
    u.service_gateway = gw.to_string();
    u.identifier = modem.to_string();
    u.interface = format!("wwan_{}", name);
    u
}

pub fn sat(name: &str, gw: &str, endpoint: &str) -> UplinkConfig {
    let mut u = UplinkConfig::named(name, UplinkKind::Sat);
    u.service_gateway = gw.to_string();
    u.identifier = endpoint.to_string();
    u
}

pub struct Harness {
    pub engine: Engine,
    pub actuator: Arc<MockActuator>,
    pub prober: Arc<ScriptedProber>,
    pub signals: Arc<StaticSignals>,
    pub dish: Arc<ScriptedDish>,
    pub dir: tempfile::TempDir,
    pub now_ms: i64,
}

impl Harness {
    pub async fn new(uplinks: Vec<UplinkConfig>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let cfg = EngineConfig {
            run_dir: dir.path().join("run"),
            log_dir: dir.path().join("logs"),
            uplinks,
            ..Default::default()
        };

        let actuator = Arc::new(MockActuator::new());
        let prober = Arc::new(ScriptedProber::new());
        let signals = Arc::new(StaticSignals::new());
        let dish = Arc::new(ScriptedDish::new());

        let events = EventLog::create(&cfg.log_dir, RUN_ID).unwrap();
        let parts = EngineParts {
            actuator: actuator.clone(),
            prober: prober.clone(),
            signals: signals.clone(),
            dish: dish.clone(),
        };
        let mut engine = Engine::new(cfg, parts, events).unwrap();
        engine.startup().await;

        Self {
            engine,
            actuator,
            prober,
            signals,
            dish,
            dir,
            now_ms: 0,
        }
    }

    /// Drive the engine forward by `duration_ms` of synthetic time in
    /// 10 ms ticks, yielding between ticks so probe tasks complete.
    pub async fn advance(&mut self, duration_ms: i64) {
        let target = self.now_ms + duration_ms;
        while self.now_ms < target {
            self.engine.tick(self.now_ms).await;
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            self.now_ms += 10;
        }
    }

    /// Drop a command file into the queue; processed on the next tick.
    pub fn write_cmd(&self, seq: u32, line: &str) {
        let path = self
            .dir
            .path()
            .join("run/cmdq")
            .join(format!("{:010}-t.cmd", seq));
        std::fs::write(path, format!("{}\n", line)).unwrap();
    }

    /// Replace the chaos injection file.
    pub fn chaos(&self, contents: &str) {
        std::fs::write(self.dir.path().join("run/chaos.json"), contents).unwrap();
    }

    pub fn clear_chaos(&self) {
        let _ = std::fs::remove_file(self.dir.path().join("run/chaos.json"));
    }

    /// Parsed event-log lines emitted so far.
    pub fn events(&self) -> Vec<serde_json::Value> {
        let path = self
            .dir
            .path()
            .join("logs")
            .join(format!("pathsteer_{}.jsonl", RUN_ID));
        let Ok(contents) = std::fs::read_to_string(path) else {
            return Vec::new();
        };
        contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    /// Names of events in emission order.
    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e["event"].as_str().unwrap().to_string())
            .collect()
    }

    /// Index of the first event with this name, if any.
    pub fn event_index(&self, name: &str) -> Option<usize> {
        self.event_names().iter().position(|e| e == name)
    }

    /// Assert the published-snapshot invariant: exactly one active uplink.
    pub fn assert_single_active(&self) {
        let snap = self.engine.snapshot();
        assert_eq!(
            snap.uplinks.iter().filter(|u| u.active).count(),
            1,
            "exactly one uplink must be active"
        );
    }
}
