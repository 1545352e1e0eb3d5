/*!
 * The steering engine: main loop, state machine, and slow-path arbiter
 *
 * Single-task ownership: the engine owns every mutable piece of state
 * (uplinks, status record, duplication bookkeeping). Probe results arrive
 * over a channel and are folded in at a fixed point in the tick order:
 *
 *   probe-poll → metric-update → tripwire → duplication-enable →
 *   arbiter → route-swap
 *
 * That ordering is the correctness backbone — duplication is installed
 * and settled before a route swap is even contemplated.
 */

pub mod arbiter;
pub mod state;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tracing::{debug, info, warn};

use crate::actuator::{
    mock::MockActuator, DuplicationActuator, EngageState, NamespaceActuator, PathActuator,
    RouteActuator,
};
use crate::command::{self, Command, CommandAck, CommandIngress};
use crate::config::EngineConfig;
use crate::error::{Result, SteerError};
use crate::gps::{self, GpsSnapshot, GPS_INTERVAL_MS};
use crate::logging::{generate_run_id, EventLog};
use crate::metrics;
use crate::probe::dish::{self, DishClient, DishSource, DISH_POLL_INTERVAL_MS};
use crate::probe::modem::{ModemClient, SignalSource, MODEM_QUERY_INTERVAL_MS};
use crate::probe::{chaos, PingProber, ProbePool, ProbeSpec, Prober};
use crate::risk::{self, RISK_INTERVAL_MS};
use crate::status::{GpsStatus, StatusPublisher, StatusSnapshot, UplinkStatus, STATUS_INTERVAL_MS};
use crate::testing::{ScriptedDish, ScriptedProber, StaticSignals};
use crate::tripwire::{self, Trigger};
use crate::uplink::{Uplink, UplinkKind};
use crate::VERSION;

use state::{EngineStatus, OpMode, SteerState};

/// Sleep between loop iterations (ms)
pub const LOOP_SLEEP_MS: u64 = 10;

/// Hard cap on route swaps within one protection window
pub const MAX_SWITCHES_PER_WINDOW: u32 = 3;

/// Deadline for the slow-cadence modem/dish polls
const KIND_POLL_TIMEOUT: Duration = Duration::from_secs(2);

/// Injected implementations of the engine's external seams
pub struct EngineParts {
    pub actuator: Arc<dyn PathActuator>,
    pub prober: Arc<dyn Prober>,
    pub signals: Arc<dyn SignalSource>,
    pub dish: Arc<dyn DishSource>,
}

impl EngineParts {
    /// Production wiring: namespace actuation, ping probes, the persistent
    /// modem client, and the dish HTTP client.
    pub fn production(cfg: &EngineConfig) -> Result<Self> {
        Ok(Self {
            actuator: Arc::new(NamespaceActuator::new(cfg.service_namespace.clone())),
            prober: Arc::new(PingProber),
            signals: Arc::new(ModemClient::new(cfg.modem_socket.clone())),
            dish: Arc::new(DishClient::new()?),
        })
    }

    /// Fully mocked wiring for tests and dry runs.
    pub fn mocked() -> Self {
        Self {
            actuator: Arc::new(MockActuator::new()),
            prober: Arc::new(ScriptedProber::new()),
            signals: Arc::new(StaticSignals::new()),
            dish: Arc::new(ScriptedDish::new()),
        }
    }
}

pub struct Engine {
    cfg: EngineConfig,
    thresholds: tripwire::Thresholds,

    uplinks: Vec<Uplink>,
    status: EngineStatus,
    gps: GpsSnapshot,
    last_cmd: CommandAck,

    /// Last trigger reported while observing in TRAINING mode, so the
    /// telemetry event fires on edges instead of every tick
    observed_trigger: Option<Trigger>,

    actuator: Arc<dyn PathActuator>,
    dup: DuplicationActuator,
    router: RouteActuator,
    pool: ProbePool,
    signals: Arc<dyn SignalSource>,
    dish: Arc<dyn DishSource>,

    ingress: CommandIngress,
    publisher: StatusPublisher,
    events: EventLog,

    last_probe_ms: i64,
    last_gps_ms: i64,
    last_risk_ms: i64,
    last_status_ms: i64,
    modem_last_poll: Vec<i64>,
    dish_last_poll: Vec<i64>,
}

impl Engine {
    /// Build an engine from injected parts. Creates the runtime
    /// directories; the initial active uplink is the first enabled one.
    pub fn new(cfg: EngineConfig, parts: EngineParts, events: EventLog) -> Result<Self> {
        cfg.validate()?;
        std::fs::create_dir_all(&cfg.run_dir)?;
        std::fs::create_dir_all(cfg.run_dir.join("cmdq"))?;

        let mut uplinks: Vec<Uplink> = cfg.uplinks.iter().cloned().map(Uplink::new).collect();
        let active = uplinks
            .iter()
            .position(|u| u.enabled)
            .ok_or_else(|| SteerError::Config("no enabled uplink".into()))?;
        uplinks[active].active = true;

        let count = uplinks.len();
        let far_past = -(1_i64 << 40);
        let run_id = events.run_id().to_string();

        Ok(Self {
            thresholds: tripwire::Thresholds::from(&cfg),
            uplinks,
            status: EngineStatus::new(active, run_id),
            gps: GpsSnapshot::default(),
            last_cmd: CommandAck::default(),
            observed_trigger: None,
            dup: DuplicationActuator::new(parts.actuator.clone()),
            router: RouteActuator::new(parts.actuator.clone()),
            actuator: parts.actuator,
            pool: ProbePool::new(parts.prober, count),
            signals: parts.signals,
            dish: parts.dish,
            ingress: CommandIngress::new(&cfg.run_dir),
            publisher: StatusPublisher::new(&cfg.run_dir),
            events,
            last_probe_ms: far_past,
            last_gps_ms: far_past,
            last_risk_ms: far_past,
            last_status_ms: far_past,
            modem_last_poll: vec![far_past; count],
            dish_last_poll: vec![far_past; count],
            cfg,
        })
    }

    /// Production engine: real actuation and probes, event log under the
    /// configured log directory.
    pub fn production(cfg: EngineConfig) -> Result<Self> {
        let run_id = generate_run_id();
        let events = EventLog::create(&cfg.log_dir, &run_id)?;
        let parts = EngineParts::production(&cfg)?;
        Self::new(cfg, parts, events)
    }

    pub fn status(&self) -> &EngineStatus {
        &self.status
    }

    pub fn uplinks(&self) -> &[Uplink] {
        &self.uplinks
    }

    pub fn uplink(&self, name: &str) -> Option<&Uplink> {
        self.uplinks.iter().find(|u| u.name() == name)
    }

    pub fn last_ack(&self) -> &CommandAck {
        &self.last_cmd
    }

    pub fn duplication_enabled(&self) -> bool {
        self.dup.is_enabled()
    }

    pub fn active_uplink_name(&self) -> &str {
        self.uplinks[self.status.active_uplink].name()
    }

    /// One-time startup actuation: clear stale mirror state and install
    /// the initial service route. Failures are reported, never fatal.
    pub async fn startup(&mut self) {
        let _ = self.actuator.mirror_remove().await;
        self.events.emit("dup_init", json!({"status": "ready"}));

        let active = &self.uplinks[self.status.active_uplink];
        let gw = active.cfg.service_gateway.clone();
        let dev = active.cfg.service_veth.clone();
        match self.router.swap(&gw, &dev).await {
            Ok(true) => {
                self.events
                    .emit("init_route", json!({"vip_dev": dev, "vip_gw": gw}));
            }
            Ok(false) => {
                warn!(dev = %dev, "initial route did not verify");
                self.events
                    .emit("init_route_fail", json!({"vip_dev": dev}));
            }
            Err(e) => {
                warn!(error = %e, "initial route install failed");
                self.events
                    .emit("init_route_fail", json!({"vip_dev": dev, "reason": e.to_string()}));
            }
        }

        info!(
            run_id = %self.status.run_id,
            node = %self.cfg.node_id,
            uplinks = self.uplinks.len(),
            "steering engine up"
        );
        self.events.emit(
            "startup",
            json!({
                "version": VERSION,
                "run_id": self.status.run_id,
                "node": self.cfg.node_id,
                "service_prefix": self.cfg.service_prefix,
            }),
        );
    }

    /// Run the main loop until the shutdown flag flips.
    pub async fn run(&mut self, mut shutdown: tokio::sync::watch::Receiver<bool>) -> Result<()> {
        self.startup().await;
        let started = std::time::Instant::now();

        loop {
            if *shutdown.borrow() {
                break;
            }
            let now_ms = started.elapsed().as_millis() as i64;
            self.tick(now_ms).await;

            tokio::select! {
                _ = tokio::time::sleep(Duration::from_millis(LOOP_SLEEP_MS)) => {}
                _ = shutdown.changed() => {}
            }
        }

        self.shutdown_cleanup().await;
        Ok(())
    }

    async fn shutdown_cleanup(&mut self) {
        let was_enabled = self.dup.is_enabled();
        if let Err(e) = self.dup.disable().await {
            warn!(error = %e, "mirror teardown failed during shutdown");
        } else if was_enabled {
            self.events.emit("dup_disable", json!({"status": "disabled"}));
        }
        self.events
            .emit("shutdown", json!({"run_id": self.status.run_id}));
        info!(run_id = %self.status.run_id, "steering engine down");
    }

    /// One loop iteration at engine time `now_ms`. The phase order within
    /// a tick is fixed. Component failures are absorbed, never propagated.
    pub async fn tick(&mut self, now_ms: i64) {
        // Phase 1: probe poll — fold in completed probes, launch the next
        // cycle, refresh kind-specific telemetry.
        for (idx, rtt) in self.pool.drain() {
            let draw = rand::random::<f64>() * 2.0 - 1.0;
            metrics::ingest(&mut self.uplinks[idx], rtt, draw, now_ms);
        }

        if now_ms - self.last_probe_ms >= self.cfg.probe_interval_ms() {
            self.last_probe_ms = now_ms;
            let chaos_map = chaos::read(&self.cfg.chaos_path());
            for u in &mut self.uplinks {
                u.chaos = chaos_map.get(u.name()).copied().unwrap_or_default();
            }
            for idx in 0..self.uplinks.len() {
                if !self.uplinks[idx].enabled {
                    continue;
                }
                let spec = self.probe_spec(idx);
                self.pool.kick(idx, spec);
            }
        }

        self.poll_kind_sources(now_ms).await;

        // Phase 2: GPS snapshot at 1 Hz
        if self.cfg.gps_enabled && now_ms - self.last_gps_ms >= GPS_INTERVAL_MS {
            self.last_gps_ms = now_ms;
            if let Some(snapshot) = gps::read(&self.cfg.gps_path()) {
                self.gps = snapshot;
            }
        }

        // Phase 3: risk scoring at 4 Hz
        if now_ms - self.last_risk_ms >= RISK_INTERVAL_MS {
            self.last_risk_ms = now_ms;
            self.risk_tick();
        }

        // Phase 4: tripwire and the protection state machine
        self.state_tick(now_ms).await;

        // Phase 5: operator commands
        self.command_tick(now_ms).await;

        // Phase 6: status snapshot at 10 Hz
        if now_ms - self.last_status_ms >= STATUS_INTERVAL_MS {
            self.last_status_ms = now_ms;
            let snapshot = self.snapshot();
            if let Err(e) = self.publisher.publish(&snapshot) {
                warn!(error = %e, "status publish failed");
            }
        }
    }

    fn probe_spec(&self, idx: usize) -> ProbeSpec {
        let u = &self.uplinks[idx];
        let target = match u.kind() {
            UplinkKind::Lte => self.cfg.controller_probe_addr.clone(),
            _ => self.cfg.resolver_probe_addr.clone(),
        };
        ProbeSpec {
            uplink: u.name().to_string(),
            kind: u.kind(),
            interface: u.cfg.interface.clone(),
            namespace: u.cfg.namespace.clone(),
            target,
        }
    }

    /// Slow-cadence kind-specific telemetry. A failed query keeps the
    /// prior values; telemetry failures never mark an uplink unreachable.
    async fn poll_kind_sources(&mut self, now_ms: i64) {
        for idx in 0..self.uplinks.len() {
            if !self.uplinks[idx].enabled {
                continue;
            }
            match self.uplinks[idx].kind() {
                UplinkKind::Lte => {
                    if now_ms - self.modem_last_poll[idx] < MODEM_QUERY_INTERVAL_MS {
                        continue;
                    }
                    self.modem_last_poll[idx] = now_ms;
                    let modem_id = self.uplinks[idx].cfg.identifier.clone();
                    let signals = self.signals.clone();
                    match tokio::time::timeout(KIND_POLL_TIMEOUT, signals.query(&modem_id)).await {
                        Ok(Ok(reading)) => {
                            let cell = &mut self.uplinks[idx].cellular;
                            cell.rsrp_dbm = reading.rsrp_dbm;
                            cell.rsrq_db = reading.rsrq_db;
                            cell.sinr_db = reading.sinr_db;
                            cell.rssi_dbm = reading.rssi_dbm;
                            cell.connected = reading.connected;
                            if !reading.carrier.is_empty() {
                                cell.carrier = reading.carrier;
                            }
                            if !reading.cell_id.is_empty() {
                                cell.cell_id = reading.cell_id;
                            }
                            if !reading.band.is_empty() {
                                cell.band = reading.band;
                            }
                            if !reading.tac.is_empty() {
                                cell.tac = reading.tac;
                            }
                        }
                        Ok(Err(e)) => {
                            debug!(uplink = %self.uplinks[idx].name(), error = %e, "modem query failed")
                        }
                        Err(_) => {
                            debug!(uplink = %self.uplinks[idx].name(), "modem query timed out")
                        }
                    }
                }
                UplinkKind::Sat => {
                    if now_ms - self.dish_last_poll[idx] < DISH_POLL_INTERVAL_MS {
                        continue;
                    }
                    self.dish_last_poll[idx] = now_ms;
                    let endpoint = self.uplinks[idx].cfg.identifier.clone();
                    if endpoint.is_empty() {
                        continue;
                    }
                    let dish = self.dish.clone();
                    match tokio::time::timeout(KIND_POLL_TIMEOUT, dish.stats(&endpoint)).await {
                        Ok(Ok(reading)) => dish::apply(&reading, &mut self.uplinks[idx].satellite),
                        _ => {
                            // Dish API unreachable; telemetry keeps its
                            // last values, only the reachability flag of
                            // the dish itself drops.
                            self.uplinks[idx].satellite.connected = false;
                        }
                    }
                }
                UplinkKind::Fiber => {}
            }
        }
    }

    fn risk_tick(&mut self) {
        for u in &mut self.uplinks {
            if !u.enabled {
                continue;
            }
            u.risk_now = risk::score(u);
        }
        self.status.global_risk = self.uplinks[self.status.active_uplink].risk_now;
        self.status.recommendation = risk::recommend(self.status.global_risk);
    }

    async fn state_tick(&mut self, now_ms: i64) {
        if self.status.mode == OpMode::Training {
            // Observe only: the tripwire is evaluated for telemetry but
            // nothing actuates and the state machine is frozen.
            if matches!(self.status.state, SteerState::Normal | SteerState::Prepare) {
                let active = &self.uplinks[self.status.active_uplink];
                let trigger = tripwire::check(active, &self.thresholds);
                if trigger != self.observed_trigger {
                    if let Some(t) = trigger {
                        self.events
                            .emit("tripwire_observed", json!({"trigger": t.as_str()}));
                    }
                    self.observed_trigger = trigger;
                }
            }
            return;
        }

        match self.status.state {
            SteerState::Normal | SteerState::Prepare => {
                let active = &self.uplinks[self.status.active_uplink];
                if let Some(trigger) = tripwire::check(active, &self.thresholds) {
                    self.tripwire_fire(trigger, trigger.as_str(), now_ms).await;
                }
            }
            SteerState::Protect => {
                // Both gates must pass before arbitration: the mirror
                // settle period (when a mirror is up) and the preroll.
                let engaged = match self
                    .dup
                    .try_engage(now_ms, self.cfg.dup_settle_ms as i64)
                {
                    EngageState::Disabled => true,
                    EngageState::Settling => false,
                    EngageState::Engaged { newly } => {
                        if newly {
                            let settle =
                                self.dup.engaged_at_ms().unwrap_or(now_ms)
                                    - self.dup.enabled_at_ms().unwrap_or(now_ms);
                            self.events
                                .emit("dup_engaged", json!({"settle_ms": settle}));
                        }
                        true
                    }
                };
                let preroll_done = self
                    .status
                    .protect_start_ms
                    .map(|start| now_ms - start >= self.cfg.preroll_ms as i64)
                    .unwrap_or(true);
                if engaged && preroll_done {
                    self.status.state = SteerState::Switching;
                }
            }
            SteerState::Switching | SteerState::Holding => {}
        }

        if matches!(
            self.status.state,
            SteerState::Switching | SteerState::Holding
        ) {
            self.arbitrate(now_ms).await;
        }

        if self.status.state.in_protection() {
            self.protection_tick(now_ms).await;
        }
    }

    /// Fast path: enable duplication toward a backup, then open the
    /// protection window. Idempotent while protection is already open.
    async fn tripwire_fire(&mut self, trigger: Trigger, detail: &str, now_ms: i64) {
        if self.status.state.in_protection() {
            return;
        }

        if let Some(backup) = self.pick_backup() {
            let active_dev = self.uplinks[self.status.active_uplink]
                .cfg
                .service_veth
                .clone();
            let backup_dev = self.uplinks[backup].cfg.service_veth.clone();
            let backup_gw = self.uplinks[backup].cfg.service_gateway.clone();
            match self
                .dup
                .enable(now_ms, &active_dev, &backup_dev, &backup_gw)
                .await
            {
                Ok(()) => self.events.emit(
                    "dup_enable",
                    json!({"src": active_dev, "dst": backup_dev, "gw": backup_gw}),
                ),
                Err(e) => {
                    // Protection proceeds unmirrored
                    warn!(error = %e, "mirror install failed");
                    self.events
                        .emit("dup_enable_fail", json!({"reason": e.to_string()}));
                }
            }
        } else {
            debug!("no backup uplink available to mirror onto");
        }

        self.status.state = SteerState::Protect;
        self.status.last_trigger = Some(trigger);
        self.status.trigger_detail = detail.to_string();
        self.status.protect_start_ms = Some(now_ms);
        self.status.switches_in_window = 0;
        self.status.last_clean_ms = None;
        self.status.flap_suppressed = false;

        info!(trigger = trigger.as_str(), detail, "tripwire fired");
        self.events.emit(
            "tripwire_fire",
            json!({"trigger": trigger.as_str(), "detail": detail}),
        );
    }

    /// First enabled, reachable uplink scanning upward from the active
    /// index (wrapping); the mirror destination.
    fn pick_backup(&self) -> Option<usize> {
        let n = self.uplinks.len();
        (1..n)
            .map(|offset| (self.status.active_uplink + offset) % n)
            .find(|&idx| self.uplinks[idx].enabled && self.uplinks[idx].reachable)
    }

    /// Slow path: pick the best uplink and move the route, capped at
    /// [`MAX_SWITCHES_PER_WINDOW`] swaps per protection window.
    async fn arbitrate(&mut self, now_ms: i64) {
        if self.status.switches_in_window >= MAX_SWITCHES_PER_WINDOW {
            if !self.status.flap_suppressed {
                self.status.flap_suppressed = true;
                self.events.emit(
                    "flap_suppressed",
                    json!({"switches": self.status.switches_in_window}),
                );
            }
            if self.status.state == SteerState::Switching {
                self.status.state = SteerState::Holding;
            }
            return;
        }

        let target = arbiter::select_best(
            &self.uplinks,
            self.status.active_uplink,
            self.status.force_locked,
        );

        if target == self.status.active_uplink {
            if self.status.state == SteerState::Switching {
                self.status.state = SteerState::Holding;
            }
            return;
        }

        if self.execute_switch(target, now_ms).await {
            if self.status.state == SteerState::Switching {
                self.status.state = SteerState::Holding;
            }
        }
        // On a failed swap the state is left unchanged so the next tick
        // retries the arbitration.
    }

    /// Replace the service route toward `target` and verify the readback.
    /// State advances only on verified success.
    async fn execute_switch(&mut self, target: usize, _now_ms: i64) -> bool {
        let old = self.status.active_uplink;
        let from = self.uplinks[old].name().to_string();
        let to = self.uplinks[target].name().to_string();
        let gw = self.uplinks[target].cfg.service_gateway.clone();
        let dev = self.uplinks[target].cfg.service_veth.clone();

        self.events.emit(
            "switch",
            json!({"from": from, "to": to, "vip_dev": dev, "vip_gw": gw}),
        );

        let verified = match self.router.swap(&gw, &dev).await {
            Ok(true) => true,
            Ok(false) => {
                self.events.emit(
                    "switch_fail",
                    json!({"target": to, "vip_dev": dev, "reason": "route_verify_failed"}),
                );
                false
            }
            Err(e) => {
                self.events.emit(
                    "switch_fail",
                    json!({"target": to, "vip_dev": dev, "reason": e.to_string()}),
                );
                false
            }
        };
        if !verified {
            warn!(target = %to, "route swap did not verify");
            return false;
        }

        // Fire-and-forget the controller-side return-route switch
        let actuator = self.actuator.clone();
        let uplink_name = to.clone();
        tokio::spawn(async move {
            if let Err(e) = actuator.return_route_switch(&uplink_name).await {
                debug!(error = %e, "return-route switch failed");
            }
        });

        self.uplinks[old].active = false;
        self.uplinks[target].active = true;
        self.status.active_uplink = target;
        self.status.switches_in_window += 1;

        info!(from = %from, to = %to, "service route moved");
        self.events
            .emit("switch_ok", json!({"from": from, "to": to, "vip_dev": dev}));
        true
    }

    /// Hold/clean accounting while the protection window is open, and the
    /// exit to NORMAL once both timers are satisfied.
    async fn protection_tick(&mut self, now_ms: i64) {
        let Some(start) = self.status.protect_start_ms else {
            return;
        };
        let protect_elapsed_sec = (now_ms - start) / 1000;
        self.status.hold_remaining_sec =
            (self.cfg.min_hold_sec as i64 - protect_elapsed_sec).max(0);

        let active = &self.uplinks[self.status.active_uplink];
        let clean = active.consec_fail == 0
            && active.rtt_ms < active.rtt_baseline + 30.0
            && active.loss_pct < 2.0;

        if !clean {
            self.status.last_clean_ms = None;
            self.status.clean_remaining_sec = self.cfg.clean_exit_sec as i64;
            return;
        }

        let clean_since = *self.status.last_clean_ms.get_or_insert(now_ms);
        let clean_sec = (now_ms - clean_since) / 1000;
        self.status.clean_remaining_sec = (self.cfg.clean_exit_sec as i64 - clean_sec).max(0);

        if protect_elapsed_sec >= self.cfg.min_hold_sec as i64
            && clean_sec >= self.cfg.clean_exit_sec as i64
        {
            if self.status.mode != OpMode::Mirror {
                let was_enabled = self.dup.is_enabled();
                if let Err(e) = self.dup.disable().await {
                    warn!(error = %e, "mirror teardown failed");
                } else if was_enabled {
                    self.events.emit("dup_disable", json!({"status": "disabled"}));
                }
            }
            self.status.state = SteerState::Normal;
            self.status.last_trigger = None;
            self.status.trigger_detail.clear();
            self.status.protect_start_ms = None;
            self.status.hold_remaining_sec = 0;
            self.status.clean_remaining_sec = 0;

            info!(
                duration_sec = protect_elapsed_sec,
                clean_sec, "protection window closed"
            );
            self.events.emit(
                "protection_exit",
                json!({"duration_sec": protect_elapsed_sec, "clean_sec": clean_sec}),
            );
        }
    }

    async fn command_tick(&mut self, now_ms: i64) {
        for (id, line) in self.ingress.drain() {
            let ack = match command::parse(&line) {
                Some(cmd) => self.apply_command(cmd, &id, now_ms).await,
                None => CommandAck::fail(&id, "unknown_cmd"),
            };
            self.events.emit(
                "cmd_result",
                json!({"id": ack.id, "result": ack.result, "detail": ack.detail}),
            );
            self.last_cmd = ack;
        }
    }

    async fn apply_command(&mut self, cmd: Command, id: &str, now_ms: i64) -> CommandAck {
        match cmd {
            Command::Mode(mode) => {
                self.status.mode = mode;
                match mode {
                    OpMode::Training => {
                        let was_enabled = self.dup.is_enabled();
                        if self.dup.disable().await.is_ok() && was_enabled {
                            self.events.emit("dup_disable", json!({"status": "disabled"}));
                        }
                    }
                    OpMode::Mirror => {
                        if let Some(backup) = self.pick_backup() {
                            let active_dev = self.uplinks[self.status.active_uplink]
                                .cfg
                                .service_veth
                                .clone();
                            let backup_dev = self.uplinks[backup].cfg.service_veth.clone();
                            let backup_gw = self.uplinks[backup].cfg.service_gateway.clone();
                            match self
                                .dup
                                .enable(now_ms, &active_dev, &backup_dev, &backup_gw)
                                .await
                            {
                                Ok(()) => self.events.emit(
                                    "dup_enable",
                                    json!({"src": active_dev, "dst": backup_dev, "gw": backup_gw}),
                                ),
                                Err(e) => self
                                    .events
                                    .emit("dup_enable_fail", json!({"reason": e.to_string()})),
                            }
                        }
                    }
                    OpMode::Tripwire => {}
                }
                self.events
                    .emit("mode_change", json!({"mode": mode.as_str()}));
                CommandAck::exec(id, format!("mode={}", mode.as_str()))
            }

            Command::Force(name) => {
                let Some(idx) = self.uplinks.iter().position(|u| u.name() == name) else {
                    return CommandAck::fail(id, format!("force={}", name));
                };
                self.uplinks[idx].force_failed = false;
                self.uplinks[idx].reachable = true;
                if idx != self.status.active_uplink {
                    self.execute_switch(idx, now_ms).await;
                }
                self.status.force_locked = true;
                CommandAck::exec(id, format!("force={}", name))
            }

            Command::ForceAuto => {
                self.status.force_locked = false;
                self.status.switches_in_window = 0;
                self.status.flap_suppressed = false;
                self.status.state = SteerState::Normal;
                self.status.protect_start_ms = None;
                let best = arbiter::select_best(&self.uplinks, self.status.active_uplink, false);
                if best != self.status.active_uplink {
                    self.execute_switch(best, now_ms).await;
                }
                CommandAck::exec(id, "force=auto")
            }

            Command::Trigger => {
                if self.status.mode == OpMode::Training {
                    self.events
                        .emit("tripwire_observed", json!({"trigger": "manual"}));
                } else {
                    self.tripwire_fire(Trigger::Manual, "operator", now_ms).await;
                }
                CommandAck::exec(id, "manual_trigger")
            }

            Command::Enable(name) => {
                let Some(idx) = self.uplinks.iter().position(|u| u.name() == name) else {
                    return CommandAck::fail(id, format!("enable={}", name));
                };
                self.uplinks[idx].enabled = true;
                self.events.emit("uplink_enabled", json!({"uplink": name}));
                CommandAck::exec(id, format!("enable={}", name))
            }

            Command::Disable(name) => {
                let Some(idx) = self.uplinks.iter().position(|u| u.name() == name) else {
                    return CommandAck::fail(id, format!("disable={}", name));
                };
                self.uplinks[idx].enabled = false;
                self.events.emit("uplink_disabled", json!({"uplink": name}));
                CommandAck::exec(id, format!("disable={}", name))
            }

            Command::Fail(name) => {
                let Some(idx) = self.uplinks.iter().position(|u| u.name() == name) else {
                    return CommandAck::fail(id, format!("fail={}", name));
                };
                self.uplinks[idx].reachable = false;
                self.uplinks[idx].force_failed = true;
                self.uplinks[idx].consec_fail = 10;
                self.events.emit("uplink_force_fail", json!({"uplink": name}));
                CommandAck::exec(id, format!("fail={}", name))
            }

            Command::Unfail(name) => {
                let Some(idx) = self.uplinks.iter().position(|u| u.name() == name) else {
                    return CommandAck::fail(id, format!("unfail={}", name));
                };
                self.uplinks[idx].force_failed = false;
                self.uplinks[idx].reachable = true;
                self.uplinks[idx].consec_fail = 0;
                self.events.emit("uplink_unfail", json!({"uplink": name}));
                CommandAck::exec(id, format!("unfail={}", name))
            }

            Command::Controller(controller) => {
                self.events
                    .emit("c8000_switch", json!({"controller": controller}));
                match self.actuator.controller_switch(controller).await {
                    Ok(()) => self.status.active_controller = controller,
                    Err(e) => warn!(error = %e, "controller switch failed"),
                }
                CommandAck::exec(id, format!("c8000={}", controller))
            }
        }
    }

    /// Build the published snapshot (copy-on-publish).
    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            mode: self.status.mode.as_str().to_string(),
            state: self.status.state.as_str().to_string(),
            trigger: self
                .status
                .last_trigger
                .map(|t| t.as_str())
                .unwrap_or("none")
                .to_string(),
            trigger_detail: self.status.trigger_detail.clone(),
            active_uplink: self.active_uplink_name().to_string(),
            active_controller: self.status.active_controller,
            dup_enabled: self.dup.is_enabled(),
            hold_remaining: self.status.hold_remaining_sec,
            clean_remaining: self.status.clean_remaining_sec,
            switches_this_window: self.status.switches_in_window,
            flap_suppressed: self.status.flap_suppressed,
            force_locked: self.status.force_locked,
            global_risk: self.status.global_risk,
            recommendation: self.status.recommendation.as_str().to_string(),
            run_id: self.status.run_id.clone(),
            last_cmd: self.last_cmd.clone(),
            gps: GpsStatus::from(&self.gps),
            uplinks: self.uplinks.iter().map(UplinkStatus::from).collect(),
        }
    }

    /// Path of the status snapshot this engine publishes.
    pub fn status_path(&self) -> &Path {
        self.publisher.path()
    }
}
