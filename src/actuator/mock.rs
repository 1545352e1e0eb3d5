//! Recording actuator for tests
//!
//! Mirrors the shape of the production actuator without touching the
//! kernel: route state lives in memory, calls are recorded in order, and
//! failures can be injected (mirror install failure, route-replace
//! attempts that silently do not take, which the verification readback
//! then catches).

use async_trait::async_trait;
use std::sync::Mutex;

use super::{DefaultRoute, PathActuator};
use crate::error::{Result, SteerError};

#[derive(Debug, Default)]
struct MockState {
    route: Option<DefaultRoute>,
    mirror: Option<(String, String, String)>,
    calls: Vec<String>,
    fail_mirror_install: bool,
    /// Number of upcoming route_replace calls that will silently not take
    ignore_route_replaces: u32,
    controller: Option<usize>,
    return_routes: Vec<String>,
}

#[derive(Default)]
pub struct MockActuator {
    state: Mutex<MockState>,
}

impl MockActuator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` route_replace calls silently fail to take effect.
    pub fn ignore_route_replaces(&self, n: u32) {
        self.state.lock().unwrap().ignore_route_replaces = n;
    }

    pub fn fail_mirror_install(&self, fail: bool) {
        self.state.lock().unwrap().fail_mirror_install = fail;
    }

    pub fn route(&self) -> Option<DefaultRoute> {
        self.state.lock().unwrap().route.clone()
    }

    pub fn mirror(&self) -> Option<(String, String, String)> {
        self.state.lock().unwrap().mirror.clone()
    }

    pub fn mirror_installed(&self) -> bool {
        self.state.lock().unwrap().mirror.is_some()
    }

    pub fn controller(&self) -> Option<usize> {
        self.state.lock().unwrap().controller
    }

    pub fn return_routes(&self) -> Vec<String> {
        self.state.lock().unwrap().return_routes.clone()
    }

    /// Ordered record of every call, e.g. `mirror_install vip_a vip_b`.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl PathActuator for MockActuator {
    async fn mirror_install(
        &self,
        active_dev: &str,
        backup_dev: &str,
        backup_gw: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("mirror_install {} {}", active_dev, backup_dev));
        if state.fail_mirror_install {
            return Err(SteerError::Actuation("mirror install refused".into()));
        }
        state.mirror = Some((
            active_dev.to_string(),
            backup_dev.to_string(),
            backup_gw.to_string(),
        ));
        Ok(())
    }

    async fn mirror_remove(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("mirror_remove".to_string());
        state.mirror = None;
        Ok(())
    }

    async fn route_replace(&self, gateway: &str, device: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("route_replace {} {}", gateway, device));
        if state.ignore_route_replaces > 0 {
            state.ignore_route_replaces -= 1;
            return Ok(()); // accepted but never takes effect
        }
        state.route = Some(DefaultRoute {
            gateway: gateway.to_string(),
            device: device.to_string(),
        });
        Ok(())
    }

    async fn route_readback(&self) -> Result<Option<DefaultRoute>> {
        Ok(self.state.lock().unwrap().route.clone())
    }

    async fn return_route_switch(&self, uplink: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("return_route_switch {}", uplink));
        state.return_routes.push(uplink.to_string());
        Ok(())
    }

    async fn controller_switch(&self, controller: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("controller_switch {}", controller));
        state.controller = Some(controller);
        Ok(())
    }
}
