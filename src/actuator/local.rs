//! Production actuator: namespace tooling driven as argv commands
//!
//! Mirror rules live in their own table so teardown is one delete and
//! enabling is rule installation only; the table is cleared of any stale
//! state at startup. Route verification parses the typed
//! `default via <gw> dev <dev>` readback, nothing else.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;

use super::{DefaultRoute, PathActuator};
use crate::error::{Result, SteerError};

/// Name of the mirror rule table inside the service namespace
const MIRROR_TABLE: &str = "dup_table";

pub struct NamespaceActuator {
    /// Service namespace holding the VIP routing ("ns_vip")
    service_ns: String,

    /// Helper fired after a verified switch to move the controller-side
    /// return route
    return_route_script: PathBuf,

    /// Helper advising the external router to swap Controllers
    controller_script: PathBuf,
}

impl NamespaceActuator {
    pub fn new(service_ns: String) -> Self {
        Self {
            service_ns,
            return_route_script: PathBuf::from("/opt/pathsteer/scripts/controller-route-switch.sh"),
            controller_script: PathBuf::from("/opt/pathsteer/scripts/c8000-switch.sh"),
        }
    }

    /// Run a command inside the service namespace, capturing stdout.
    async fn in_ns(&self, program: &str, args: &[&str]) -> Result<String> {
        let output = Command::new("ip")
            .arg("netns")
            .arg("exec")
            .arg(&self.service_ns)
            .arg(program)
            .args(args)
            .output()
            .await
            .map_err(|e| SteerError::Actuation(format!("{} spawn: {}", program, e)))?;
        if !output.status.success() {
            return Err(SteerError::Actuation(format!(
                "{} {} failed: {}",
                program,
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl PathActuator for NamespaceActuator {
    async fn mirror_install(
        &self,
        active_dev: &str,
        backup_dev: &str,
        backup_gw: &str,
    ) -> Result<()> {
        // Clear any previous rule first so enable is idempotent
        let _ = self
            .in_ns("nft", &["delete", "table", "ip", MIRROR_TABLE])
            .await;
        self.in_ns("nft", &["add", "table", "ip", MIRROR_TABLE])
            .await?;
        self.in_ns(
            "nft",
            &[
                "add",
                "chain",
                "ip",
                MIRROR_TABLE,
                "postrouting",
                "{",
                "type",
                "filter",
                "hook",
                "postrouting",
                "priority",
                "0",
                ";",
                "}",
            ],
        )
        .await?;
        self.in_ns(
            "nft",
            &[
                "add", "rule", "ip", MIRROR_TABLE, "postrouting", "oif", active_dev, "dup", "to",
                backup_gw, "device", backup_dev,
            ],
        )
        .await?;
        Ok(())
    }

    async fn mirror_remove(&self) -> Result<()> {
        // Deleting an absent table is fine
        let _ = self
            .in_ns("nft", &["delete", "table", "ip", MIRROR_TABLE])
            .await;
        Ok(())
    }

    async fn route_replace(&self, gateway: &str, device: &str) -> Result<()> {
        self.in_ns(
            "ip",
            &["route", "replace", "default", "via", gateway, "dev", device],
        )
        .await?;
        Ok(())
    }

    async fn route_readback(&self) -> Result<Option<DefaultRoute>> {
        let output = self.in_ns("ip", &["-o", "route", "show", "default"]).await?;
        Ok(parse_default_route(&output))
    }

    async fn return_route_switch(&self, uplink: &str) -> Result<()> {
        let status = Command::new(&self.return_route_script)
            .arg(uplink)
            .status()
            .await
            .map_err(|e| SteerError::Actuation(format!("return-route spawn: {}", e)))?;
        if !status.success() {
            return Err(SteerError::Actuation(format!(
                "return-route switch to {} failed",
                uplink
            )));
        }
        Ok(())
    }

    async fn controller_switch(&self, controller: usize) -> Result<()> {
        let name = if controller == 0 { "ctrl_a" } else { "ctrl_b" };
        let status = Command::new(&self.controller_script)
            .arg(name)
            .status()
            .await
            .map_err(|e| SteerError::Actuation(format!("controller switch spawn: {}", e)))?;
        if !status.success() {
            return Err(SteerError::Actuation(format!(
                "controller switch to {} failed",
                name
            )));
        }
        Ok(())
    }
}

/// Parse `default via <gw> dev <dev> ...` into a typed route.
fn parse_default_route(output: &str) -> Option<DefaultRoute> {
    let line = output.lines().find(|l| l.trim_start().starts_with("default"))?;
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let gateway = tokens
        .iter()
        .position(|t| *t == "via")
        .and_then(|i| tokens.get(i + 1))?;
    let device = tokens
        .iter()
        .position(|t| *t == "dev")
        .and_then(|i| tokens.get(i + 1))?;
    Some(DefaultRoute {
        gateway: gateway.to_string(),
        device: device.to_string(),
    })
}
