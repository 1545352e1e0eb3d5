//! Duplication actuator: pre-tunnel per-packet mirroring
//!
//! While enabled, every packet egressing the active uplink's service
//! veth is also emitted toward the backup's gateway with source and
//! destination unchanged, so both copies reach the Controller bearing the
//! same 5-tuple. A settle period must elapse between enabling the mirror
//! and any route swap; the arbiter enforces it through
//! [`DuplicationActuator::try_engage`].

use std::sync::Arc;

use super::PathActuator;
use crate::error::Result;

/// Settle-gate evaluation result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngageState {
    /// No mirror installed; nothing to wait for
    Disabled,
    /// Mirror installed but the settle period has not elapsed yet
    Settling,
    /// Settle period elapsed; `newly` is true on the stamping call
    Engaged { newly: bool },
}

pub struct DuplicationActuator {
    actuator: Arc<dyn PathActuator>,
    enabled: bool,
    enabled_at_ms: Option<i64>,
    engaged_at_ms: Option<i64>,
    /// (active service veth, backup service veth) of the current rule
    pair: Option<(String, String)>,
}

impl DuplicationActuator {
    pub fn new(actuator: Arc<dyn PathActuator>) -> Self {
        Self {
            actuator,
            enabled: false,
            enabled_at_ms: None,
            engaged_at_ms: None,
            pair: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enabled_at_ms(&self) -> Option<i64> {
        self.enabled_at_ms
    }

    pub fn engaged_at_ms(&self) -> Option<i64> {
        self.engaged_at_ms
    }

    /// Install the mirror rule. Idempotent: re-enabling the same pair is a
    /// no-op; a different pair reinstalls the rule and restarts the settle
    /// clock.
    pub async fn enable(
        &mut self,
        now_ms: i64,
        active_dev: &str,
        backup_dev: &str,
        backup_gw: &str,
    ) -> Result<()> {
        let pair = (active_dev.to_string(), backup_dev.to_string());
        if self.enabled && self.pair.as_ref() == Some(&pair) {
            return Ok(());
        }
        self.actuator
            .mirror_install(active_dev, backup_dev, backup_gw)
            .await?;
        self.enabled = true;
        self.enabled_at_ms = Some(now_ms);
        self.engaged_at_ms = None;
        self.pair = Some(pair);
        Ok(())
    }

    /// Tear the mirror down. Idempotent. State is cleared even when the
    /// removal command fails so a later enable starts fresh.
    pub async fn disable(&mut self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }
        self.enabled = false;
        self.enabled_at_ms = None;
        self.engaged_at_ms = None;
        self.pair = None;
        self.actuator.mirror_remove().await
    }

    /// Evaluate the settle gate, stamping the engagement time the first
    /// moment the period has elapsed.
    pub fn try_engage(&mut self, now_ms: i64, settle_ms: i64) -> EngageState {
        if !self.enabled {
            return EngageState::Disabled;
        }
        if self.engaged_at_ms.is_some() {
            return EngageState::Engaged { newly: false };
        }
        let enabled_at = self.enabled_at_ms.unwrap_or(now_ms);
        if now_ms - enabled_at >= settle_ms {
            self.engaged_at_ms = Some(now_ms);
            EngageState::Engaged { newly: true }
        } else {
            EngageState::Settling
        }
    }
}
