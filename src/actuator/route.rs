//! Route actuator: the atomic service-route swap
//!
//! One default-route replace inside the service namespace moves all
//! client traffic. The swap counts as done only after the routing state
//! is read back and matches the requested gateway and device exactly;
//! otherwise the caller treats it as failed and retries.

use std::sync::Arc;

use super::{DefaultRoute, PathActuator};
use crate::error::Result;

pub struct RouteActuator {
    actuator: Arc<dyn PathActuator>,
}

impl RouteActuator {
    pub fn new(actuator: Arc<dyn PathActuator>) -> Self {
        Self { actuator }
    }

    /// Replace the default route and verify the readback. `Ok(true)` means
    /// the swap is live; `Ok(false)` means the kernel state does not match
    /// what was requested.
    pub async fn swap(&self, gateway: &str, device: &str) -> Result<bool> {
        self.actuator.route_replace(gateway, device).await?;
        let current = self.actuator.route_readback().await?;
        let expected = DefaultRoute {
            gateway: gateway.to_string(),
            device: device.to_string(),
        };
        Ok(current.as_ref() == Some(&expected))
    }
}
