/*!
 * Kernel path actuation seam
 *
 * All mutation of kernel networking state — the service-namespace default
 * route, the postrouting mirror rule, and the controller-side helpers —
 * goes through the [`PathActuator`] trait. The production implementation
 * ([`NamespaceActuator`]) drives the namespace tooling as structured argv
 * commands; [`mock::MockActuator`] records calls for tests. Nothing read
 * back from actuation feeds the tripwire; route verification compares a
 * typed gateway/device pair.
 */

mod duplication;
mod local;
pub mod mock;
mod route;

pub use duplication::{DuplicationActuator, EngageState};
pub use local::NamespaceActuator;
pub use route::RouteActuator;

use async_trait::async_trait;

use crate::error::Result;

/// Typed readback of the service namespace's default route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultRoute {
    pub gateway: String,
    pub device: String,
}

/// The operations the engine performs against the kernel path
#[async_trait]
pub trait PathActuator: Send + Sync {
    /// Install the postrouting mirror rule: packets egressing
    /// `active_dev` are also emitted toward `backup_gw` over `backup_dev`.
    async fn mirror_install(
        &self,
        active_dev: &str,
        backup_dev: &str,
        backup_gw: &str,
    ) -> Result<()>;

    /// Tear the mirror rule down. Must be idempotent.
    async fn mirror_remove(&self) -> Result<()>;

    /// Replace the default route in the service namespace.
    async fn route_replace(&self, gateway: &str, device: &str) -> Result<()>;

    /// Read the current default route back for verification.
    async fn route_readback(&self) -> Result<Option<DefaultRoute>>;

    /// Fire the controller-side return-route switch for an uplink.
    async fn return_route_switch(&self, uplink: &str) -> Result<()>;

    /// Advise the external router to swap to another Controller.
    async fn controller_switch(&self, controller: usize) -> Result<()>;
}
