/*!
 * Probe pool: per-uplink reachability sampling
 *
 * Each enabled uplink is probed at the configured sample rate. LTE probes
 * bind the raw physical interface toward the controller's public address
 * (measuring the radio leg, bypassing the tunnel); SAT and FIBER probes
 * run inside the uplink's network namespace toward a well-known
 * reachability address. Probes are short-lived child processes behind a
 * hard 2 s deadline, with at most one outstanding probe per uplink.
 */

pub mod chaos;
pub mod dish;
pub mod modem;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::uplink::UplinkKind;

/// Hard deadline for a single probe
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything a prober needs to reach one uplink's target
#[derive(Debug, Clone)]
pub struct ProbeSpec {
    pub uplink: String,
    pub kind: UplinkKind,
    pub interface: String,
    pub namespace: String,
    pub target: String,
}

/// Reachability prober seam. The production implementation launches a
/// ping child process; tests script outcomes.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe once. `Some(rtt_ms)` on success, `None` on loss. Probe loss
    /// is not an error; it is an ordinary measurement.
    async fn probe(&self, spec: &ProbeSpec) -> Option<f64>;
}

/// Production prober: one `ping -c1` per probe, namespace- or
/// interface-bound depending on uplink kind.
pub struct PingProber;

#[async_trait]
impl Prober for PingProber {
    async fn probe(&self, spec: &ProbeSpec) -> Option<f64> {
        let output = match spec.kind {
            UplinkKind::Lte => {
                tokio::process::Command::new("ping")
                    .args(["-n", "-c", "1", "-W", "2", "-I"])
                    .arg(&spec.interface)
                    .arg(&spec.target)
                    .output()
                    .await
            }
            _ if !spec.namespace.is_empty() => {
                tokio::process::Command::new("ip")
                    .args(["netns", "exec"])
                    .arg(&spec.namespace)
                    .args(["ping", "-n", "-c", "1", "-W", "1"])
                    .arg(&spec.target)
                    .output()
                    .await
            }
            _ => {
                tokio::process::Command::new("ping")
                    .args(["-n", "-c", "1", "-W", "1"])
                    .arg(&spec.target)
                    .output()
                    .await
            }
        };

        let output = output.ok()?;
        if !output.status.success() {
            return None;
        }
        parse_rtt(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Extract the `time=` value from ping output.
pub fn parse_rtt(output: &str) -> Option<f64> {
    let idx = output.find("time=")?;
    let rest = &output[idx + 5..];
    let end = rest
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// One raw probe outcome, tagged with its uplink index
pub type ProbeOutcome = (usize, Option<f64>);

/// Fans probes out as async tasks and funnels outcomes back to the engine
/// over a channel. At most one probe is in flight per uplink.
pub struct ProbePool {
    prober: Arc<dyn Prober>,
    tx: mpsc::UnboundedSender<ProbeOutcome>,
    rx: mpsc::UnboundedReceiver<ProbeOutcome>,
    outstanding: Vec<bool>,
}

impl ProbePool {
    pub fn new(prober: Arc<dyn Prober>, uplink_count: usize) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            prober,
            tx,
            rx,
            outstanding: vec![false; uplink_count],
        }
    }

    /// Launch a probe for one uplink unless one is already in flight.
    pub fn kick(&mut self, idx: usize, spec: ProbeSpec) {
        if self.outstanding[idx] {
            return;
        }
        self.outstanding[idx] = true;

        let prober = self.prober.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let rtt = tokio::time::timeout(PROBE_TIMEOUT, prober.probe(&spec))
                .await
                .unwrap_or(None);
            let _ = tx.send((idx, rtt));
        });
    }

    /// Collect every completed probe outcome without blocking.
    pub fn drain(&mut self) -> Vec<ProbeOutcome> {
        let mut out = Vec::new();
        while let Ok(outcome) = self.rx.try_recv() {
            self.outstanding[outcome.0] = false;
            out.push(outcome);
        }
        out
    }

    #[cfg(test)]
    fn in_flight(&self, idx: usize) -> bool {
        self.outstanding[idx]
    }
}
