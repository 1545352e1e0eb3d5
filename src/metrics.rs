/*!
 * Metric aggregation: rolling per-uplink stats fed by the probe pool
 *
 * Pure logic, no I/O. The probe pool calls [`ingest`] with each raw probe
 * outcome; everything downstream (tripwire, risk scorer, arbiter) reads
 * the fields this module maintains on [`Uplink`].
 */

use crate::uplink::{ProbeSample, Uplink};

/// Loss is computed over this many recent probes
pub const LOSS_WINDOW: usize = 20;

/// More consecutive failures than this marks the uplink unreachable
pub const UNREACHABLE_AFTER: u32 = 5;

/// Smoothing factor of the slow baseline EMA
pub const BASELINE_ALPHA: f64 = 0.05;

/// Fold one probe outcome into an uplink's metrics.
///
/// `raw_rtt_ms` is `None` for a failed probe. `jitter_draw` is a uniform
/// draw in [-1, 1] used to apply the chaos jitter amplitude; the perturbed
/// value is what lands in the history ring and in `rtt_ms`, so the
/// tripwire sees injected faults. The baseline EMA tracks the raw RTT of
/// successful probes only.
pub fn ingest(u: &mut Uplink, raw_rtt_ms: Option<f64>, jitter_draw: f64, now_ms: i64) {
    let success = raw_rtt_ms.is_some();
    let perturbed = raw_rtt_ms
        .map(|rtt| rtt + u.chaos.rtt + u.chaos.jitter * jitter_draw)
        .unwrap_or(0.0);

    u.history.push(ProbeSample {
        rtt_ms: perturbed,
        success,
        at_ms: now_ms,
    });

    if let Some(raw) = raw_rtt_ms {
        u.rtt_ms = perturbed;
        u.consec_fail = 0;
        if !u.force_failed {
            u.reachable = true;
        }
        if u.rtt_baseline == 0.0 {
            u.rtt_baseline = raw;
        } else {
            u.rtt_baseline = u.rtt_baseline * (1.0 - BASELINE_ALPHA) + raw * BASELINE_ALPHA;
        }
    } else {
        u.consec_fail += 1;
        if u.consec_fail > UNREACHABLE_AFTER {
            u.reachable = false;
        }
    }

    update_loss(u);
    update_jitter(u);
}

fn update_loss(u: &mut Uplink) {
    let mut total = 0u32;
    let mut failed = 0u32;
    for s in u.history.recent(LOSS_WINDOW) {
        total += 1;
        if !s.success {
            failed += 1;
        }
    }
    if total == 0 {
        return;
    }
    let mut loss = 100.0 * f64::from(failed) / f64::from(total);
    loss += u.chaos.loss;
    u.loss_pct = loss.clamp(0.0, 100.0);
}

fn update_jitter(u: &mut Uplink) {
    let rtts: Vec<f64> = u
        .history
        .recent(LOSS_WINDOW)
        .filter(|s| s.success)
        .map(|s| s.rtt_ms)
        .collect();
    if rtts.len() < 2 {
        return;
    }
    let sum: f64 = rtts.windows(2).map(|w| (w[0] - w[1]).abs()).sum();
    u.jitter_ms = sum / (rtts.len() - 1) as f64;
}
