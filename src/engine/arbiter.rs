//! Arbiter scoring: which uplink should carry service traffic
//!
//! Runs on the slow path, after duplication already protects the session.
//! Lower RTT, lower risk, and lower loss win; healthy satellite and
//! strong cellular paths get fixed bonuses. Ties resolve to the lowest
//! roster index.

use crate::uplink::{Uplink, UplinkKind};

/// Score one uplink. Higher is better.
pub fn score(u: &Uplink) -> f64 {
    let mut score = 100.0 - u.rtt_ms;

    score -= u.risk_now * 50.0;
    score -= u.loss_pct * 10.0;

    if u.kind() == UplinkKind::Sat && u.satellite.online && !u.satellite.obstructed {
        score += 20.0;
    }

    if u.kind() == UplinkKind::Lte && u.cellular.rsrp_dbm > -90.0 {
        score += 15.0;
    }

    score
}

/// Pick the switch target. With the operator lock held the target is
/// always the current active uplink. Only enabled, reachable uplinks are
/// candidates; when none qualifies the active uplink is returned.
pub fn select_best(uplinks: &[Uplink], active: usize, force_locked: bool) -> usize {
    if force_locked {
        return active;
    }

    let mut best = active;
    let mut best_score = f64::NEG_INFINITY;

    for (idx, u) in uplinks.iter().enumerate() {
        if !u.enabled || !u.reachable {
            continue;
        }
        let s = score(u);
        if s > best_score {
            best_score = s;
            best = idx;
        }
    }

    best
}
