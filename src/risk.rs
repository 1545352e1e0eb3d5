/*!
 * Risk scorer: per-uplink current-risk estimate
 *
 * A simple feature blend, recomputed every 250 ms. The scorer never
 * actuates; its output feeds the arbiter's scoring penalty and the
 * published recommendation.
 */

use crate::uplink::{Uplink, UplinkKind};

/// How often the scorer runs (ms)
pub const RISK_INTERVAL_MS: i64 = 250;

/// Risk at or above this recommends PROTECT
pub const PROTECT_THRESHOLD: f64 = 0.7;

/// Risk at or above this recommends PREPARE
pub const PREPARE_THRESHOLD: f64 = 0.4;

/// Published recommendation derived from the active uplink's risk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recommendation {
    Normal,
    Prepare,
    Protect,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Normal => "NORMAL",
            Recommendation::Prepare => "PREPARE",
            Recommendation::Protect => "PROTECT",
        }
    }
}

/// Compute `risk_now` for one uplink, clamped to [0, 1].
pub fn score(u: &Uplink) -> f64 {
    let mut risk = 0.0;

    if u.rtt_baseline > 0.0 && u.rtt_ms > u.rtt_baseline * 1.5 {
        risk += 0.3;
    }

    if u.loss_pct > 50.0 {
        risk += 0.5;
    } else if u.loss_pct > 20.0 {
        risk += 0.4;
    } else if u.loss_pct > 5.0 {
        risk += 0.3;
    }

    risk += 0.2 * f64::from(u.consec_fail.min(5));

    if u.kind() == UplinkKind::Sat {
        risk += u.satellite.obstruction_pct * 0.01;
    }

    if u.kind() == UplinkKind::Lte && u.cellular.rsrp_dbm < -110.0 {
        risk += 0.4;
    }

    risk.clamp(0.0, 1.0)
}

/// Map the active uplink's risk to a recommendation.
pub fn recommend(global_risk: f64) -> Recommendation {
    if global_risk >= PROTECT_THRESHOLD {
        Recommendation::Protect
    } else if global_risk >= PREPARE_THRESHOLD {
        Recommendation::Prepare
    } else {
        Recommendation::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UplinkConfig;

    fn uplink(kind: UplinkKind) -> Uplink {
        let mut u = Uplink::new(UplinkConfig::named("u0", kind));
        u.rtt_ms = 40.0;
        u.rtt_baseline = 40.0;
        u
    }

    #[test]
    fn test_healthy_is_zero() {
        let u = uplink(UplinkKind::Fiber);
        assert_eq!(score(&u), 0.0);
    }

    #[test]
    fn test_rtt_inflation_term() {
        let mut u = uplink(UplinkKind::Fiber);
        u.rtt_ms = 70.0; // > 1.5x baseline
        assert!((score(&u) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_loss_tiers() {
        let mut u = uplink(UplinkKind::Fiber);
        u.loss_pct = 6.0;
        assert!((score(&u) - 0.3).abs() < 1e-9);
        u.loss_pct = 25.0;
        assert!((score(&u) - 0.4).abs() < 1e-9);
        u.loss_pct = 60.0;
        assert!((score(&u) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_consec_fail_term_caps_at_five() {
        let mut u = uplink(UplinkKind::Fiber);
        u.consec_fail = 2;
        assert!((score(&u) - 0.4).abs() < 1e-9);
        u.consec_fail = 9;
        assert_eq!(score(&u), 1.0); // 0.2*5 = 1.0, clamped
    }

    #[test]
    fn test_sat_obstruction_term() {
        let mut u = uplink(UplinkKind::Sat);
        u.satellite.obstruction_pct = 10.0;
        assert!((score(&u) - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_lte_weak_signal_term() {
        let mut u = uplink(UplinkKind::Lte);
        u.cellular.rsrp_dbm = -115.0;
        assert!((score(&u) - 0.4).abs() < 1e-9);
        u.cellular.rsrp_dbm = -90.0;
        assert_eq!(score(&u), 0.0);
    }

    #[test]
    fn test_clamped_to_one() {
        let mut u = uplink(UplinkKind::Lte);
        u.rtt_ms = 500.0;
        u.loss_pct = 80.0;
        u.consec_fail = 5;
        u.cellular.rsrp_dbm = -130.0;
        assert_eq!(score(&u), 1.0);
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(recommend(0.0), Recommendation::Normal);
        assert_eq!(recommend(0.39), Recommendation::Normal);
        assert_eq!(recommend(0.4), Recommendation::Prepare);
        assert_eq!(recommend(0.7), Recommendation::Protect);
        assert_eq!(recommend(1.0), Recommendation::Protect);
        assert_eq!(Recommendation::Prepare.as_str(), "PREPARE");
    }
}
