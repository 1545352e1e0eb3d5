//! End-to-end steering scenarios on a synthetic timeline: fail-over,
//! obstruction hand-off, flap suppression, and switch verification.

mod common;

use common::{fiber, lte, sat, Harness};

/// Clean cellular fail-over: an RTT step on the active cellular uplink
/// trips protection, mirrors traffic, and moves the route to the
/// satellite path; once the hold and clean timers expire the window
/// closes and the mirror comes down.
#[tokio::test]
async fn cellular_rtt_step_fails_over_and_recovers() {
    let mut h = Harness::new(vec![
        lte("cell_a", "10.201.10.18", "0"),
        sat("sl_a", "10.201.10.10", "http://dish-a/status"),
    ])
    .await;
    h.prober.set_default("cell_a", Some(80.0));
    h.prober.set_default("sl_a", Some(40.0));
    h.dish.set_obstruction("http://dish-a/status", 0.0, -1);
    h.signals.set(
        "0",
        serde_json::from_str(r#"{"rsrp_dbm": -95.0, "connected": true}"#).unwrap(),
    );

    // Let baselines settle
    h.advance(3000).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.state, "NORMAL");
    assert_eq!(snap.active_uplink, "cell_a");
    assert!(!snap.dup_enabled);
    let cell = h.engine.uplink("cell_a").unwrap();
    assert!((cell.rtt_baseline - 80.0).abs() < 1.0);
    h.assert_single_active();

    // Inject a +120 ms RTT step on the active uplink
    h.chaos(r#"{"cell_a": {"rtt": 120}}"#);

    // Within two probe cycles the tripwire fires
    h.advance(300).await;
    let snap = h.engine.snapshot();
    assert!(
        snap.state == "PROTECT" || snap.state == "SWITCHING" || snap.state == "HOLDING",
        "state was {}",
        snap.state
    );
    assert_eq!(snap.trigger, "rtt_step");
    assert!(snap.dup_enabled);
    assert!(h.actuator.mirror_installed());

    // After preroll + settle the route moves to the satellite path
    h.advance(600).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.active_uplink, "sl_a");
    assert_eq!(snap.state, "HOLDING");
    assert_eq!(h.actuator.route().unwrap().device, "vip_sl_a");
    h.assert_single_active();

    // Exit needs both the minimum hold and the clean streak; well before
    // that the window must still be open
    h.advance(1500).await;
    assert_ne!(h.engine.snapshot().state, "NORMAL");

    h.advance(2500).await;
    let snap = h.engine.snapshot();
    assert_eq!(snap.state, "NORMAL");
    assert!(!snap.dup_enabled);
    assert!(!h.actuator.mirror_installed());
    assert_eq!(snap.trigger, "none");
    h.assert_single_active();

    // The controller-side return route was kicked for the new uplink
    assert_eq!(h.actuator.return_routes(), vec!["sl_a".to_string()]);
}

/// The mirror settle gate: duplication is installed and engaged before
/// any route swap becomes observable.
#[tokio::test]
async fn mirror_settles_before_route_swap() {
    let mut h = Harness::new(vec![
        fiber("fa", "10.201.10.2"),
        fiber("fb", "10.201.10.6"),
    ])
    .await;
    h.prober.set_default("fa", Some(40.0));
    h.prober.set_default("fb", Some(20.0));

    h.advance(3000).await;
    h.chaos(r#"{"fa": {"rtt": 150}}"#);
    h.advance(1000).await;

    assert_eq!(h.engine.active_uplink_name(), "fb");

    let dup_enable = h.event_index("dup_enable").expect("dup_enable event");
    let dup_engaged = h.event_index("dup_engaged").expect("dup_engaged event");
    let switch_ok = h.event_index("switch_ok").expect("switch_ok event");
    assert!(dup_enable < dup_engaged, "mirror installed before engaging");
    assert!(dup_engaged < switch_ok, "settle completed before the swap");

    let events = h.events();
    let settle_ms = events[dup_engaged]["data"]["settle_ms"].as_i64().unwrap();
    assert!(settle_ms >= 50, "settle was only {} ms", settle_ms);
}

/// Predicted satellite obstruction: an obstruction ETA inside the horizon
/// trips protection and the arbiter hands off to the cellular path.
#[tokio::test]
async fn predicted_obstruction_hands_off_to_cellular() {
    let mut h = Harness::new(vec![
        sat("sl_a", "10.201.10.10", "http://dish-a/status"),
        lte("cell_a", "10.201.10.18", "0"),
    ])
    .await;
    h.prober.set_default("sl_a", Some(45.0));
    h.prober.set_default("cell_a", Some(30.0));
    h.dish.set_obstruction("http://dish-a/status", 0.02, 60);
    h.signals.set(
        "0",
        serde_json::from_str(r#"{"rsrp_dbm": -85.0, "connected": true}"#).unwrap(),
    );

    h.advance(3000).await;
    assert_eq!(h.engine.snapshot().state, "NORMAL");
    assert_eq!(h.engine.active_uplink_name(), "sl_a");

    // Dish now predicts an obstruction in 3 seconds
    h.dish.set_obstruction("http://dish-a/status", 0.02, 3);
    h.advance(1200).await;

    let snap = h.engine.snapshot();
    assert_eq!(snap.trigger, "starlink_obstruction");
    assert_eq!(snap.active_uplink, "cell_a");
    assert_eq!(h.actuator.route().unwrap().device, "vip_cell_a");
    h.assert_single_active();
}

/// Flap suppression: oscillating uplinks get at most three route swaps
/// per protection window, then the window freezes.
#[tokio::test]
async fn oscillation_is_capped_at_three_swaps() {
    let mut h = Harness::new(vec![
        fiber("fa", "10.201.10.2"),
        fiber("fb", "10.201.10.6"),
    ])
    .await;
    h.prober.set_default("fa", Some(40.0));
    h.prober.set_default("fb", Some(40.0));

    h.advance(3000).await;

    // Kick off protection with a step on the active side, then bounce the
    // degradation between the two uplinks every 400 ms
    h.chaos(r#"{"fa": {"rtt": 150}}"#);
    h.advance(400).await;
    for round in 0..10 {
        if round % 2 == 0 {
            h.chaos(r#"{"fb": {"rtt": 150}}"#);
        } else {
            h.chaos(r#"{"fa": {"rtt": 150}}"#);
        }
        h.advance(400).await;
    }

    let snap = h.engine.snapshot();
    assert!(snap.flap_suppressed, "flap suppression must engage");
    assert_eq!(snap.switches_this_window, 3);
    assert_ne!(snap.state, "NORMAL");

    // No further route changes once suppressed
    let swaps_when_suppressed = h
        .actuator
        .calls()
        .iter()
        .filter(|c| c.starts_with("route_replace"))
        .count();
    h.chaos(r#"{"fb": {"rtt": 150}}"#);
    h.advance(800).await;
    let swaps_after = h
        .actuator
        .calls()
        .iter()
        .filter(|c| c.starts_with("route_replace"))
        .count();
    assert_eq!(swaps_when_suppressed, swaps_after);
    h.assert_single_active();
}

/// Switch verification failure: when the route readback does not match,
/// the active uplink is not updated; the next tick retries and only a
/// verified swap moves it.
#[tokio::test]
async fn unverified_swap_retries_before_committing() {
    let mut h = Harness::new(vec![
        fiber("fa", "10.201.10.2"),
        fiber("fb", "10.201.10.6"),
    ])
    .await;
    h.prober.set_default("fa", Some(40.0));
    h.prober.set_default("fb", Some(20.0));

    h.advance(3000).await;

    // First replace is accepted by the kernel but never takes effect
    h.actuator.ignore_route_replaces(1);
    h.chaos(r#"{"fa": {"rtt": 150}}"#);
    h.advance(1000).await;

    let names = h.event_names();
    let fail = names.iter().position(|e| e == "switch_fail").expect("switch_fail");
    let ok = names.iter().position(|e| e == "switch_ok").expect("switch_ok");
    assert!(fail < ok, "failed attempt precedes the verified retry");

    assert_eq!(h.engine.active_uplink_name(), "fb");
    assert_eq!(h.actuator.route().unwrap().device, "vip_fb");

    let events = h.events();
    assert_eq!(
        events[fail]["data"]["reason"], "route_verify_failed",
        "failure reason is recorded"
    );
    h.assert_single_active();
}

/// Probe loss on the active uplink: consecutive misses trip the wire even
/// with a healthy RTT history.
#[tokio::test]
async fn probe_miss_trips_protection() {
    let mut h = Harness::new(vec![
        fiber("fa", "10.201.10.2"),
        fiber("fb", "10.201.10.6"),
    ])
    .await;
    h.prober.set_default("fa", Some(40.0));
    h.prober.set_default("fb", Some(40.0));

    h.advance(3000).await;

    // Two consecutive lost probes
    h.prober.push("fa", None);
    h.prober.push("fa", None);
    h.advance(400).await;

    let snap = h.engine.snapshot();
    assert_eq!(snap.trigger, "probe_miss");
    assert_ne!(snap.state, "NORMAL");
}

/// TRAINING mode observes the tripwire without actuating anything.
#[tokio::test]
async fn training_mode_never_actuates() {
    let mut h = Harness::new(vec![
        fiber("fa", "10.201.10.2"),
        fiber("fb", "10.201.10.6"),
    ])
    .await;
    h.prober.set_default("fa", Some(40.0));
    h.prober.set_default("fb", Some(20.0));

    h.advance(2000).await;
    h.write_cmd(1, "mode:training");
    h.advance(1000).await;

    h.chaos(r#"{"fa": {"rtt": 200}}"#);
    h.advance(1000).await;

    let snap = h.engine.snapshot();
    assert_eq!(snap.mode, "TRAINING");
    assert_eq!(snap.state, "NORMAL");
    assert_eq!(snap.active_uplink, "fa");
    assert!(!snap.dup_enabled);
    assert!(h.event_index("tripwire_observed").is_some());
    assert!(h.event_index("tripwire_fire").is_none());
}

/// MIRROR mode keeps duplication up even in NORMAL, including across a
/// protection window exit.
#[tokio::test]
async fn mirror_mode_keeps_duplication_enabled() {
    let mut h = Harness::new(vec![
        fiber("fa", "10.201.10.2"),
        fiber("fb", "10.201.10.6"),
    ])
    .await;
    h.prober.set_default("fa", Some(40.0));
    h.prober.set_default("fb", Some(20.0));

    h.advance(2000).await;
    h.write_cmd(1, "mode:mirror");
    h.advance(100).await;
    assert!(h.engine.snapshot().dup_enabled);

    // A full protection window passes; the mirror must survive the exit
    h.chaos(r#"{"fa": {"rtt": 150}}"#);
    h.advance(1000).await;
    h.clear_chaos();
    h.advance(6000).await;

    let snap = h.engine.snapshot();
    assert_eq!(snap.state, "NORMAL");
    assert!(snap.dup_enabled);
    assert!(h.actuator.mirror_installed());
}
