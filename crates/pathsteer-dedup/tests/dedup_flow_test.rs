//! End-to-end dedup behavior over interleaved tunnel batches

use pathsteer_dedup::{DedupEngine, FlowTable, Verdict};

/// Build a UDP-in-IPv4 packet for one flow; `seq` varies the UDP checksum
/// field the way distinct datagrams of a real flow do.
fn flow_packet(seq: u16, payload: &[u8]) -> Vec<u8> {
    let mut packet = vec![0u8; 28 + payload.len()];
    packet[0] = 0x45;
    packet[8] = 64;
    packet[9] = 17;
    packet[12..16].copy_from_slice(&[10, 8, 0, 2]);
    packet[16..20].copy_from_slice(&[104, 204, 136, 50]);
    packet[20..22].copy_from_slice(&5060u16.to_be_bytes());
    packet[22..24].copy_from_slice(&5060u16.to_be_bytes());
    let udp_len = (8 + payload.len()) as u16;
    packet[24..26].copy_from_slice(&udp_len.to_be_bytes());
    packet[26..28].copy_from_slice(&seq.to_be_bytes());
    packet[28..].copy_from_slice(payload);
    packet
}

#[test]
fn duplicated_stream_forwards_exactly_once() {
    let mut engine = DedupEngine::with_defaults();

    // 10 000 distinct packets of one flow, each arriving twice (once per
    // tunnel), interleaved within a 100 ms window.
    let count = 10_000u32;
    let mut forwarded = 0u32;
    let mut dropped = 0u32;

    for i in 0..count {
        let packet = flow_packet(i as u16, format!("rtp-{}", i).as_bytes());
        let now_ms = (i as i64) % 100;
        // Tunnel T1 copy
        match engine.ingest(&packet, now_ms) {
            Verdict::Forward => forwarded += 1,
            Verdict::Drop => dropped += 1,
        }
        // Tunnel T2 copy, a moment later
        match engine.ingest(&packet, now_ms + 1) {
            Verdict::Forward => forwarded += 1,
            Verdict::Drop => dropped += 1,
        }
    }

    assert_eq!(forwarded, count);
    assert_eq!(dropped, count);

    let stats = engine.stats();
    assert_eq!(stats.total, 2 * count as u64);
    assert_eq!(stats.forwarded, count as u64);
    assert_eq!(stats.duplicates_dropped, count as u64);
    assert_eq!(stats.unclassified, 0);

    // Once the TTL has passed, the table drains toward quiescence
    engine.sweep(10_000);
    assert_eq!(engine.stats().active_flows, 0);
}

#[test]
fn late_duplicate_outside_ttl_is_forwarded() {
    let mut engine = DedupEngine::new(FlowTable::new(1024, 5_000));
    let packet = flow_packet(1, b"probe");

    assert_eq!(engine.ingest(&packet, 0), Verdict::Forward);
    assert_eq!(engine.ingest(&packet, 4_999), Verdict::Drop);
    // A retransmission past the TTL is a fresh first arrival
    assert_eq!(engine.ingest(&packet, 5_000), Verdict::Forward);
}

#[test]
fn interleaved_flows_do_not_interfere() {
    let mut engine = DedupEngine::with_defaults();

    for i in 0..100u16 {
        let sip = flow_packet(i, b"sip");
        let mut quic = flow_packet(i, b"quic");
        // Second flow: different destination port
        quic[22..24].copy_from_slice(&4433u16.to_be_bytes());

        assert_eq!(engine.ingest(&sip, i as i64), Verdict::Forward);
        assert_eq!(engine.ingest(&quic, i as i64), Verdict::Forward);
        assert_eq!(engine.ingest(&sip, i as i64 + 1), Verdict::Drop);
        assert_eq!(engine.ingest(&quic, i as i64 + 1), Verdict::Drop);
    }

    let stats = engine.stats();
    assert_eq!(stats.forwarded, 200);
    assert_eq!(stats.duplicates_dropped, 200);
}
