//! Packet fingerprinting
//!
//! The fingerprint must be (a) identical for the two copies of a
//! duplicated packet and (b) cheap. Duplication happens pre-encryption
//! and leaves addresses, ports, and transport headers untouched, so
//! hashing stable header bytes satisfies both.
//!
//! Hashed byte ranges, by IP version:
//! - IPv4: source address (4) + destination address (4) + protocol (1) +
//!   the first 8 bytes past the IP header. For UDP that covers ports,
//!   length, and checksum; for TCP, ports and the sequence number.
//! - IPv6: source address (16) + destination address (16) + next-header
//!   (1) + the first 8 bytes past the fixed header.
//!
//! The transport span is additionally capped at the first 64 bytes of the
//! packet, and the payload is never read. The collected bytes are mixed
//! with xxh3-64.

use xxhash_rust::xxh3::xxh3_64;

/// Hashed span never reaches past this many bytes of the packet
pub const FINGERPRINT_SPAN: usize = 64;

/// Bytes of transport header folded into the fingerprint
const TRANSPORT_BYTES: usize = 8;

/// Compute the fingerprint of one decapsulated IP packet. Returns `None`
/// for packets too short or malformed to classify; the caller forwards
/// those without dedup.
pub fn fingerprint(packet: &[u8]) -> Option<u64> {
    if packet.is_empty() {
        return None;
    }
    match packet[0] >> 4 {
        4 => fingerprint_v4(packet),
        6 => fingerprint_v6(packet),
        _ => None,
    }
}

fn fingerprint_v4(packet: &[u8]) -> Option<u64> {
    if packet.len() < 20 {
        return None;
    }
    let ihl = (packet[0] & 0x0f) as usize * 4;
    if ihl < 20 || packet.len() < ihl {
        return None;
    }

    // src(4) + dst(4) + proto(1) + transport(<=8)
    let mut material = [0u8; 9 + TRANSPORT_BYTES];
    material[..4].copy_from_slice(&packet[12..16]);
    material[4..8].copy_from_slice(&packet[16..20]);
    material[8] = packet[9];

    let span = packet.len().min(FINGERPRINT_SPAN);
    let transport = &packet[ihl.min(span)..span];
    let take = transport.len().min(TRANSPORT_BYTES);
    material[9..9 + take].copy_from_slice(&transport[..take]);

    Some(xxh3_64(&material[..9 + take]))
}

fn fingerprint_v6(packet: &[u8]) -> Option<u64> {
    if packet.len() < 40 {
        return None;
    }

    // src(16) + dst(16) + next-header(1) + transport(<=8)
    let mut material = [0u8; 33 + TRANSPORT_BYTES];
    material[..16].copy_from_slice(&packet[8..24]);
    material[16..32].copy_from_slice(&packet[24..40]);
    material[32] = packet[6];

    let span = packet.len().min(FINGERPRINT_SPAN);
    let transport = &packet[40.min(span)..span];
    let take = transport.len().min(TRANSPORT_BYTES);
    material[33..33 + take].copy_from_slice(&transport[..take]);

    Some(xxh3_64(&material[..33 + take]))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a minimal IPv4/UDP packet
    fn udp4(
        src: [u8; 4],
        dst: [u8; 4],
        sport: u16,
        dport: u16,
        payload: &[u8],
    ) -> Vec<u8> {
        let mut packet = vec![0u8; 20 + 8 + payload.len()];
        packet[0] = 0x45;
        let total = packet.len() as u16;
        packet[2..4].copy_from_slice(&total.to_be_bytes());
        packet[8] = 64; // ttl
        packet[9] = 17; // udp
        packet[12..16].copy_from_slice(&src);
        packet[16..20].copy_from_slice(&dst);
        packet[20..22].copy_from_slice(&sport.to_be_bytes());
        packet[22..24].copy_from_slice(&dport.to_be_bytes());
        let udp_len = (8 + payload.len()) as u16;
        packet[24..26].copy_from_slice(&udp_len.to_be_bytes());
        // bytes 26..28 checksum left zero
        packet[28..].copy_from_slice(payload);
        packet
    }

    fn udp6(src_last: u8, dst_last: u8, sport: u16) -> Vec<u8> {
        let mut packet = vec![0u8; 40 + 8];
        packet[0] = 0x60;
        packet[6] = 17; // next header: udp
        packet[8 + 15] = src_last;
        packet[24 + 15] = dst_last;
        packet[40..42].copy_from_slice(&sport.to_be_bytes());
        packet
    }

    #[test]
    fn test_duplicate_copies_match() {
        let a = udp4([10, 0, 0, 1], [104, 204, 136, 50], 5060, 5060, b"INVITE");
        let b = a.clone();
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert!(fingerprint(&a).is_some());
    }

    #[test]
    fn test_distinct_tuples_differ() {
        let a = udp4([10, 0, 0, 1], [104, 204, 136, 50], 5060, 5060, b"x");
        let b = udp4([10, 0, 0, 1], [104, 204, 136, 50], 5061, 5060, b"x");
        let c = udp4([10, 0, 0, 2], [104, 204, 136, 50], 5060, 5060, b"x");
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn test_payload_not_hashed() {
        // Same headers (including UDP length), different payload bytes
        let a = udp4([10, 0, 0, 1], [1, 1, 1, 1], 9000, 9001, b"aaaa");
        let b = udp4([10, 0, 0, 1], [1, 1, 1, 1], 9000, 9001, b"bbbb");
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_ipv4_options_respected() {
        // ihl=6 shifts the transport header by 4 bytes
        let mut packet = udp4([10, 0, 0, 1], [1, 1, 1, 1], 9000, 9001, b"");
        packet[0] = 0x46;
        packet.splice(20..20, [0u8; 4]);
        let plain = udp4([10, 0, 0, 1], [1, 1, 1, 1], 9000, 9001, b"");
        // Same transport header bytes hashed either way
        assert_eq!(fingerprint(&packet), fingerprint(&plain));
    }

    #[test]
    fn test_ipv6_fingerprint() {
        let a = udp6(1, 2, 5060);
        let b = udp6(1, 2, 5060);
        let c = udp6(1, 3, 5060);
        let d = udp6(1, 2, 5061);
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
        assert_ne!(fingerprint(&a), fingerprint(&d));
    }

    #[test]
    fn test_malformed_packets() {
        assert_eq!(fingerprint(&[]), None);
        assert_eq!(fingerprint(&[0x45; 10]), None); // truncated v4
        assert_eq!(fingerprint(&[0x60; 20]), None); // truncated v6
        assert_eq!(fingerprint(&[0x20; 40]), None); // bogus version
        let mut bad_ihl = udp4([1, 1, 1, 1], [2, 2, 2, 2], 1, 2, b"");
        bad_ihl[0] = 0x4f; // ihl=60 > packet length
        bad_ihl.truncate(28);
        assert_eq!(fingerprint(&bad_ihl), None);
    }

    #[test]
    fn test_headerless_v4_still_fingerprints() {
        // A bare 20-byte IP header (no transport bytes) is still hashable
        let mut packet = vec![0u8; 20];
        packet[0] = 0x45;
        packet[9] = 1; // icmp
        packet[12..16].copy_from_slice(&[10, 0, 0, 1]);
        packet[16..20].copy_from_slice(&[10, 0, 0, 2]);
        assert!(fingerprint(&packet).is_some());
    }
}
