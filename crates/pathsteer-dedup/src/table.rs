//! Fixed-size flow table
//!
//! Open-addressed, direct-slot: a fingerprint maps to exactly one slot
//! (hash modulo capacity). A live slot holding the same fingerprint within
//! TTL means duplicate; anything else — empty slot, expired incumbent, or
//! a colliding live fingerprint — is overwritten and the packet admitted.
//! Overwriting a colliding incumbent degrades that older flow's dedup
//! instead of corrupting lookups, which is the intended behavior under
//! table pressure.

/// Default slot count. Power of two so the index is a mask.
pub const DEFAULT_CAPACITY: usize = 65_536;

/// Default entry TTL (ms)
pub const DEFAULT_TTL_MS: i64 = 5_000;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    fingerprint: u64,
    stamp_ms: i64,
    valid: bool,
}

/// Outcome of a table lookup-and-admit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// First arrival within TTL; entry recorded
    Admitted,
    /// Same fingerprint seen within TTL; caller drops the packet
    Duplicate,
}

#[derive(Debug)]
pub struct FlowTable {
    slots: Vec<Slot>,
    ttl_ms: i64,
    mask: usize,
}

impl FlowTable {
    /// Capacity is rounded up to the next power of two.
    pub fn new(capacity: usize, ttl_ms: i64) -> Self {
        let capacity = capacity.next_power_of_two().max(2);
        Self {
            slots: vec![Slot::default(); capacity],
            ttl_ms,
            mask: capacity - 1,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL_MS)
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn ttl_ms(&self) -> i64 {
        self.ttl_ms
    }

    /// Check a fingerprint and admit it if it is not a live duplicate.
    /// A duplicate does not refresh the incumbent's timestamp; the TTL
    /// runs from first arrival.
    pub fn check_and_admit(&mut self, fingerprint: u64, now_ms: i64) -> Admission {
        let slot = &mut self.slots[(fingerprint as usize) & self.mask];

        if slot.valid
            && slot.fingerprint == fingerprint
            && now_ms - slot.stamp_ms < self.ttl_ms
        {
            return Admission::Duplicate;
        }

        *slot = Slot {
            fingerprint,
            stamp_ms: now_ms,
            valid: true,
        };
        Admission::Admitted
    }

    /// Expire entries older than TTL. Returns the number of live entries
    /// remaining.
    pub fn sweep(&mut self, now_ms: i64) -> usize {
        let mut active = 0;
        for slot in &mut self.slots {
            if !slot.valid {
                continue;
            }
            if now_ms - slot.stamp_ms >= self.ttl_ms {
                slot.valid = false;
            } else {
                active += 1;
            }
        }
        active
    }
}
