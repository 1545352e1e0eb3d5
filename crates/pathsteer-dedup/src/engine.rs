//! First-arrival gate and statistics
//!
//! Ties the fingerprint and flow table together: each ingested packet is
//! either forwarded (first arrival, or unclassifiable) or dropped
//! (duplicate). Forwarded packets egress byte-for-byte unchanged; the
//! drop is transparent to both endpoints.

use crate::fingerprint::fingerprint;
use crate::table::{Admission, FlowTable};

/// What to do with an ingested packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Forward,
    Drop,
}

/// Counters exported on the stats interval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub total: u64,
    pub forwarded: u64,
    pub duplicates_dropped: u64,
    /// Packets forwarded without dedup because no fingerprint could be
    /// computed
    pub unclassified: u64,
    /// Live flow-table entries as of the last sweep
    pub active_flows: u64,
}

impl DedupStats {
    /// One-line summary in the historical stats format
    pub fn summary(&self) -> String {
        format!(
            "total={} fwd={} dup={} active={}",
            self.total, self.forwarded, self.duplicates_dropped, self.active_flows
        )
    }
}

pub struct DedupEngine {
    table: FlowTable,
    stats: DedupStats,
}

impl DedupEngine {
    pub fn new(table: FlowTable) -> Self {
        Self {
            table,
            stats: DedupStats::default(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(FlowTable::with_defaults())
    }

    /// Gate one packet. Header bytes only are examined.
    pub fn ingest(&mut self, packet: &[u8], now_ms: i64) -> Verdict {
        self.stats.total += 1;

        let Some(fp) = fingerprint(packet) else {
            self.stats.unclassified += 1;
            self.stats.forwarded += 1;
            return Verdict::Forward;
        };

        match self.table.check_and_admit(fp, now_ms) {
            Admission::Admitted => {
                self.stats.forwarded += 1;
                Verdict::Forward
            }
            Admission::Duplicate => {
                self.stats.duplicates_dropped += 1;
                Verdict::Drop
            }
        }
    }

    /// Expire old entries and refresh the active-flow counter.
    pub fn sweep(&mut self, now_ms: i64) {
        self.stats.active_flows = self.table.sweep(now_ms) as u64;
    }

    pub fn stats(&self) -> DedupStats {
        self.stats
    }
}
