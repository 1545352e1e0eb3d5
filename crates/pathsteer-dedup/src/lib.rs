//! PathSteer Controller-side packet deduplicator
//!
//! The Edge mirrors packets across two tunnels during protection windows;
//! both copies arrive here bearing the same 5-tuple. This crate is the
//! first-arrival gate: the first copy of a packet is forwarded unchanged,
//! the second is dropped. Fingerprints are computed over stable header
//! bytes only — the payload is never touched — so the two copies of a
//! duplicated packet always collapse to the same fingerprint.

pub mod engine;
pub mod fingerprint;
pub mod table;

pub use engine::{DedupEngine, DedupStats, Verdict};
pub use fingerprint::fingerprint;
pub use table::FlowTable;
