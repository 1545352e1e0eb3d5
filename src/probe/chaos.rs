//! Chaos injection reader (demo support)
//!
//! `RUN_DIR/chaos.json` maps uplink names to additive perturbations:
//! `{"cell_a": {"rtt": 120, "jitter": 10, "loss": 5}}`. Read once per
//! probe cycle; a missing file means no injection anywhere.

use std::collections::HashMap;
use std::path::Path;

use crate::uplink::ChaosOffsets;

/// Read the chaos file. Absent or malformed files yield an empty map,
/// which resets all injection.
pub fn read(path: &Path) -> HashMap<String, ChaosOffsets> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return HashMap::new();
    };
    serde_json::from_str(&contents).unwrap_or_default()
}
