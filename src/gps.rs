/*!
 * GPS snapshot reader
 *
 * The engine does not talk to gpsd; an external collaborator maintains
 * `RUN_DIR/gps.json` and we read it at 1 Hz. A missing or malformed file
 * keeps the previous snapshot.
 */

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How often the GPS file is read (ms)
pub const GPS_INTERVAL_MS: i64 = 1000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GpsSnapshot {
    #[serde(default)]
    pub fix: bool,

    #[serde(default)]
    pub lat: f64,

    #[serde(default)]
    pub lon: f64,

    #[serde(default)]
    pub speed_mph: f64,

    #[serde(default)]
    pub heading: f64,
}

/// Read the GPS file. Returns `None` when the file is absent or unparsable
/// so the caller keeps its previous snapshot.
pub fn read(path: &Path) -> Option<GpsSnapshot> {
    let contents = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&contents).ok()
}
