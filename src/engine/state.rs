//! Operating modes, steering states, and the engine-owned status record

use crate::tripwire::Trigger;

/// Operating mode
///
/// - `Training`: observe only; the tripwire is still evaluated for
///   telemetry but nothing actuates.
/// - `Tripwire`: default. Duplication stays off until a trigger fires,
///   then one protection window runs.
/// - `Mirror`: maximum stability; duplication stays on even in NORMAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpMode {
    Training,
    Tripwire,
    Mirror,
}

impl OpMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpMode::Training => "TRAINING",
            OpMode::Tripwire => "TRIPWIRE",
            OpMode::Mirror => "MIRROR",
        }
    }

    /// Parse the lowercase command form ("mode:training", ...)
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "training" => Some(OpMode::Training),
            "tripwire" => Some(OpMode::Tripwire),
            "mirror" => Some(OpMode::Mirror),
            _ => None,
        }
    }
}

/// Steering state machine
///
/// NORMAL → PROTECT → SWITCHING → HOLDING → NORMAL. PREPARE is a reserved
/// intermediate treated like NORMAL by the tripwire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteerState {
    Normal,
    Prepare,
    Protect,
    Switching,
    Holding,
}

impl SteerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SteerState::Normal => "NORMAL",
            SteerState::Prepare => "PREPARE",
            SteerState::Protect => "PROTECT",
            SteerState::Switching => "SWITCHING",
            SteerState::Holding => "HOLDING",
        }
    }

    /// States in which the protection window is open
    pub fn in_protection(&self) -> bool {
        matches!(
            self,
            SteerState::Protect | SteerState::Switching | SteerState::Holding
        )
    }
}

/// Engine-owned status record. Only the engine task mutates this; the
/// publisher reads it through an owned snapshot.
#[derive(Debug)]
pub struct EngineStatus {
    pub mode: OpMode,
    pub state: SteerState,

    pub last_trigger: Option<Trigger>,
    pub trigger_detail: String,

    /// Index into the uplink roster
    pub active_uplink: usize,
    pub active_controller: usize,

    /// Operator force: suppresses auto-switching until `force:auto`
    pub force_locked: bool,

    /// Engine time (ms since start) the protection window opened
    pub protect_start_ms: Option<i64>,

    /// Engine time the current clean streak began
    pub last_clean_ms: Option<i64>,

    pub switches_in_window: u32,
    pub flap_suppressed: bool,

    /// Countdown displays for the status snapshot
    pub hold_remaining_sec: i64,
    pub clean_remaining_sec: i64,

    pub global_risk: f64,
    pub recommendation: crate::risk::Recommendation,

    pub run_id: String,
}

impl EngineStatus {
    pub fn new(active_uplink: usize, run_id: String) -> Self {
        Self {
            mode: OpMode::Tripwire,
            state: SteerState::Normal,
            last_trigger: None,
            trigger_detail: String::new(),
            active_uplink,
            active_controller: 0,
            force_locked: false,
            protect_start_ms: None,
            last_clean_ms: None,
            switches_in_window: 0,
            flap_suppressed: false,
            hold_remaining_sec: 0,
            clean_remaining_sec: 0,
            global_risk: 0.0,
            recommendation: crate::risk::Recommendation::Normal,
            run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parse_roundtrip() {
        assert_eq!(OpMode::parse("training"), Some(OpMode::Training));
        assert_eq!(OpMode::parse("tripwire"), Some(OpMode::Tripwire));
        assert_eq!(OpMode::parse("mirror"), Some(OpMode::Mirror));
        assert_eq!(OpMode::parse("MIRROR"), None);
        assert_eq!(OpMode::parse(""), None);
        assert_eq!(OpMode::Mirror.as_str(), "MIRROR");
    }

    #[test]
    fn test_state_names() {
        assert_eq!(SteerState::Normal.as_str(), "NORMAL");
        assert_eq!(SteerState::Switching.as_str(), "SWITCHING");
    }

    #[test]
    fn test_in_protection() {
        assert!(!SteerState::Normal.in_protection());
        assert!(!SteerState::Prepare.in_protection());
        assert!(SteerState::Protect.in_protection());
        assert!(SteerState::Switching.in_protection());
        assert!(SteerState::Holding.in_protection());
    }

    #[test]
    fn test_new_status() {
        let s = EngineStatus::new(2, "run".into());
        assert_eq!(s.mode, OpMode::Tripwire);
        assert_eq!(s.state, SteerState::Normal);
        assert_eq!(s.active_uplink, 2);
        assert!(!s.force_locked);
        assert!(s.protect_start_ms.is_none());
    }
}
