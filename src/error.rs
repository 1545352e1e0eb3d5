/*!
 * Error types for the Edge engine
 */

use std::fmt;
use std::io;

pub type Result<T> = std::result::Result<T, SteerError>;

/// Exit code for a clean shutdown
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for recoverable startup problems surfaced to the operator
pub const EXIT_PARTIAL: i32 = 1;
/// Exit code for fatal startup errors (unreadable or invalid configuration)
pub const EXIT_FATAL: i32 = 2;

#[derive(Debug)]
pub enum SteerError {
    /// Configuration load or validation error
    Config(String),

    /// I/O error
    Io(io::Error),

    /// Probe infrastructure failure (spawn/transport, not a lost probe)
    Probe(String),

    /// Kernel path actuation failure (route replace, mirror rule)
    Actuation(String),

    /// Modem signal channel failure
    Modem(String),

    /// Satellite dish stats failure
    Dish(String),

    /// Command ingress failure
    Command(String),

    /// Status snapshot write failure
    Status(String),

    /// Event log write failure
    EventLog(String),
}

impl SteerError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SteerError::Config(_) => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error is fatal (the daemon must not start)
    pub fn is_fatal(&self) -> bool {
        matches!(self, SteerError::Config(_))
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            SteerError::Config(_) => ErrorCategory::Configuration,
            SteerError::Io(_) => ErrorCategory::IoError,
            SteerError::Probe(_) => ErrorCategory::Probe,
            SteerError::Actuation(_) => ErrorCategory::Actuation,
            SteerError::Modem(_) | SteerError::Dish(_) => ErrorCategory::Telemetry,
            SteerError::Command(_) => ErrorCategory::Command,
            SteerError::Status(_) | SteerError::EventLog(_) => ErrorCategory::Reporting,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    IoError,
    Probe,
    Actuation,
    /// Kind-specific metadata sources (modem, dish)
    Telemetry,
    Command,
    /// Status snapshot and event log surfaces
    Reporting,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Probe => write!(f, "probe"),
            ErrorCategory::Actuation => write!(f, "actuation"),
            ErrorCategory::Telemetry => write!(f, "telemetry"),
            ErrorCategory::Command => write!(f, "command"),
            ErrorCategory::Reporting => write!(f, "reporting"),
        }
    }
}

impl fmt::Display for SteerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SteerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            SteerError::Io(err) => write!(f, "I/O error: {}", err),
            SteerError::Probe(msg) => write!(f, "Probe error: {}", msg),
            SteerError::Actuation(msg) => write!(f, "Actuation error: {}", msg),
            SteerError::Modem(msg) => write!(f, "Modem channel error: {}", msg),
            SteerError::Dish(msg) => write!(f, "Dish stats error: {}", msg),
            SteerError::Command(msg) => write!(f, "Command error: {}", msg),
            SteerError::Status(msg) => write!(f, "Status write error: {}", msg),
            SteerError::EventLog(msg) => write!(f, "Event log error: {}", msg),
        }
    }
}

impl std::error::Error for SteerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SteerError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for SteerError {
    fn from(err: io::Error) -> Self {
        SteerError::Io(err)
    }
}

impl From<serde_json::Error> for SteerError {
    fn from(err: serde_json::Error) -> Self {
        SteerError::Config(format!("JSON parse error: {}", err))
    }
}
