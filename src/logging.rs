/*!
 * Logging and tracing initialization, plus the JSONL event log
 *
 * Two surfaces coexist:
 * - `tracing` for human-readable diagnostics (compact stdout layer, or a
 *   JSON file layer when a log file is configured)
 * - the append-only JSONL event log, one file per run, which is a machine
 *   contract consumed by replay tooling; every line is
 *   `{"ts": ..., "run": ..., "event": ..., "data": ...}`
 */

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{Result, SteerError};

/// Initialize structured logging. `level` is a tracing directive like
/// "info" or "debug"; `log_file` switches to a JSON file layer.
pub fn init(level: &str, log_file: Option<&Path>) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("pathsteer={}", level)))
        .map_err(|e| SteerError::Config(format!("Failed to create log filter: {}", e)))?;

    if let Some(path) = log_file {
        let file = File::create(path)
            .map_err(|e| SteerError::Config(format!("Failed to create log file: {}", e)))?;
        let fmt_layer = fmt::layer()
            .with_writer(file)
            .with_target(true)
            .with_ansi(false)
            .with_span_events(FmtSpan::NONE)
            .json();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    } else {
        let fmt_layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_file(false)
            .with_line_number(false)
            .with_span_events(FmtSpan::NONE)
            .compact();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }

    Ok(())
}

/// Initialize logging for tests (once, ignoring repeat calls)
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pathsteer=debug"));
        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
    });
}

/// Generate a run id for this process: local wall time, filesystem-safe.
pub fn generate_run_id() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Append-only JSONL event log for one run.
///
/// Writes are best-effort: the engine never aborts because the log disk is
/// full, it only raises a tracing warning.
pub struct EventLog {
    out: Option<BufWriter<File>>,
    run_id: String,
    path: Option<PathBuf>,
}

impl EventLog {
    /// Create (or append to) `<dir>/pathsteer_<run_id>.jsonl`.
    pub fn create(dir: &Path, run_id: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("pathsteer_{}.jsonl", run_id));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| SteerError::EventLog(format!("cannot open {}: {}", path.display(), e)))?;
        Ok(Self {
            out: Some(BufWriter::new(file)),
            run_id: run_id.to_string(),
            path: Some(path),
        })
    }

    /// An event log that discards everything. For tests and dry runs.
    pub fn sink(run_id: &str) -> Self {
        Self {
            out: None,
            run_id: run_id.to_string(),
            path: None,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Emit one event line. `data` is any JSON value.
    pub fn emit(&mut self, event: &str, data: serde_json::Value) {
        let line = serde_json::json!({
            "ts": chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f").to_string(),
            "run": self.run_id,
            "event": event,
            "data": data,
        });
        if let Some(out) = self.out.as_mut() {
            if writeln!(out, "{}", line).and_then(|_| out.flush()).is_err() {
                tracing::warn!(event, "event log write failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_shape() {
        let id = generate_run_id();
        assert_eq!(id.len(), 15);
        assert_eq!(id.chars().nth(8), Some('_'));
    }

    #[test]
    fn test_event_log_lines() {
        init_test_logging();
        let dir = tempfile::tempdir().unwrap();
        let mut log = EventLog::create(dir.path(), "20260101_000000").unwrap();
        log.emit("startup", serde_json::json!({"version": "1.0.0"}));
        log.emit("shutdown", serde_json::json!({}));

        let contents = std::fs::read_to_string(log.path().unwrap()).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "startup");
        assert_eq!(first["run"], "20260101_000000");
        assert_eq!(first["data"]["version"], "1.0.0");
        assert!(first["ts"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_event_log_appends_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut log = EventLog::create(dir.path(), "r1").unwrap();
            log.emit("a", serde_json::json!(1));
        }
        {
            let mut log = EventLog::create(dir.path(), "r1").unwrap();
            log.emit("b", serde_json::json!(2));
        }
        let contents = std::fs::read_to_string(dir.path().join("pathsteer_r1.jsonl")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn test_sink_discards() {
        let mut log = EventLog::sink("test");
        log.emit("anything", serde_json::json!({"x": 1}));
        assert!(log.path().is_none());
        assert_eq!(log.run_id(), "test");
    }
}
