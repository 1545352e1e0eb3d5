/*!
 * Command ingress: operator directives from the filesystem
 *
 * Primary surface is `RUN_DIR/cmdq/`, holding single-line files named
 * `<timestamp>-<id>.cmd`; they are consumed in lexicographic order and
 * deleted after processing (at-most-once). A legacy single-shot
 * `RUN_DIR/command` file is also accepted. Every command produces an
 * observable ack in the status snapshot.
 */

use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::engine::state::OpMode;

/// Parsed operator directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `mode:{training|tripwire|mirror}`
    Mode(OpMode),

    /// `force:<uplink>` — pin service traffic to a named uplink
    Force(String),

    /// `force:auto` — release the pin and re-arbitrate immediately
    ForceAuto,

    /// `trigger` — synthesize a manual tripwire fire
    Trigger,

    /// `enable:<uplink>` / `disable:<uplink>` — participation toggles
    Enable(String),
    Disable(String),

    /// `fail:<uplink>` / `unfail:<uplink>` — sticky force-fail
    Fail(String),
    Unfail(String),

    /// `c8000:<0|1>` — advise the external router to swap Controllers
    Controller(usize),
}

/// Parse one command line. `None` means unknown command.
pub fn parse(line: &str) -> Option<Command> {
    let line = line.trim();
    if line == "trigger" {
        return Some(Command::Trigger);
    }
    if let Some(mode) = line.strip_prefix("mode:") {
        return OpMode::parse(mode).map(Command::Mode);
    }
    if let Some(uplink) = line.strip_prefix("force:") {
        if uplink == "auto" {
            return Some(Command::ForceAuto);
        }
        if uplink.is_empty() {
            return None;
        }
        return Some(Command::Force(uplink.to_string()));
    }
    if let Some(uplink) = line.strip_prefix("enable:") {
        return non_empty(uplink).map(Command::Enable);
    }
    if let Some(uplink) = line.strip_prefix("disable:") {
        return non_empty(uplink).map(Command::Disable);
    }
    if let Some(uplink) = line.strip_prefix("fail:") {
        return non_empty(uplink).map(Command::Fail);
    }
    if let Some(uplink) = line.strip_prefix("unfail:") {
        return non_empty(uplink).map(Command::Unfail);
    }
    if let Some(ctrl) = line.strip_prefix("c8000:") {
        return match ctrl {
            "0" => Some(Command::Controller(0)),
            "1" => Some(Command::Controller(1)),
            _ => None,
        };
    }
    None
}

fn non_empty(s: &str) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Ack of the most recent command, published in the status snapshot
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CommandAck {
    pub id: String,
    /// "exec" or "fail"
    pub result: String,
    pub detail: String,
}

impl CommandAck {
    pub fn exec(id: &str, detail: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            result: "exec".to_string(),
            detail: detail.into(),
        }
    }

    pub fn fail(id: &str, detail: impl Into<String>) -> Self {
        Self {
            id: id.to_string(),
            result: "fail".to_string(),
            detail: detail.into(),
        }
    }
}

/// Filesystem command queue reader
pub struct CommandIngress {
    cmdq_dir: PathBuf,
    legacy_path: PathBuf,
}

impl CommandIngress {
    pub fn new(run_dir: &Path) -> Self {
        Self {
            cmdq_dir: run_dir.join("cmdq"),
            legacy_path: run_dir.join("command"),
        }
    }

    pub fn cmdq_dir(&self) -> &Path {
        &self.cmdq_dir
    }

    /// Drain pending command files in FIFO (lexicographic) order. Each
    /// entry is `(command_id, raw_line)`; files are deleted once read.
    pub fn drain(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();

        if let Ok(entries) = std::fs::read_dir(&self.cmdq_dir) {
            let mut names: Vec<String> = entries
                .flatten()
                .filter_map(|e| e.file_name().into_string().ok())
                .filter(|n| !n.starts_with('.') && n.ends_with(".cmd"))
                .collect();
            names.sort_unstable();

            for name in names {
                let path = self.cmdq_dir.join(&name);
                if let Ok(contents) = std::fs::read_to_string(&path) {
                    if let Some(line) = contents.lines().next() {
                        out.push((name.clone(), line.to_string()));
                    }
                }
                let _ = std::fs::remove_file(&path);
            }
        }

        if let Ok(contents) = std::fs::read_to_string(&self.legacy_path) {
            if let Some(line) = contents.lines().next() {
                out.push(("legacy".to_string(), line.to_string()));
            }
            let _ = std::fs::remove_file(&self.legacy_path);
        }

        out
    }
}
