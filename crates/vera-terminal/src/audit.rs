//! Record of denied execution attempts.
//!
//! Every denial lands in two places:
//! - an in-memory ring buffer (most recent `capacity` entries), and
//! - an append-only text file, two lines per denial:
//!
//! ```text
//! [BLOCKED] 2026-10-17T09:14:03.512+00:00 - Blocked: 'rm -rf' is dangerous
//! Command: rm -rf /
//! ```
//!
//! File writes are best-effort: a failure is logged and swallowed so the
//! denial itself is still reported to the caller.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, warn};

use crate::history::RingLog;
use crate::types::AuditEntry;

pub struct AuditSink {
    entries: RingLog<AuditEntry>,
    /// Destination file; `None` keeps the audit trail in memory only.
    /// The mutex serializes appends so records never interleave.
    file: Mutex<Option<PathBuf>>,
}

impl AuditSink {
    pub fn new(path: Option<PathBuf>, capacity: usize) -> Self {
        Self {
            entries: RingLog::new(capacity),
            file: Mutex::new(path),
        }
    }

    /// In-memory only.
    pub fn in_memory(capacity: usize) -> Self {
        Self::new(None, capacity)
    }

    /// Record a denial. Never fails.
    pub fn log_denied(&self, command: &str, reason: &str) {
        let entry = AuditEntry {
            timestamp: Utc::now(),
            command: command.to_string(),
            reason: reason.to_string(),
        };

        // Hold the file lock across both appends so memory and disk agree on order.
        let guard = self.file.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(path) = guard.as_deref() {
            if let Err(e) = append_record(path, &entry) {
                warn!(path = %path.display(), error = %e, "audit log write failed");
            }
        }
        self.entries.push(entry);
        debug!(reason, "denial recorded");
    }

    /// Snapshot of recorded denials, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.snapshot()
    }

    pub fn path(&self) -> Option<PathBuf> {
        self.file.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn append_record(path: &Path, entry: &AuditEntry) -> std::io::Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    let record = format!(
        "[BLOCKED] {} - {}\nCommand: {}\n",
        entry.timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
        entry.reason,
        entry.command
    );

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    // One write call per record.
    file.write_all(record.as_bytes())
}
