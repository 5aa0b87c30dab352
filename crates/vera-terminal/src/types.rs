//! Shared data types for vera-terminal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// AttemptId
// ---------------------------------------------------------------------------

/// Opaque identifier for a single execution attempt.
///
/// Only used for log correlation and history entries; it never appears in
/// the result object handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub String);

impl AttemptId {
    /// Generate a fresh random attempt ID (UUIDv4).
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// OsKind
// ---------------------------------------------------------------------------

/// Platform family used to select the protected-path list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OsKind {
    Windows,
    Linux,
}

impl OsKind {
    /// The platform this binary was compiled for. Every non-Windows target
    /// uses the `linux` rule list.
    pub fn current() -> Self {
        if cfg!(windows) {
            OsKind::Windows
        } else {
            OsKind::Linux
        }
    }

    /// Key under `protected_paths` in the rule file.
    pub fn key(self) -> &'static str {
        match self {
            OsKind::Windows => "windows",
            OsKind::Linux => "linux",
        }
    }
}

// ---------------------------------------------------------------------------
// CommandCandidate / ExecutionVerdict
// ---------------------------------------------------------------------------

/// One inbound message and whatever command could be pulled out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandCandidate {
    pub raw_message: String,
    pub extracted_command: Option<String>,
}

/// Firewall decision for a single command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionVerdict {
    Allowed,
    Denied { reason: String },
}

impl ExecutionVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, ExecutionVerdict::Allowed)
    }

    /// The denial reason, or `None` when allowed.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ExecutionVerdict::Allowed => None,
            ExecutionVerdict::Denied { reason } => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// ExecutionOutcome
// ---------------------------------------------------------------------------

/// Output text for commands stopped by the privilege gate.
pub const ADMIN_REQUIRED_MESSAGE: &str = "🔒 Admin mode required for system commands";

/// Result of one execution attempt, returned by `Executor::run`.
///
/// Serializes to the result object the chat transport consumes:
/// `{success, output, blocked?, mode?: "client", return_code?}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(into = "OutcomeFrame")]
pub struct ExecutionOutcome {
    pub success: bool,
    pub output: String,
    /// Stopped by the firewall.
    pub blocked: bool,
    /// Stopped by the privilege gate.
    pub gated_by_privilege: bool,
    /// Exit code of a completed process. `None` if no process ran to
    /// completion or it was killed by a signal.
    pub return_code: Option<i32>,
}

impl ExecutionOutcome {
    pub(crate) fn blocked(reason: &str) -> Self {
        Self {
            success: false,
            output: format!("🔒 {reason}"),
            blocked: true,
            gated_by_privilege: false,
            return_code: None,
        }
    }

    pub(crate) fn gated() -> Self {
        Self {
            success: false,
            output: ADMIN_REQUIRED_MESSAGE.to_string(),
            blocked: false,
            gated_by_privilege: true,
            return_code: None,
        }
    }

    pub(crate) fn completed(output: String, return_code: Option<i32>) -> Self {
        Self {
            success: true,
            output,
            blocked: false,
            gated_by_privilege: false,
            return_code,
        }
    }

    pub(crate) fn timed_out(secs: u64) -> Self {
        Self::failed(format!("Command timed out ({secs}s limit)"))
    }

    pub(crate) fn spawn_failed(message: &str) -> Self {
        Self::failed(format!("Error: {message}"))
    }

    fn failed(output: String) -> Self {
        Self {
            success: false,
            output,
            blocked: false,
            gated_by_privilege: false,
            return_code: None,
        }
    }
}

/// Wire shape of [`ExecutionOutcome`]. Optional keys are omitted, never null.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeFrame {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
}

impl From<ExecutionOutcome> for OutcomeFrame {
    fn from(o: ExecutionOutcome) -> Self {
        Self {
            success: o.success,
            output: o.output,
            blocked: o.blocked.then_some(true),
            mode: o.gated_by_privilege.then(|| "client".to_string()),
            return_code: o.return_code,
        }
    }
}

// ---------------------------------------------------------------------------
// History / audit records
// ---------------------------------------------------------------------------

/// One completed execution, kept in the executor's ring buffer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionHistoryEntry {
    pub attempt_id: AttemptId,
    pub command: String,
    pub return_code: Option<i32>,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
}

/// One denied attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub command: String,
    pub reason: String,
}
